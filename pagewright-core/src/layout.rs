//! Layout resolution and page composition.
//!
//! Layouts live under `_layouts/` in the source tree and are looked up by
//! name, Mustache first, then EJS. A page's rendered markdown body reaches
//! its layout as the `content` context value.

use crate::classify::TemplateKind;
use crate::disk::Disk;
use crate::error::BuildError;
use crate::logger::BuildLogger;
use crate::models::PageData;
use crate::output::normalize_relative;
use crate::template::{Context, TemplateRenderer};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory holding layout templates, relative to the source root
pub const LAYOUTS_DIR: &str = "_layouts";

/// Stylesheet injected into every page when present at the source root
pub const GLOBAL_CSS: &str = "global.css";

/// HTML document used for pages without a layout under [`LayoutPolicy::DefaultShell`]
pub const DEFAULT_SHELL: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{title}}</title>
{{#hasGlobalCss}}<style>{{{globalCss}}}</style>{{/hasGlobalCss}}
{{#hasAdditionalStyles}}<style>{{{additionalStyles}}}</style>{{/hasAdditionalStyles}}
{{#scripts}}<script src="{{src}}"></script>{{/scripts}}
</head>
<body>
{{{content}}}
</body>
</html>
"#;

/// What to do with a markdown page whose front matter names no layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPolicy {
    /// Fail with [`BuildError::MissingLayout`]
    Required,
    /// Wrap the page in [`DEFAULT_SHELL`]
    DefaultShell,
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub name: String,
    pub kind: TemplateKind,
    /// Path relative to the source root
    pub path: PathBuf,
    pub source: String,
}

/// Layout lookup and rendering for one build run
pub struct Layouts {
    disk: Arc<dyn Disk>,
    root: PathBuf,
    renderer: TemplateRenderer,
    global_css: String,
    loaded: Mutex<HashMap<String, Arc<Layout>>>,
}

impl Layouts {
    /// Prepare layouts for `root`, reading `global.css` if it exists
    pub async fn load(
        disk: Arc<dyn Disk>,
        root: impl Into<PathBuf>,
        logger: &mut BuildLogger,
    ) -> Result<Self, BuildError> {
        let root = root.into();
        let global_css = match disk.read_to_string(&root.join(GLOBAL_CSS)).await {
            Ok(css) => {
                logger.info(format!("Using {}", GLOBAL_CSS));
                css
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(BuildError::Read {
                    path: PathBuf::from(GLOBAL_CSS),
                    source,
                })
            }
        };

        Ok(Self {
            disk,
            root,
            renderer: TemplateRenderer::new(),
            global_css,
            loaded: Mutex::new(HashMap::new()),
        })
    }

    pub fn global_css(&self) -> &str {
        &self.global_css
    }

    /// Find `_layouts/<name>.mustache` or `_layouts/<name>.ejs`
    pub async fn resolve(&self, name: &str) -> Result<Arc<Layout>, BuildError> {
        let cached = self.loaded.lock().get(name).cloned();
        if let Some(layout) = cached {
            return Ok(layout);
        }

        let mut searched = Vec::new();
        for kind in [TemplateKind::Mustache, TemplateKind::Ejs] {
            let Some(ext) = kind.extension() else {
                continue;
            };
            let candidate = Path::new(LAYOUTS_DIR).join(format!("{}.{}", name, ext));
            // `..` in a layout name never leaves the layouts directory
            let Ok(relative) = normalize_relative(&candidate) else {
                searched.push(candidate);
                continue;
            };

            let absolute = self.root.join(&relative);
            if !self.disk.exists(&absolute).await {
                searched.push(relative);
                continue;
            }

            let source = self
                .disk
                .read_to_string(&absolute)
                .await
                .map_err(|source| BuildError::Read {
                    path: relative.clone(),
                    source,
                })?;
            let layout = Arc::new(Layout {
                name: name.to_string(),
                kind,
                path: relative,
                source,
            });
            tracing::debug!(name, path = %layout.path.display(), "resolved layout");
            self.loaded.lock().insert(name.to_string(), layout.clone());
            return Ok(layout);
        }

        Err(BuildError::TemplateNotFound {
            name: name.to_string(),
            searched,
        })
    }

    /// Concatenated contents of the page's `styles`, skipping missing files with a warning
    pub async fn additional_styles(
        &self,
        page: &PageData,
        logger: &mut BuildLogger,
    ) -> Result<String, BuildError> {
        let mut styles = Vec::new();
        for name in &page.front_matter.styles {
            let Ok(relative) = normalize_relative(Path::new(name.trim_start_matches('/'))) else {
                logger.warning(format!(
                    "Style file {} referenced by {} is outside the source tree, skipping",
                    name,
                    page.path.display()
                ));
                continue;
            };

            match self.disk.read_to_string(&self.root.join(&relative)).await {
                Ok(css) => styles.push(css),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    logger.warning(format!(
                        "Style file not found: {} (referenced by {})",
                        relative.display(),
                        page.path.display()
                    ));
                }
                Err(source) => {
                    return Err(BuildError::Read {
                        path: relative,
                        source,
                    })
                }
            }
        }
        Ok(styles.join("\n"))
    }

    /// Wrap a page's rendered body in its declared layout
    pub async fn render_page(
        &self,
        page: &PageData,
        policy: LayoutPolicy,
        logger: &mut BuildLogger,
    ) -> Result<String, BuildError> {
        let declared = page
            .front_matter
            .layout
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let layout = match (declared, policy) {
            (Some(name), _) => Some(self.resolve(name).await?),
            (None, LayoutPolicy::Required) => {
                return Err(BuildError::MissingLayout {
                    path: page.path.clone(),
                })
            }
            (None, LayoutPolicy::DefaultShell) => None,
        };

        let additional_styles = self.additional_styles(page, logger).await?;
        let context = self.page_context(page, &additional_styles);

        let rendered = match &layout {
            Some(layout) => self.renderer.render(layout.kind, &layout.source, &context),
            None => self.renderer.render_mustache(DEFAULT_SHELL, &context),
        };
        rendered.map_err(|source| BuildError::Render {
            path: layout
                .map(|l| l.path.clone())
                .unwrap_or_else(|| page.path.clone()),
            source,
        })
    }

    /// Render a layout by name against a caller-built context
    pub async fn render_named(&self, name: &str, context: &Context) -> Result<String, BuildError> {
        let layout = self.resolve(name).await?;
        self.renderer
            .render(layout.kind, &layout.source, context)
            .map_err(|source| BuildError::Render {
                path: layout.path.clone(),
                source,
            })
    }

    /// Render a template file from the source tree as a standalone page
    pub fn render_template_file(
        &self,
        relative: &Path,
        kind: TemplateKind,
        source: &str,
    ) -> Result<String, BuildError> {
        let mut context = Context::new();
        context.insert("globalCss".into(), json!(self.global_css));
        context.insert("hasGlobalCss".into(), json!(!self.global_css.is_empty()));
        context.insert("path".into(), json!(path_string(relative)));

        self.renderer
            .render(kind, source, &context)
            .map_err(|source| BuildError::Render {
                path: relative.to_path_buf(),
                source,
            })
    }

    fn page_context(&self, page: &PageData, additional_styles: &str) -> Context {
        let fm = &page.front_matter;
        let mut context = Context::new();

        for (key, value) in &fm.extra {
            if value.is_null() {
                continue;
            }
            if let Ok(value) = serde_json::to_value(value) {
                context.insert(key.clone(), value);
            }
        }

        context.insert("title".into(), json!(page.title()));
        context.insert("slug".into(), json!(page.slug()));
        for (key, value) in [
            ("summary", &fm.summary),
            ("date", &fm.date),
            ("layout", &fm.layout),
        ] {
            if let Some(value) = value {
                context.insert(key.into(), json!(value));
            }
        }
        context.insert("styles".into(), json!(fm.styles));
        context.insert(
            "scripts".into(),
            Value::Array(fm.scripts.iter().map(|src| json!({ "src": src })).collect()),
        );
        context.insert("content".into(), json!(page.rendered_html));
        context.insert("globalCss".into(), json!(self.global_css));
        context.insert("hasGlobalCss".into(), json!(!self.global_css.is_empty()));
        context.insert("additionalStyles".into(), json!(additional_styles));
        context.insert(
            "hasAdditionalStyles".into(),
            json!(!additional_styles.is_empty()),
        );
        context.insert("path".into(), json!(path_string(&page.output_path())));
        context
    }
}

/// Forward-slash form of a relative path, for templates and URLs
pub(crate) fn path_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemoryDisk;
    use crate::markdown::MarkdownProcessor;
    use pagewright_types::{FileNode, LogLevel, NodeKind};

    fn page(path: &str, source: &str) -> PageData {
        let (front_matter, rendered_html) = MarkdownProcessor::new().process(source).unwrap();
        PageData {
            path: PathBuf::from(path),
            raw_markdown: source.to_string(),
            front_matter,
            rendered_html,
            source_node: FileNode::new(format!("/site/{}", path), NodeKind::File),
        }
    }

    async fn layouts(disk: Arc<MemoryDisk>) -> (Layouts, BuildLogger) {
        let mut logger = BuildLogger::new();
        let layouts = Layouts::load(disk, "/site", &mut logger).await.unwrap();
        (layouts, logger)
    }

    #[tokio::test]
    async fn test_page_rendered_into_declared_layout() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file(
            "/site/_layouts/post.mustache",
            "<h1>{{title}}</h1><em>{{mood}}</em>{{{content}}}<style>{{{globalCss}}}</style>",
        );
        disk.insert_file("/site/global.css", "body{margin:0}");
        let (layouts, mut logger) = layouts(disk).await;

        let page = page(
            "about.md",
            "---\nlayout: post\ntitle: About\nmood: calm\n---\nHello",
        );
        let html = layouts
            .render_page(&page, LayoutPolicy::Required, &mut logger)
            .await
            .unwrap();

        assert_eq!(
            html,
            "<h1>About</h1><em>calm</em><p>Hello</p>\n<style>body{margin:0}</style>"
        );
    }

    #[tokio::test]
    async fn test_front_matter_cannot_override_content() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/_layouts/plain.mustache", "{{{content}}}");
        let (layouts, mut logger) = layouts(disk).await;

        let page = page("x.md", "---\nlayout: plain\ncontent: sneaky\n---\nreal");
        let html = layouts
            .render_page(&page, LayoutPolicy::Required, &mut logger)
            .await
            .unwrap();
        assert_eq!(html, "<p>real</p>\n");
    }

    #[tokio::test]
    async fn test_missing_layout_policies() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_dir("/site");
        let (layouts, mut logger) = layouts(disk).await;
        let page = page("posts/hello.md", "---\ntitle: Hello\nscripts: app.js\n---\nHi");

        let err = layouts
            .render_page(&page, LayoutPolicy::Required, &mut logger)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingLayout { ref path } if path == Path::new("posts/hello.md")));

        let html = layouts
            .render_page(&page, LayoutPolicy::DefaultShell, &mut logger)
            .await
            .unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Hello</title>"));
        assert!(html.contains(r#"<script src="app.js"></script>"#));
        assert!(html.contains("<p>Hi</p>"));
        assert!(!html.contains("<style>"));
    }

    #[tokio::test]
    async fn test_template_not_found_lists_candidates() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_dir("/site");
        let (layouts, _) = layouts(disk).await;

        match layouts.resolve("post").await {
            Err(BuildError::TemplateNotFound { name, searched }) => {
                assert_eq!(name, "post");
                assert_eq!(
                    searched,
                    vec![
                        PathBuf::from("_layouts/post.mustache"),
                        PathBuf::from("_layouts/post.ejs")
                    ]
                );
            }
            other => panic!("expected TemplateNotFound, got {:?}", other.map(|l| l.path.clone())),
        }
    }

    #[tokio::test]
    async fn test_layout_name_cannot_escape_layouts_dir() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/secret.mustache", "secret");
        let (layouts, _) = layouts(disk).await;

        assert!(matches!(
            layouts.resolve("../secret").await,
            Err(BuildError::TemplateNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_ejs_layout_is_used_when_no_mustache() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/_layouts/page.ejs", "<title><%= title %></title><%- content %>");
        let (layouts, mut logger) = layouts(disk).await;

        let page = page("a.md", "---\nlayout: page\ntitle: A & B\n---\n*x*");
        let html = layouts
            .render_page(&page, LayoutPolicy::Required, &mut logger)
            .await
            .unwrap();
        assert_eq!(html, "<title>A &amp; B</title><p><em>x</em></p>\n");
    }

    #[tokio::test]
    async fn test_missing_style_file_is_a_warning() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/_layouts/plain.mustache", "{{{additionalStyles}}}|{{{content}}}");
        disk.insert_file("/site/css/extra.css", ".x{}");
        let (layouts, mut logger) = layouts(disk).await;

        let page = page(
            "a.md",
            "---\nlayout: plain\nstyles: [css/extra.css, css/gone.css]\n---\nbody",
        );
        let html = layouts
            .render_page(&page, LayoutPolicy::Required, &mut logger)
            .await
            .unwrap();

        assert_eq!(html, ".x{}|<p>body</p>\n");
        assert_eq!(logger.count(LogLevel::Warning), 1);
        assert!(logger.lines()[0].message.contains("css/gone.css"));
    }

    #[tokio::test]
    async fn test_template_file_context() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_dir("/site");
        let (layouts, _) = layouts(disk).await;

        let html = layouts
            .render_template_file(
                Path::new("docs/widget.mustache"),
                TemplateKind::Mustache,
                "{{path}}{{^hasGlobalCss}} (no css){{/hasGlobalCss}}",
            )
            .unwrap();
        assert_eq!(html, "docs/widget.mustache (no css)");
    }
}
