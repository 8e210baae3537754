use super::{BuildContext, StrategyRunner};
use crate::classify::{classify, FileClass};
use crate::error::BuildError;
use crate::layout::LayoutPolicy;
use crate::models::PageData;
use crate::output::output_path;
use async_trait::async_trait;
use pagewright_types::{FileNode, Strategy};
use std::path::PathBuf;

/// Renders every template and markdown file to its own output file
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeformStrategy;

#[async_trait]
impl StrategyRunner for FreeformStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::Freeform
    }

    fn planned_outputs(&self, cx: &BuildContext<'_>) -> Vec<(PathBuf, PathBuf)> {
        renderable(cx)
            .into_iter()
            .map(|(_, rel, _)| (output_path(&rel), rel))
            .collect()
    }

    async fn run(&self, cx: &mut BuildContext<'_>) -> Result<(), BuildError> {
        let mut rendered = 0;

        for (node, rel, class) in renderable(cx) {
            cx.checkpoint()?;

            let source = cx
                .source
                .read_to_string(&node.path)
                .await
                .map_err(|source| BuildError::Read {
                    path: rel.clone(),
                    source,
                })?;

            let html = match class {
                FileClass::Template(kind) => cx.layouts.render_template_file(&rel, kind, &source)?,
                _ => {
                    let (front_matter, rendered_html) =
                        cx.markdown
                            .process(&source)
                            .map_err(|source| BuildError::Frontmatter {
                                path: rel.clone(),
                                source,
                            })?;
                    let page = PageData {
                        path: rel.clone(),
                        raw_markdown: source,
                        front_matter,
                        rendered_html,
                        source_node: node,
                    };
                    cx.layouts
                        .render_page(&page, LayoutPolicy::Required, cx.logger)
                        .await?
                }
            };

            let target = output_path(&rel);
            cx.writer.write_str(&target, &html).await?;
            cx.logger
                .info(format!("Rendered {} -> {}", rel.display(), target.display()));
            rendered += 1;
        }

        cx.logger.info(format!("Rendered {} pages", rendered));
        Ok(())
    }
}

/// Markdown and template files, each rendered to its own page
fn renderable(cx: &BuildContext<'_>) -> Vec<(FileNode, PathBuf, FileClass)> {
    cx.source_files()
        .into_iter()
        .filter_map(|(node, rel)| match classify(&rel) {
            class @ (FileClass::Markdown | FileClass::Template(_)) => Some((node, rel, class)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::disk::MemoryDisk;
    use std::sync::Arc;

    fn site() -> Arc<MemoryDisk> {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/_layouts/page.mustache", "<main>{{{content}}}</main>");
        disk.insert_file("/site/index.md", "---\nlayout: page\n---\n# Home");
        disk.insert_file("/site/docs/guide.md", "---\nlayout: page\n---\nGuide");
        disk.insert_file("/site/widget.ejs", "<p><%= path %></p>");
        disk.insert_file("/site/_drafts/note.md", "---\nlayout: page\n---\nDraft");
        disk.insert_file("/site/style.css", "p{}");
        disk
    }

    #[tokio::test]
    async fn test_renders_each_file_in_place() {
        let disk = site();
        let mut fixture = Fixture::new(disk.clone(), Strategy::Freeform).await;
        FreeformStrategy.run(&mut fixture.context()).await.unwrap();

        let index = disk.get_string("/out/index.html").unwrap();
        assert!(index.starts_with("<main><h1"));
        assert!(index.contains(">Home</h1>"));
        assert_eq!(
            disk.get_string("/out/docs/guide.html").unwrap(),
            "<main><p>Guide</p>\n</main>"
        );
        assert_eq!(
            disk.get_string("/out/widget.html").unwrap(),
            "<p>widget.ejs</p>"
        );
        assert!(disk.get("/out/_drafts/note.html").is_none());
        // assets are the pipeline's job
        assert!(disk.get("/out/style.css").is_none());
    }

    #[tokio::test]
    async fn test_missing_layout_aborts() {
        let disk = site();
        disk.insert_file("/site/bare.md", "no front matter");
        let mut fixture = Fixture::new(disk, Strategy::Freeform).await;

        let err = FreeformStrategy
            .run(&mut fixture.context())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingLayout { .. }));
        assert!(err.to_string().contains("bare.md"));
    }

    #[tokio::test]
    async fn test_same_stem_sources_collide() {
        let disk = site();
        disk.insert_file("/site/about.md", "---\nlayout: page\n---\nFROM MARKDOWN");
        disk.insert_file("/site/about.mustache", "FROM TEMPLATE");
        disk.insert_file("/site/about.html", "FROM ASSET");
        let mut fixture = Fixture::new(disk.clone(), Strategy::Freeform).await;
        let cx = fixture.context();

        let err = cx
            .check_outputs(FreeformStrategy.planned_outputs(&cx))
            .unwrap_err();
        match err {
            BuildError::OutputCollision {
                output,
                first,
                second,
            } => {
                assert_eq!(output, PathBuf::from("about.html"));
                // assets are claimed before rendered pages
                assert_eq!(first, PathBuf::from("about.html"));
                assert!(
                    second == PathBuf::from("about.md")
                        || second == PathBuf::from("about.mustache")
                );
            }
            other => panic!("expected a collision, got {:?}", other),
        }
        assert!(disk.files_under("/out").is_empty());
    }

    #[tokio::test]
    async fn test_markdown_and_template_with_same_stem_collide() {
        let disk = site();
        disk.insert_file("/site/about.md", "---\nlayout: page\n---\nFROM MARKDOWN");
        disk.insert_file("/site/about.mustache", "FROM TEMPLATE");
        let mut fixture = Fixture::new(disk, Strategy::Freeform).await;
        let cx = fixture.context();

        let err = cx
            .check_outputs(FreeformStrategy.planned_outputs(&cx))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::OutputCollision);
        let message = err.to_string();
        assert!(message.contains("about.md"));
        assert!(message.contains("about.mustache"));
    }

    #[tokio::test]
    async fn test_distinct_outputs_pass() {
        let disk = site();
        let mut fixture = Fixture::new(disk, Strategy::Freeform).await;
        let cx = fixture.context();

        let planned = FreeformStrategy.planned_outputs(&cx);
        assert_eq!(planned.len(), 3);
        cx.check_outputs(planned).unwrap();
    }
}
