use super::{BuildContext, StrategyRunner};
use crate::error::BuildError;
use crate::markdown::HeadingIds;
use crate::pages::{load_pages, page_files, SortOrder};
use crate::template::Context;
use async_trait::async_trait;
use pagewright_types::Strategy;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Directory holding book pages, relative to the source root
pub const PAGES_DIR: &str = "_pages";

pub const BOOK_LAYOUT: &str = "book";

/// Marker placed between consecutive pages
pub const PAGE_BREAK: &str = r#"<div class="page-break"></div>"#;

/// Concatenates `_pages` into a single `index.html` with a table of contents
#[derive(Debug, Clone, Copy, Default)]
pub struct BookStrategy;

#[async_trait]
impl StrategyRunner for BookStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::Book
    }

    async fn validate(&self, cx: &mut BuildContext<'_>) -> Result<(), BuildError> {
        if page_files(cx.indexer, Path::new(PAGES_DIR)).is_empty() {
            return Err(empty_pages());
        }
        cx.layouts.resolve(BOOK_LAYOUT).await?;
        Ok(())
    }

    fn planned_outputs(&self, _cx: &BuildContext<'_>) -> Vec<(PathBuf, PathBuf)> {
        vec![(PathBuf::from("index.html"), PathBuf::from(PAGES_DIR))]
    }

    async fn run(&self, cx: &mut BuildContext<'_>) -> Result<(), BuildError> {
        let pages = load_pages(
            cx.indexer,
            cx.source,
            cx.markdown,
            Path::new(PAGES_DIR),
            SortOrder::NumericPrefix,
        )
        .await?;
        if pages.is_empty() {
            return Err(empty_pages());
        }
        cx.logger.info(format!("Loaded {} pages", pages.len()));

        // Section anchors and heading ids share one namespace in the combined page
        let mut anchors = HeadingIds::default();
        let mut toc = Vec::with_capacity(pages.len());
        let mut sections = Vec::with_capacity(pages.len());

        for page in &pages {
            cx.checkpoint()?;
            let slug = section_anchor(&mut anchors, &page.slug());
            let (_, body) = cx
                .markdown
                .process_with_ids(&page.raw_markdown, &mut anchors)
                .map_err(|source| BuildError::Frontmatter {
                    path: page.path.clone(),
                    source,
                })?;
            toc.push(json!({
                "title": page.title(),
                "slug": slug,
                "href": format!("#{}", slug),
            }));
            sections.push(format!(
                r#"<section class="book-page" id="{}">{}</section>"#,
                slug, body
            ));
            tracing::debug!(page = %page.path.display(), slug = %slug, "added book page");
        }

        let mut context = Context::new();
        context.insert("title".into(), json!(pages[0].title()));
        context.insert("tableOfContents".into(), Value::Array(toc));
        context.insert("content".into(), json!(sections.join(PAGE_BREAK)));
        context.insert("globalCss".into(), json!(cx.layouts.global_css()));
        context.insert(
            "hasGlobalCss".into(),
            json!(!cx.layouts.global_css().is_empty()),
        );

        let html = cx.layouts.render_named(BOOK_LAYOUT, &context).await?;
        cx.checkpoint()?;
        cx.writer.write_str(Path::new("index.html"), &html).await?;
        cx.logger
            .info(format!("Wrote index.html with {} pages", pages.len()));
        Ok(())
    }
}

fn empty_pages() -> BuildError {
    BuildError::EmptyPageSet {
        dir: PathBuf::from(PAGES_DIR),
    }
}

fn section_anchor(anchors: &mut HeadingIds, slug: &str) -> String {
    anchors.claim(if slug.is_empty() { "page" } else { slug })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::disk::MemoryDisk;
    use std::sync::Arc;

    const LAYOUT: &str =
        r#"<nav>{{#tableOfContents}}<a href="{{href}}">{{title}}</a>{{/tableOfContents}}</nav>{{{content}}}"#;

    #[tokio::test]
    async fn test_book_is_one_page_in_numeric_order() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/_layouts/book.mustache", LAYOUT);
        disk.insert_file("/site/_pages/2_setup.md", "---\ntitle: Setup\n---\nRun it.");
        disk.insert_file("/site/_pages/1_intro.md", "Hello.");

        let mut fixture = Fixture::new(disk.clone(), Strategy::Book).await;
        let mut cx = fixture.context();
        BookStrategy.validate(&mut cx).await.unwrap();
        BookStrategy.run(&mut cx).await.unwrap();

        let html = disk.get_string("/out/index.html").unwrap();
        insta::assert_snapshot!(html, @r###"
        <nav><a href="#intro">intro</a><a href="#setup">Setup</a></nav><section class="book-page" id="intro"><p>Hello.</p>
        </section><div class="page-break"></div><section class="book-page" id="setup"><p>Run it.</p>
        </section>
        "###);
        assert_eq!(disk.files_under("/out"), vec![PathBuf::from("/out/index.html")]);
    }

    #[tokio::test]
    async fn test_empty_pages_fails_before_writing() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/_layouts/book.mustache", LAYOUT);
        disk.insert_dir("/site/_pages");

        let mut fixture = Fixture::new(disk.clone(), Strategy::Book).await;
        let err = BookStrategy
            .validate(&mut fixture.context())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::EmptyPageSet { .. }));

        let err = BookStrategy.run(&mut fixture.context()).await.unwrap_err();
        assert!(matches!(err, BuildError::EmptyPageSet { .. }));
        assert!(disk.files_under("/out").is_empty());
    }

    #[tokio::test]
    async fn test_missing_book_layout() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/_pages/1_a.md", "A");

        let mut fixture = Fixture::new(disk, Strategy::Book).await;
        let err = BookStrategy
            .validate(&mut fixture.context())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::TemplateNotFound { ref name, .. } if name == "book"));
    }

    #[test]
    fn test_duplicate_titles_get_distinct_anchors() {
        let mut anchors = HeadingIds::default();
        assert_eq!(section_anchor(&mut anchors, "faq"), "faq");
        assert_eq!(section_anchor(&mut anchors, "faq"), "faq-1");
        assert_eq!(section_anchor(&mut anchors, ""), "page");
    }

    #[tokio::test]
    async fn test_heading_ids_do_not_repeat_section_anchors() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/_layouts/book.mustache", "{{{content}}}");
        disk.insert_file("/site/_pages/1_setup.md", "---\ntitle: Setup\n---\n# Setup\n");
        disk.insert_file("/site/_pages/2_more.md", "---\ntitle: More\n---\n## Setup\n");

        let mut fixture = Fixture::new(disk.clone(), Strategy::Book).await;
        BookStrategy.run(&mut fixture.context()).await.unwrap();

        let html = disk.get_string("/out/index.html").unwrap();
        assert!(html.contains(r#"<section class="book-page" id="setup">"#));
        assert!(html.contains(r#"<h1 id="setup-1">"#));
        assert!(html.contains(r#"<h2 id="setup-2">"#));
        assert_eq!(html.matches(r#"id="setup""#).count(), 1);
    }

    #[tokio::test]
    async fn test_index_asset_collides_with_book() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/_layouts/book.mustache", LAYOUT);
        disk.insert_file("/site/_pages/1_a.md", "A");
        disk.insert_file("/site/index.html", "hand written");

        let mut fixture = Fixture::new(disk.clone(), Strategy::Book).await;
        let cx = fixture.context();
        let err = cx
            .check_outputs(BookStrategy.planned_outputs(&cx))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutputCollision { ref first, ref second, .. }
                if first == Path::new("index.html") && second == Path::new("_pages")
        ));
    }
}
