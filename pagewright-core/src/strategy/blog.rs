use super::{BuildContext, StrategyRunner};
use crate::error::BuildError;
use crate::layout::{path_string, LayoutPolicy};
use crate::models::PageData;
use crate::layout::LAYOUTS_DIR;
use crate::output::output_path;
use crate::pages::{load_pages, page_files, SortOrder};
use crate::template::Context;
use async_trait::async_trait;
use pagewright_types::Strategy;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Directory holding blog posts, relative to both roots
pub const POSTS_DIR: &str = "posts";

pub const BLOG_INDEX_LAYOUT: &str = "blog-index";

/// Writes a newest-first index page, then one page per post
#[derive(Debug, Clone, Copy, Default)]
pub struct BlogStrategy;

#[async_trait]
impl StrategyRunner for BlogStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::Blog
    }

    async fn validate(&self, cx: &mut BuildContext<'_>) -> Result<(), BuildError> {
        cx.layouts.resolve(BLOG_INDEX_LAYOUT).await?;
        Ok(())
    }

    fn planned_outputs(&self, cx: &BuildContext<'_>) -> Vec<(PathBuf, PathBuf)> {
        let index = (
            PathBuf::from("index.html"),
            Path::new(LAYOUTS_DIR).join(BLOG_INDEX_LAYOUT),
        );
        std::iter::once(index)
            .chain(
                page_files(cx.indexer, Path::new(POSTS_DIR))
                    .into_iter()
                    .map(|(_, rel)| (output_path(&rel), rel)),
            )
            .collect()
    }

    async fn run(&self, cx: &mut BuildContext<'_>) -> Result<(), BuildError> {
        let posts = load_pages(
            cx.indexer,
            cx.source,
            cx.markdown,
            Path::new(POSTS_DIR),
            SortOrder::DateDescending,
        )
        .await?;
        cx.logger.info(format!("Loaded {} posts", posts.len()));

        let mut context = Context::new();
        context.insert(
            "title".into(),
            json!(cx.config.label.as_deref().unwrap_or("Blog")),
        );
        context.insert(
            "posts".into(),
            Value::Array(posts.iter().map(index_entry).collect()),
        );
        context.insert("hasPosts".into(), json!(!posts.is_empty()));
        context.insert("globalCss".into(), json!(cx.layouts.global_css()));
        context.insert(
            "hasGlobalCss".into(),
            json!(!cx.layouts.global_css().is_empty()),
        );

        let index = cx.layouts.render_named(BLOG_INDEX_LAYOUT, &context).await?;
        cx.writer.write_str(Path::new("index.html"), &index).await?;
        cx.logger.info("Wrote index.html");

        for post in &posts {
            cx.checkpoint()?;
            let html = cx
                .layouts
                .render_page(post, LayoutPolicy::DefaultShell, cx.logger)
                .await?;
            let target = post.output_path();
            cx.writer.write_str(&target, &html).await?;
            cx.logger.info(format!(
                "Rendered {} -> {}",
                post.path.display(),
                target.display()
            ));
        }

        Ok(())
    }
}

fn index_entry(post: &PageData) -> Value {
    let fm = &post.front_matter;
    json!({
        "title": post.title(),
        "summary": fm.summary.clone().unwrap_or_default(),
        "date": fm.date.clone().unwrap_or_default(),
        "url": path_string(&post.output_path()),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::disk::MemoryDisk;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn blog() -> Arc<MemoryDisk> {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file(
            "/site/_layouts/blog-index.mustache",
            r#"{{#posts}}<a href="{{url}}">{{title}}</a>[{{date}}]{{/posts}}"#,
        );
        disk.insert_file("/site/_layouts/post.mustache", "<article>{{{content}}}</article>");
        disk.insert_file(
            "/site/posts/old.md",
            "---\ntitle: Old\ndate: 2023-01-01\nlayout: post\n---\nold",
        );
        disk.insert_file(
            "/site/posts/new.md",
            "---\ntitle: New\ndate: 2024-06-01\n---\nnew",
        );
        disk.insert_file("/site/posts/undated.md", "---\ntitle: Undated\n---\n?");
        disk
    }

    #[tokio::test]
    async fn test_index_lists_newest_first() {
        let disk = blog();
        let mut fixture = Fixture::new(disk.clone(), Strategy::Blog).await;
        BlogStrategy.run(&mut fixture.context()).await.unwrap();

        assert_eq!(
            disk.get_string("/out/index.html").unwrap(),
            concat!(
                r#"<a href="posts/new.html">New</a>[2024-06-01]"#,
                r#"<a href="posts/old.html">Old</a>[2023-01-01]"#,
                r#"<a href="posts/undated.html">Undated</a>[]"#,
            )
        );
        assert_eq!(
            disk.files_under("/out/posts"),
            vec![
                PathBuf::from("/out/posts/new.html"),
                PathBuf::from("/out/posts/old.html"),
                PathBuf::from("/out/posts/undated.html"),
            ]
        );
    }

    #[tokio::test]
    async fn test_posts_use_declared_layout_or_default_shell() {
        let disk = blog();
        let mut fixture = Fixture::new(disk.clone(), Strategy::Blog).await;
        BlogStrategy.run(&mut fixture.context()).await.unwrap();

        assert_eq!(
            disk.get_string("/out/posts/old.html").unwrap(),
            "<article><p>old</p>\n</article>"
        );
        let new = disk.get_string("/out/posts/new.html").unwrap();
        assert!(new.starts_with("<!DOCTYPE html>"));
        assert!(new.contains("<title>New</title>"));
    }

    #[tokio::test]
    async fn test_missing_index_layout_fails_validation() {
        let disk = Arc::new(MemoryDisk::new("mem"));
        disk.insert_file("/site/posts/a.md", "a");
        let mut fixture = Fixture::new(disk, Strategy::Blog).await;

        let err = BlogStrategy
            .validate(&mut fixture.context())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::TemplateNotFound { ref name, .. } if name == "blog-index"));
    }

    #[tokio::test]
    async fn test_post_html_asset_collides_with_rendered_post() {
        let disk = blog();
        disk.insert_file("/site/posts/old.html", "<p>exported</p>");
        let mut fixture = Fixture::new(disk, Strategy::Blog).await;
        let cx = fixture.context();

        let err = cx
            .check_outputs(BlogStrategy.planned_outputs(&cx))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutputCollision { ref output, ref second, .. }
                if output == Path::new("posts/old.html") && second == Path::new("posts/old.md")
        ));
    }

    #[tokio::test]
    async fn test_post_layout_missing_aborts_run() {
        let disk = blog();
        disk.insert_file(
            "/site/posts/broken.md",
            "---\ntitle: Broken\ndate: 2025-01-01\nlayout: nope\n---\nx",
        );
        let mut fixture = Fixture::new(disk.clone(), Strategy::Blog).await;

        let err = BlogStrategy.run(&mut fixture.context()).await.unwrap_err();
        assert!(matches!(err, BuildError::TemplateNotFound { .. }));
        // newest post failed first; nothing after it was written
        assert!(disk.get("/out/index.html").is_some());
        assert!(disk.files_under("/out/posts").is_empty());
    }
}
