//! Page loading and ordering.
//!
//! Book pages are ordered by a numeric filename prefix (`1_intro.md`,
//! `2_setup.md`, `10_faq.md`); blog posts newest first by front matter date.

use crate::classify::{is_ignored, is_markdown};
use crate::disk::Disk;
use crate::error::BuildError;
use crate::index::SourceIndexer;
use crate::markdown::MarkdownProcessor;
use crate::models::PageData;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use pagewright_types::FileNode;
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending by `^(\d+)_` prefix; prefixed before unprefixed; then by name
    NumericPrefix,
    /// Newest `date` first; missing or unparseable dates last
    DateDescending,
}

static NUMERIC_PREFIX: OnceLock<Regex> = OnceLock::new();

/// The integer in a `<digits>_` filename prefix
pub fn numeric_prefix(name: &str) -> Option<u64> {
    let re = NUMERIC_PREFIX.get_or_init(|| Regex::new(r"^(\d+)_").expect("prefix pattern is valid"));
    re.captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Total order over file names used for book pages
pub fn compare_numeric_prefix(a: &str, b: &str) -> Ordering {
    match (numeric_prefix(a), numeric_prefix(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Parse a front matter date: RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn file_name(page: &PageData) -> String {
    page.file_name().to_string_lossy().into_owned()
}

/// Sort pages in place; stable, ties broken by filename then path
pub fn sort_pages(pages: &mut [PageData], order: SortOrder) {
    match order {
        SortOrder::NumericPrefix => pages.sort_by(|a, b| {
            compare_numeric_prefix(&file_name(a), &file_name(b)).then_with(|| a.path.cmp(&b.path))
        }),
        // `None < Some(_)`, so comparing b to a puts undated pages after every dated one
        SortOrder::DateDescending => pages.sort_by(|a, b| {
            b.date()
                .cmp(&a.date())
                .then_with(|| file_name(a).cmp(&file_name(b)))
                .then_with(|| a.path.cmp(&b.path))
        }),
    }
}

/// Markdown files under `dir` (relative to the source root), unsorted
///
/// Files inside `dir` whose remaining path is ignored (`_draft.md`,
/// `_wip/x.md`) are skipped. The directory name itself may start with `_`.
pub fn page_files(indexer: &SourceIndexer, dir: &Path) -> Vec<(FileNode, PathBuf)> {
    indexer
        .files()
        .filter(|(_, rel)| {
            is_markdown(rel)
                && rel
                    .strip_prefix(dir)
                    .map(|inner| !is_ignored(inner))
                    .unwrap_or(false)
        })
        .collect()
}

/// Load and sort every page returned by [`page_files`]
pub async fn load_pages(
    indexer: &SourceIndexer,
    disk: &dyn Disk,
    markdown: &MarkdownProcessor,
    dir: &Path,
    order: SortOrder,
) -> Result<Vec<PageData>, BuildError> {
    let mut pages = Vec::new();

    for (node, rel) in page_files(indexer, dir) {
        let raw_markdown = disk
            .read_to_string(&node.path)
            .await
            .map_err(|source| BuildError::Read {
                path: rel.clone(),
                source,
            })?;
        let (front_matter, rendered_html) =
            markdown
                .process(&raw_markdown)
                .map_err(|source| BuildError::Frontmatter {
                    path: rel.clone(),
                    source,
                })?;

        pages.push(PageData {
            path: rel,
            raw_markdown,
            front_matter,
            rendered_html,
            source_node: node,
        });
    }

    sort_pages(&mut pages, order);
    tracing::debug!(dir = %dir.display(), count = pages.len(), "loaded pages");
    Ok(pages)
}
