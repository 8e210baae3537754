//! Slug generation for table-of-contents anchors and heading ids.

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

static HYPHEN_RUNS: OnceLock<Regex> = OnceLock::new();

/// Convert a string to a URL-safe slug
///
/// Rules:
/// - Lowercase
/// - Replace whitespace and underscores with hyphens
/// - Remove special characters (except hyphens)
/// - Collapse multiple hyphens
/// - Trim leading/trailing hyphens
///
/// # Examples
///
/// ```
/// use pagewright_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Chapter 1: Setup"), "chapter-1-setup");
/// ```
pub fn slugify(input: &str) -> String {
    let lowercased = input.to_lowercase();

    let cleaned = lowercased
        .graphemes(true)
        .filter_map(|g| match g {
            " " | "_" | "\t" | "\n" => Some("-"),
            _ => {
                let c = g.chars().next()?;
                (c.is_alphanumeric() || c == '-').then_some(g)
            }
        })
        .collect::<String>();

    let re = HYPHEN_RUNS.get_or_init(|| Regex::new(r"-+").expect("hyphen pattern is valid"));
    let collapsed = re.replace_all(&cleaned, "-");

    collapsed.trim_matches('-').to_string()
}
