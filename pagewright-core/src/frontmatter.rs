//! Front matter parsing from markdown files.

use crate::models::FrontMatter;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| {
        Regex::new(r"(?sm)\A---[ \t]*\r?\n(.*?)^---[ \t]*\r?$\n?(.*)\z")
            .expect("front matter pattern is valid")
    })
}

/// Parse front matter from markdown content
///
/// Returns a tuple of (front_matter, markdown_body).
/// If no front matter block is present, returns empty front matter with the
/// full content as body.
///
/// # Example
///
/// ```
/// use pagewright_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntitle: My Post\nlayout: post\n---\n# Hello World\n";
///
/// let (fm, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(fm.title.as_deref(), Some("My Post"));
/// assert_eq!(fm.layout.as_deref(), Some("post"));
/// assert!(body.trim().starts_with("# Hello World"));
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(FrontMatter, String), FrontmatterError> {
    let Some(captures) = frontmatter_regex().captures(content) else {
        return Ok((FrontMatter::default(), content.to_string()));
    };

    let yaml = captures.get(1).map_or("", |m| m.as_str());
    let body = captures.get(2).map_or("", |m| m.as_str());

    let front_matter = if yaml.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(yaml)?
    };

    Ok((front_matter, body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_frontmatter() {
        let content = r#"---
title: Test Post
layout: post
summary: A test post
date: 2025-01-01
styles:
  - css/extra.css
---

# Hello World

This is the content."#;

        let (fm, body) = parse_frontmatter(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Test Post"));
        assert_eq!(fm.layout.as_deref(), Some("post"));
        assert_eq!(fm.summary.as_deref(), Some("A test post"));
        assert_eq!(fm.date.as_deref(), Some("2025-01-01"));
        assert_eq!(fm.styles, vec!["css/extra.css"]);
        assert!(body.contains("# Hello World"));
        assert!(body.contains("This is the content."));
        assert!(!body.contains("---"));
    }

    #[test]
    fn test_arbitrary_keys_are_kept() {
        let content = "---\ntitle: T\nauthor: Ada\ntags: [a, b]\n---\nBody";
        let (fm, body) = parse_frontmatter(content).unwrap();
        assert_eq!(
            fm.extra.get("author"),
            Some(&serde_yaml::Value::String("Ada".into()))
        );
        assert!(fm.extra.contains_key("tags"));
        assert!(!fm.extra.contains_key("title"));
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_parse_no_frontmatter() {
        let content = "# Just Content\n\nNo front matter here.";
        let (fm, body) = parse_frontmatter(content).unwrap();
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, content);
    }

    #[test]
    fn test_empty_frontmatter_block() {
        let (fm, body) = parse_frontmatter("---\n---\nBody\n").unwrap();
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, "Body\n");
    }

    #[test]
    fn test_frontmatter_without_body() {
        let (fm, body) = parse_frontmatter("---\ntitle: Only\n---").unwrap();
        assert_eq!(fm.title.as_deref(), Some("Only"));
        assert_eq!(body, "");
    }

    #[test]
    fn test_horizontal_rule_in_body_is_kept() {
        let content = "---\ntitle: T\n---\nabove\n\n---\n\nbelow\n";
        let (_, body) = parse_frontmatter(content).unwrap();
        assert!(body.contains("above"));
        assert!(body.contains("below"));
        assert!(body.contains("---"));
    }

    #[test]
    fn test_invalid_yaml() {
        let content = r#"---
title: Test
invalid yaml: [unclosed
---

Content."#;

        assert!(parse_frontmatter(content).is_err());
    }
}
