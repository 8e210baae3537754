//! Markdown to HTML conversion.

use crate::frontmatter::{parse_frontmatter, FrontmatterError};
use crate::models::FrontMatter;
use crate::slug::slugify;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;

/// CommonMark renderer with GitHub-style extensions
#[derive(Debug, Clone)]
pub struct MarkdownProcessor {
    options: Options,
}

impl MarkdownProcessor {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    /// Split front matter from the body and convert the body to HTML
    pub fn process(&self, source: &str) -> Result<(FrontMatter, String), FrontmatterError> {
        self.process_with_ids(source, &mut HeadingIds::default())
    }

    /// Like [`process`](Self::process), drawing heading ids from a shared set
    pub fn process_with_ids(
        &self,
        source: &str,
        ids: &mut HeadingIds,
    ) -> Result<(FrontMatter, String), FrontmatterError> {
        let (front_matter, body) = parse_frontmatter(source)?;
        Ok((front_matter, self.to_html_with_ids(&body, ids)))
    }

    /// Convert markdown to HTML, giving every heading a slug id
    pub fn to_html(&self, markdown: &str) -> String {
        self.to_html_with_ids(markdown, &mut HeadingIds::default())
    }

    /// Convert markdown to HTML; heading ids stay unique across every call sharing `ids`
    pub fn to_html_with_ids(&self, markdown: &str, ids: &mut HeadingIds) -> String {
        let events: Vec<Event> = Parser::new_ext(markdown, self.options).collect();
        let heading_ids = collect_heading_ids(&events, ids);
        let events = attach_heading_ids(events, heading_ids);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Anchor ids already handed out; repeats get `-1`, `-2`, ...
#[derive(Debug, Default)]
pub struct HeadingIds {
    seen: HashMap<String, usize>,
}

impl HeadingIds {
    pub fn claim(&mut self, base: &str) -> String {
        let count = self.seen.entry(base.to_string()).or_insert(0);
        let id = if *count == 0 {
            base.to_string()
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;
        id
    }
}

/// Slugs for every heading in document order
fn collect_heading_ids(events: &[Event], seen: &mut HeadingIds) -> Vec<String> {
    let mut ids = Vec::new();
    let mut current: Option<String> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { .. }) => current = Some(String::new()),
            Event::Text(text) | Event::Code(text) => {
                if let Some(title) = current.as_mut() {
                    title.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(title) = current.take() {
                    let base = slugify(&title);
                    if base.is_empty() {
                        ids.push(base);
                    } else {
                        ids.push(seen.claim(&base));
                    }
                }
            }
            _ => {}
        }
    }

    ids
}

fn attach_heading_ids(events: Vec<Event<'_>>, ids: Vec<String>) -> Vec<Event<'_>> {
    let mut ids = ids.into_iter();
    events
        .into_iter()
        .map(|event| match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let generated = ids.next();
                let id = match id {
                    Some(explicit) => Some(explicit),
                    None => generated
                        .filter(|s| !s.is_empty())
                        .map(|s| CowStr::Boxed(s.into_boxed_str())),
                };
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                })
            }
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let processor = MarkdownProcessor::new();
        let html = processor.to_html("# Hello World\n\nThis is a **test**.");
        assert!(html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(html.contains("<strong>test</strong>"));
    }

    #[test]
    fn test_duplicate_headings_get_unique_ids() {
        let processor = MarkdownProcessor::new();
        let html = processor.to_html("## Notes\n\n## Notes\n");
        assert!(html.contains(r#"id="notes""#));
        assert!(html.contains(r#"id="notes-1""#));
    }

    #[test]
    fn test_shared_ids_span_documents() {
        let processor = MarkdownProcessor::new();
        let mut ids = HeadingIds::default();
        assert_eq!(ids.claim("setup"), "setup");

        let first = processor.to_html_with_ids("# Setup\n", &mut ids);
        let second = processor.to_html_with_ids("# Setup\n", &mut ids);
        assert!(first.contains(r#"id="setup-1""#));
        assert!(second.contains(r#"id="setup-2""#));
    }

    #[test]
    fn test_explicit_heading_id_wins() {
        let processor = MarkdownProcessor::new();
        let html = processor.to_html("## Setup {#install}\n");
        assert!(html.contains(r#"id="install""#));
    }

    #[test]
    fn test_tables() {
        let processor = MarkdownProcessor::new();
        let md = r#"
| Header 1 | Header 2 |
|----------|----------|
| Cell 1   | Cell 2   |
"#;
        let html = processor.to_html(md);
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>Header 1</th>"));
    }

    #[test]
    fn test_process_strips_front_matter() {
        let processor = MarkdownProcessor::new();
        let (fm, html) = processor
            .process("---\ntitle: Post\n---\nSome *text*\n")
            .unwrap();
        assert_eq!(fm.title.as_deref(), Some("Post"));
        assert_eq!(html.trim(), "<p>Some <em>text</em></p>");
    }
}
