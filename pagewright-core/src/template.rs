//! Template rendering for Mustache and EJS sources.
//!
//! No partials are registered: layouts are composed by passing the rendered
//! body in as a context value.

use crate::classify::TemplateKind;
use serde_json::Value;
use thiserror::Error;

/// Data a template is rendered against
pub type Context = serde_json::Map<String, Value>;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template syntax error: {0}")]
    Syntax(String),

    #[error("Unsupported template construct: {0}")]
    Unsupported(String),

    #[error("Template rendering failed: {0}")]
    Render(String),

    #[error("Not a template")]
    NotATemplate,
}

/// Stateless renderer dispatching on template kind
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(
        &self,
        kind: TemplateKind,
        source: &str,
        context: &Context,
    ) -> Result<String, TemplateError> {
        match kind {
            TemplateKind::Mustache => self.render_mustache(source, context),
            TemplateKind::Ejs => self.render_ejs(source, context),
            TemplateKind::None => Err(TemplateError::NotATemplate),
        }
    }

    pub fn render_mustache(&self, source: &str, context: &Context) -> Result<String, TemplateError> {
        let template =
            mustache::compile_str(source).map_err(|e| TemplateError::Syntax(e.to_string()))?;
        template
            .render_to_string(context)
            .map_err(|e| TemplateError::Render(e.to_string()))
    }

    /// Render the EJS output-tag subset: `<%= path %>`, `<%- path %>`, `<%# .. %>`
    pub fn render_ejs(&self, source: &str, context: &Context) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(source.len());
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("<%") {
            output.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find("%>") else {
                return Err(TemplateError::Syntax(format!(
                    "unclosed EJS tag at byte {}",
                    offset + start
                )));
            };

            let tag = &after_open[..end];
            let tag = tag.strip_suffix('-').unwrap_or(tag);
            match tag.chars().next() {
                Some('=') => output.push_str(&html_escape(&lookup_text(context, &tag[1..])?)),
                Some('-') => output.push_str(&lookup_text(context, &tag[1..])?),
                Some('#') => {}
                _ => {
                    return Err(TemplateError::Unsupported(format!(
                        "EJS scriptlet `<%{}%>`",
                        tag
                    )))
                }
            }

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        output.push_str(rest);
        Ok(output)
    }
}

fn lookup_text(context: &Context, expr: &str) -> Result<String, TemplateError> {
    let expr = expr.trim();
    let mut segments = expr.split('.');
    let valid = !expr.is_empty() && expr.split('.').all(is_identifier);
    if !valid {
        return Err(TemplateError::Unsupported(format!(
            "EJS expression `{}` (only dotted names are supported)",
            expr
        )));
    }

    let Some(first) = segments.next() else {
        return Ok(String::new());
    };
    let mut current = context.get(first);
    for segment in segments {
        current = current.and_then(|value| value.get(segment));
    }

    Ok(current.map(display_value).unwrap_or_default())
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
