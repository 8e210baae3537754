//! File classification by path.
//!
//! All predicates take a path relative to the source root and never look at
//! file contents. The ignored check always runs first.

use std::path::{Component, Path};

/// Directories that never take part in a build, wherever they appear
pub const SPECIAL_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".trash",
    ".Trash",
    ".pagewright",
    ".cache",
    ".idea",
    ".vscode",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Mustache,
    Ejs,
    None,
}

impl TemplateKind {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            TemplateKind::Mustache => Some("mustache"),
            TemplateKind::Ejs => Some("ejs"),
            TemplateKind::None => None,
        }
    }
}

/// Result of classifying one source path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileClass {
    Ignored,
    Template(TemplateKind),
    Markdown,
    Asset,
}

/// True if any segment starts with `_` or names a special directory
pub fn is_ignored(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(segment) => {
            let segment = segment.to_string_lossy();
            segment.starts_with('_') || SPECIAL_DIRS.contains(&segment.as_ref())
        }
        _ => false,
    })
}

pub fn template_kind(path: &Path) -> TemplateKind {
    match extension(path) {
        Some(ext) if ext.eq_ignore_ascii_case("mustache") => TemplateKind::Mustache,
        Some(ext) if ext.eq_ignore_ascii_case("ejs") => TemplateKind::Ejs,
        _ => TemplateKind::None,
    }
}

pub fn is_template(path: &Path) -> bool {
    template_kind(path) != TemplateKind::None
}

pub fn is_markdown(path: &Path) -> bool {
    matches!(extension(path), Some(ext) if ext.eq_ignore_ascii_case("md"))
}

pub fn is_asset(path: &Path) -> bool {
    classify(path) == FileClass::Asset
}

pub fn classify(path: &Path) -> FileClass {
    if is_ignored(path) {
        return FileClass::Ignored;
    }
    match template_kind(path) {
        TemplateKind::None if is_markdown(path) => FileClass::Markdown,
        TemplateKind::None => FileClass::Asset,
        kind => FileClass::Template(kind),
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}
