//! Content model structs for front matter and loaded pages.

use crate::output::output_path;
use crate::pages::{numeric_prefix, parse_date};
use crate::slug::slugify;
use chrono::{DateTime, Utc};
use pagewright_types::FileNode;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Front matter metadata from markdown files
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FrontMatter {
    #[serde(default, deserialize_with = "scalar_string", skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    #[serde(default, deserialize_with = "scalar_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "scalar_string", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, deserialize_with = "scalar_string", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, deserialize_with = "string_list", skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,

    #[serde(default, deserialize_with = "string_list", skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<String>,

    /// Any other keys, passed through to templates
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// A markdown page loaded from the source tree
#[derive(Debug, Clone)]
pub struct PageData {
    /// Path relative to the source root
    pub path: PathBuf,
    pub raw_markdown: String,
    pub front_matter: FrontMatter,
    /// Markdown body converted to HTML, without any layout applied
    pub rendered_html: String,
    pub source_node: FileNode,
}

impl PageData {
    /// File stem without a numeric ordering prefix (`02_intro.md` -> `intro`)
    pub fn stem(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled");
        match numeric_prefix(stem) {
            Some(_) => stem
                .split_once('_')
                .map(|(_, rest)| rest)
                .unwrap_or(stem)
                .to_string(),
            None => stem.to_string(),
        }
    }

    /// Front matter title, falling back to the file stem
    pub fn title(&self) -> String {
        match &self.front_matter.title {
            Some(title) if !title.trim().is_empty() => title.clone(),
            _ => self.stem(),
        }
    }

    pub fn slug(&self) -> String {
        slugify(&self.title())
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.front_matter.date.as_deref().and_then(parse_date)
    }

    /// Output path relative to the output root
    pub fn output_path(&self) -> PathBuf {
        output_path(&self.path)
    }

    pub fn file_name(&self) -> &Path {
        self.path.file_name().map(Path::new).unwrap_or(&self.path)
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(value) => scalar_to_string(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom("expected a string, number or boolean")),
    }
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(Vec::new()),
        Some(serde_yaml::Value::Sequence(items)) => items
            .iter()
            .map(|item| {
                scalar_to_string(item)
                    .ok_or_else(|| de::Error::custom("expected a list of strings"))
            })
            .collect(),
        Some(value) => scalar_to_string(&value)
            .map(|s| vec![s])
            .ok_or_else(|| de::Error::custom("expected a string or a list of strings")),
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
