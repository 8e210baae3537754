//! # pagewright-core
//!
//! Core build pipeline for the pagewright static site builder.
//!
//! A build indexes a source tree, copies assets through unchanged and then
//! hands over to one of three strategies (freeform, book, blog) that render
//! markdown and Mustache/EJS templates into a deployable output tree.

pub mod classify;
pub mod config;
pub mod disk;
pub mod error;
pub mod frontmatter;
pub mod index;
pub mod layout;
pub mod logger;
pub mod markdown;
pub mod models;
pub mod output;
pub mod pages;
pub mod pipeline;
pub mod slug;
pub mod store;
pub mod strategy;
pub mod template;

pub use classify::{classify, is_asset, is_ignored, is_markdown, template_kind, FileClass, TemplateKind};
pub use config::{BuildConfig, ConfigError, SiteConfig};
pub use disk::{Disk, LocalDisk, MemoryDisk};
pub use error::{BuildError, ErrorKind};
pub use index::SourceIndexer;
pub use layout::{Layout, LayoutPolicy, Layouts, DEFAULT_SHELL};
pub use logger::BuildLogger;
pub use markdown::{HeadingIds, MarkdownProcessor};
pub use models::{FrontMatter, PageData};
pub use output::{output_path, OutputWriter};
pub use pages::{load_pages, page_files, sort_pages, SortOrder};
pub use pipeline::{BuildOutcome, BuildPipeline, CancelSignal};
pub use slug::slugify;
pub use store::{BuildRecord, BuildStore, JsonBuildStore, MemoryBuildStore, StoreError};
pub use strategy::{BuildContext, OutputClaims, StrategyRunner};
pub use template::{Context, TemplateError, TemplateRenderer};

pub use pagewright_types::{
    BuildId, BuildLogLine, BuildPhase, BuildResult, BuildStatus, FileNode, LogLevel, NodeKind,
    Strategy,
};
