//! Init command implementation.

use anyhow::{Context, Result};
use pagewright_core::{SiteConfig, Strategy};
use std::fs;
use std::path::{Path, PathBuf};

const SITE_DIR: &str = "site";

/// Scaffold a starter site for `strategy` under `path`
pub fn init_project(path: Option<&Path>, strategy: &str) -> Result<()> {
    let strategy: Strategy = strategy.parse()?;
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    write_config(root, strategy)?;

    let site = root.join(SITE_DIR);
    write_file(&site.join("global.css"), GLOBAL_CSS)?;
    for (rel, contents) in starter_files(strategy) {
        write_file(&site.join(rel), contents)?;
    }

    println!("✓ pagewright ({}) initialized in {:?}", strategy, root);
    println!("  - Edit pagewright.yml to change the strategy or paths");
    println!("  - Run `pagewright build` to render into dist/");
    Ok(())
}

fn write_config(root: &Path, strategy: Strategy) -> Result<()> {
    let config_path = root.join("pagewright.yml");
    if config_path.exists() {
        println!("pagewright.yml already exists at {:?}", config_path);
        return Ok(());
    }

    let mut config = SiteConfig::default();
    config.strategy = Some(strategy.to_string());
    config.source = Some(PathBuf::from(SITE_DIR));
    config.output = Some(PathBuf::from("dist"));
    let yaml = serde_yaml::to_string(&config).context("Failed to encode config")?;
    fs::write(&config_path, yaml)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Created {:?}", config_path);
    Ok(())
}

/// Write `contents` unless the file already exists
fn write_file(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        tracing::debug!("Keeping existing {:?}", path);
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    println!("Created {:?}", path);
    Ok(())
}

fn starter_files(strategy: Strategy) -> Vec<(&'static str, &'static str)> {
    match strategy {
        Strategy::Freeform => vec![
            ("_layouts/page.mustache", PAGE_LAYOUT),
            ("index.md", FREEFORM_INDEX),
        ],
        Strategy::Book => vec![
            ("_layouts/book.mustache", BOOK_LAYOUT),
            ("_pages/1_introduction.md", BOOK_INTRO),
            ("_pages/2_getting_started.md", BOOK_SECOND),
        ],
        Strategy::Blog => vec![
            ("_layouts/blog-index.mustache", BLOG_INDEX_LAYOUT),
            ("_layouts/page.mustache", PAGE_LAYOUT),
            ("posts/hello-world.md", BLOG_POST),
        ],
    }
}

const GLOBAL_CSS: &str = "body {
  font-family: system-ui, sans-serif;
  max-width: 42rem;
  margin: 2rem auto;
  line-height: 1.6;
}
";

const PAGE_LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>{{{globalCss}}}</style>
<style>{{{additionalStyles}}}</style>
</head>
<body>
{{{content}}}
</body>
</html>
"#;

const FREEFORM_INDEX: &str = "---
layout: page
title: Home
---

# Welcome

Every markdown file outside `_` directories becomes its own page.
";

const BOOK_LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>{{{globalCss}}}</style>
</head>
<body>
<nav>
<ol>
{{#tableOfContents}}<li><a href="{{href}}">{{title}}</a></li>
{{/tableOfContents}}</ol>
</nav>
{{{content}}}
</body>
</html>
"#;

const BOOK_INTRO: &str = "---
title: Introduction
---

Pages in `_pages` are ordered by their numeric prefix.
";

const BOOK_SECOND: &str = "---
title: Getting Started
---

Add `3_next_chapter.md` to continue the book.
";

const BLOG_INDEX_LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>{{{globalCss}}}</style>
</head>
<body>
<h1>{{title}}</h1>
{{#posts}}<article>
<h2><a href="{{url}}">{{title}}</a></h2>
<time>{{date}}</time>
<p>{{summary}}</p>
</article>
{{/posts}}{{^hasPosts}}<p>No posts yet.</p>
{{/hasPosts}}</body>
</html>
"#;

const BLOG_POST: &str = "---
title: Hello, world
date: 2025-01-01
summary: The first post
---

Posts without a `layout` fall back to a plain built-in page.
Add `layout: page` to use `_layouts/page.mustache` instead.
";
