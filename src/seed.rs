//! Seeding the store from article documents on disk.
//!
//! Each article is a text file with YAML front matter, a line containing
//! only `---`, then the body:
//!
//! ```text
//! title: Functional programming in practice
//! lead: Why pure functions make refactoring safe
//! ---
//! The full article body...
//! ```
//!
//! A leading `---` line before the front matter is also accepted. The
//! front matter may carry an `id`; otherwise the store generates one.
//!
//! Seeding only happens when the store holds no articles, so restarting
//! the server never duplicates content. All articles are written in one
//! batch: a bad document leaves the store empty and the next start tries
//! again.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

use threadline_core::models::{NewArticle, NewComment};
use threadline_core::store::Store;

use crate::config::Config;

/// An article parsed from a file under `seed.articles_dir`.
#[derive(Debug, Clone)]
pub struct SeedArticle {
    /// Path relative to the articles directory.
    pub source_path: String,
    pub article: NewArticle,
}

/// Outcome of [`seed_if_empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub articles: usize,
    pub comments: usize,
    /// The store already had articles and was left untouched.
    pub skipped: bool,
}

#[derive(Debug, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    lead: Option<String>,
}

/// Parse one article document into creation data.
pub fn parse_article(text: &str) -> Result<NewArticle> {
    let text = text.replace("\r\n", "\n");
    let text = text.strip_prefix("---\n").unwrap_or(&text);

    let (front, body) = text
        .split_once("\n---\n")
        .context("missing '---' line between front matter and body")?;

    let meta: FrontMatter =
        serde_yaml::from_str(front).context("invalid YAML front matter")?;

    Ok(NewArticle {
        id: meta.id,
        title: meta.title,
        lead: meta.lead,
        body: body.to_string(),
    })
}

/// Walk `seed.articles_dir` and parse every matching file, sorted by path.
pub fn scan_articles(config: &Config) -> Result<Vec<SeedArticle>> {
    let seed = &config.seed;
    let root = &seed.articles_dir;
    if !root.exists() {
        bail!("articles directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&seed.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(seed.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut articles = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        articles.push(read_article(path, rel_str)?);
    }

    // Sort for deterministic ordering
    articles.sort_by(|a, b| a.source_path.cmp(&b.source_path));

    Ok(articles)
}

fn read_article(path: &Path, relative_path: String) -> Result<SeedArticle> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading article {}", path.display()))?;
    let article =
        parse_article(&text).with_context(|| format!("parsing article {}", path.display()))?;
    Ok(SeedArticle {
        source_path: relative_path,
        article,
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Populate an empty store from the configured articles directory.
pub async fn seed_if_empty(store: &dyn Store, config: &Config) -> Result<SeedReport> {
    if store.count_articles().await? > 0 {
        tracing::info!("store already has articles, skipping seed");
        return Ok(SeedReport {
            skipped: true,
            ..Default::default()
        });
    }

    if !config.seed.articles_dir.exists() {
        tracing::warn!(
            dir = %config.seed.articles_dir.display(),
            "articles directory not found, starting with an empty store"
        );
        return Ok(SeedReport::default());
    }

    let sources = scan_articles(config)?;
    check_duplicate_ids(&sources)?;
    tracing::info!(count = sources.len(), "seeding articles");

    let articles = store
        .create_articles(sources.into_iter().map(|s| s.article).collect())
        .await
        .context("seeding articles")?;

    let mut report = SeedReport {
        articles: articles.len(),
        ..Default::default()
    };
    if config.seed.demo_comments {
        if let Some(first) = articles.first() {
            report.comments = seed_demo_comments(store, &first.id).await?;
        }
    }

    Ok(report)
}

/// Name both files when two documents claim the same article id.
fn check_duplicate_ids(sources: &[SeedArticle]) -> Result<()> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for source in sources {
        if let Some(ref id) = source.article.id {
            if let Some(previous) = seen.insert(id, &source.source_path) {
                bail!(
                    "{} and {} both use article id '{}'",
                    previous,
                    source.source_path,
                    id
                );
            }
        }
    }
    Ok(())
}

/// Add a small demo discussion to an article. Returns the comment count.
async fn seed_demo_comments(store: &dyn Store, article_id: &str) -> Result<usize> {
    let post = |username: &str, text: &str, parent: Option<&str>| NewComment {
        article_id: article_id.to_string(),
        text: text.to_string(),
        username: Some(username.to_string()),
        parent_id: parent.map(str::to_string),
    };

    let opener = store
        .create_comment(post("User 1", "Functional programming SUXXX!", None))
        .await?;
    let rebuttal = store
        .create_comment(post("User 2", "No, you suck!!", Some(&opener.id)))
        .await?;
    store
        .create_comment(post("User 3", "I like him!", Some(&rebuttal.id)))
        .await?;
    store
        .create_comment(post("User 4", "I agree", Some(&opener.id)))
        .await?;
    store
        .create_comment(post("User 5", "I like modifying global variables 😊", None))
        .await?;

    Ok(5)
}
