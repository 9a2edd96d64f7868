//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/threadline.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! static_dir = "./dist"
//!
//! [seed]
//! articles_dir = "./articles"
//! include_globs = ["**/*.md"]
//! demo_comments = true
//! ```
//!
//! The `PORT` environment variable, when set, replaces the port of
//! `server.bind`.

use anyhow::{Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Front-end bundle served for non-API paths.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedConfig {
    #[serde(default = "default_articles_dir")]
    pub articles_dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Add the demo discussion to the first seeded article.
    #[serde(default = "default_demo_comments")]
    pub demo_comments: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            articles_dir: default_articles_dir(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            demo_comments: default_demo_comments(),
        }
    }
}

fn default_articles_dir() -> PathBuf {
    PathBuf::from("./articles")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}
fn default_demo_comments() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if let Ok(port) = std::env::var("PORT") {
        apply_port_override(&mut config, &port)?;
    }

    validate(&config)?;
    Ok(config)
}

/// Replace the port of `server.bind`, keeping its host.
pub fn apply_port_override(config: &mut Config, port: &str) -> Result<()> {
    let port: u16 = port
        .trim()
        .parse()
        .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
    let host = match config.server.bind.rsplit_once(':') {
        Some((host, _)) => host.to_string(),
        None => config.server.bind.clone(),
    };
    config.server.bind = format!("{}:{}", host, port);
    Ok(())
}

pub fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.seed.include_globs.is_empty() {
        anyhow::bail!("seed.include_globs must contain at least one pattern");
    }
    for pattern in config
        .seed
        .include_globs
        .iter()
        .chain(config.seed.exclude_globs.iter())
    {
        Glob::new(pattern).with_context(|| format!("invalid seed glob: '{}'", pattern))?;
    }

    Ok(())
}
