//! TOML configuration.
//!
//! Every section and key is optional; a missing file is not an error for
//! the CLI, which falls back to [`Config::minimal`]. See
//! `config/docsift.example.toml` for a full example.

use anyhow::{Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub language: LanguageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Directory scanned when a scan is requested without one.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Extra globs (relative to the scan root) to leave out of the walk.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Files larger than this are reported as failures without being read.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Extraction worker threads per scan.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            max_file_bytes: default_max_file_bytes(),
            workers: default_workers(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./documents")
}
fn default_max_file_bytes() -> u64 {
    100 * 1024 * 1024
}
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(8)
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Characters of context kept on each side of a match.
    #[serde(default = "default_context_radius")]
    pub context_radius: usize,
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
    #[serde(default = "default_highlight")]
    pub highlight_open: String,
    #[serde(default = "default_highlight")]
    pub highlight_close: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            context_radius: default_context_radius(),
            default_max_results: default_max_results(),
            highlight_open: default_highlight(),
            highlight_close: default_highlight(),
        }
    }
}

fn default_context_radius() -> usize {
    50
}
fn default_max_results() -> usize {
    50
}
fn default_highlight() -> String {
    "**".to_string()
}

/// Language detection policy. Short texts give unreliable guesses, so the
/// threshold and the label used instead are tunable.
#[derive(Debug, Deserialize, Clone)]
pub struct LanguageConfig {
    /// Minimum characters (after stripping punctuation) before detection runs.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    #[serde(default = "default_fallback")]
    pub fallback: String,
    /// Use the fallback label unless the detector reports a reliable guess.
    #[serde(default)]
    pub require_reliable: bool,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            fallback: default_fallback(),
            require_reliable: false,
        }
    }
}

fn default_min_chars() -> usize {
    20
}
fn default_fallback() -> String {
    "unknown".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Defaults for every section; used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Checks cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.index.workers == 0 {
            anyhow::bail!("index.workers must be >= 1");
        }
        if self.index.max_file_bytes == 0 {
            anyhow::bail!("index.max_file_bytes must be > 0");
        }
        for pattern in &self.index.exclude_globs {
            Glob::new(pattern)
                .with_context(|| format!("invalid index.exclude_globs entry: '{}'", pattern))?;
        }
        if self.search.context_radius > 10_000 {
            anyhow::bail!("search.context_radius must be <= 10000");
        }
        if self.search.default_max_results == 0 {
            anyhow::bail!("search.default_max_results must be >= 1");
        }
        if self.language.fallback.trim().is_empty() {
            anyhow::bail!("language.fallback must not be empty");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Loads `path` if it exists, otherwise returns [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}
