use std::{fs, path::{Path, PathBuf}, time::Duration};
use anyhow::{Context, Result};
use serde::Deserialize;
use crate::util::DEFAULT_PREFIX;

/// Contents of the optional JSON config file. Every field may be omitted.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub dir: Option<PathBuf>,
    pub message_prefix: Option<String>,
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub dry_run: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub git: Option<String>,
}

/// Load a config file. An empty file means defaults; a relative `dir` is
/// taken relative to the file's own directory.
pub fn load(path: &Path) -> Result<FileConfig> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    if s.trim().is_empty() { return Ok(FileConfig::default()); }
    let mut cfg: FileConfig = serde_json::from_str(&s)
        .with_context(|| format!("parsing config {}", path.display()))?;
    if let (Some(dir), Some(parent)) = (cfg.dir.as_ref(), path.parent()) {
        if dir.is_relative() {
            cfg.dir = Some(parent.join(dir));
        }
    }
    Ok(cfg)
}

/// Values from flags and environment; `None` falls through to the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub dir: Option<PathBuf>,
    pub message_prefix: Option<String>,
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub dry_run: bool,
    pub timeout_secs: Option<u64>,
    pub git: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub dir: PathBuf,
    pub message_prefix: String,
    pub remote: Option<String>,
    pub branch: Option<String>,
    pub dry_run: bool,
    pub timeout: Option<Duration>,
    pub git: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            message_prefix: DEFAULT_PREFIX.to_string(),
            remote: None,
            branch: None,
            dry_run: false,
            timeout: None,
            git: "git".to_string(),
        }
    }
}

impl Config {
    pub fn resolve(file: FileConfig, over: Overrides) -> Self {
        let d = Config::default();
        // zero seconds disables the deadline
        let timeout_secs = over.timeout_secs.or(file.timeout_secs).filter(|s| *s > 0);
        Self {
            dir: over.dir.or(file.dir).unwrap_or(d.dir),
            message_prefix: over.message_prefix.or(file.message_prefix).unwrap_or(d.message_prefix),
            remote: over.remote.or(file.remote),
            branch: over.branch.or(file.branch),
            dry_run: over.dry_run || file.dry_run.unwrap_or(false),
            timeout: timeout_secs.map(Duration::from_secs),
            git: over.git.or(file.git).unwrap_or(d.git),
        }
    }
}
