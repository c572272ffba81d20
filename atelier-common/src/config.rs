//! Configuration for the Atelier bot core.
//!
//! Configuration lives in a TOML file at `~/.atelier/config.toml`. Every
//! field has a default, so a missing or partial file is fine.
//!
//! # Configuration Priority
//!
//! 1. Explicit config file values
//! 2. Default values

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".atelier"),
        |dirs| dirs.home_dir().join(".atelier"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// ============================================================================
// Command Prefixes
// ============================================================================

/// Trigger prefixes for each command kind.
///
/// Each command kind is recognized by one or more literal prefixes at the
/// start of a message. Matching walks the kinds in the declared field order
/// and, within a kind, the prefixes in list order; the first hit wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixConfig {
    /// Generate from a text prompt
    #[serde(default = "default_imagine_prefix")]
    pub imagine: Vec<String>,

    /// Upscale or vary a finished task
    #[serde(default = "default_up_prefix")]
    pub up: Vec<String>,

    /// Open an image-collecting generate workflow (prompt plus reference images)
    #[serde(default = "default_pad_prefix")]
    pub pad: Vec<String>,

    /// Open a blend workflow (two or more images)
    #[serde(default = "default_blend_prefix")]
    pub blend: Vec<String>,

    /// Open a describe workflow (one image in, text out)
    #[serde(default = "default_describe_prefix")]
    pub describe: Vec<String>,

    /// Close the open workflow and submit it
    #[serde(default = "default_end_prefix")]
    pub end: Vec<String>,

    /// Fetch status/result of a task by id
    #[serde(default = "default_fetch_prefix")]
    pub fetch: Vec<String>,

    /// Re-run a finished task
    #[serde(default = "default_reroll_prefix")]
    pub reroll: Vec<String>,

    /// Report queue status
    #[serde(default = "default_queue_prefix")]
    pub queue: Vec<String>,
}

fn default_imagine_prefix() -> Vec<String> {
    vec!["/i".into(), "/mj".into()]
}

fn default_up_prefix() -> Vec<String> {
    vec!["/u".into()]
}

fn default_pad_prefix() -> Vec<String> {
    vec!["/p".into()]
}

fn default_blend_prefix() -> Vec<String> {
    vec!["/b".into()]
}

fn default_describe_prefix() -> Vec<String> {
    vec!["/d".into()]
}

fn default_end_prefix() -> Vec<String> {
    vec!["/e".into()]
}

fn default_fetch_prefix() -> Vec<String> {
    vec!["/f".into()]
}

fn default_reroll_prefix() -> Vec<String> {
    vec!["/r".into()]
}

fn default_queue_prefix() -> Vec<String> {
    vec!["/q".into()]
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            imagine: default_imagine_prefix(),
            up: default_up_prefix(),
            pad: default_pad_prefix(),
            blend: default_blend_prefix(),
            describe: default_describe_prefix(),
            end: default_end_prefix(),
            fetch: default_fetch_prefix(),
            reroll: default_reroll_prefix(),
            queue: default_queue_prefix(),
        }
    }
}

impl PrefixConfig {
    /// The prefix quoted in user-facing hints for closing a workflow.
    pub fn end_hint(&self) -> &str {
        self.end.first().map_or("/e", String::as_str)
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ============================================================================
// Top-level Config
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Global enable flag. When off, only admins are served.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Submissions allowed per user per UTC day. 0 disables the limit.
    #[serde(default)]
    pub daily_limit: u32,

    /// Seconds an open workflow survives untouched. Absent = never expires.
    #[serde(default)]
    pub session_ttl_secs: Option<u64>,

    /// Send courtesy hints (mode-opened tips, image-count acknowledgements).
    /// Corrective replies are always sent regardless.
    #[serde(default = "default_tip")]
    pub tip: bool,

    /// Where the access record is persisted. Absent = `~/.atelier/access.json`.
    #[serde(default)]
    pub access_record_path: Option<PathBuf>,

    /// Command trigger prefixes
    #[serde(default)]
    pub prefixes: PrefixConfig,

    /// Log output settings
    #[serde(default)]
    pub log: LogConfig,
}

fn default_enabled() -> bool {
    true
}

fn default_tip() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            daily_limit: 0,
            session_ttl_secs: None,
            tip: default_tip(),
            access_record_path: None,
            prefixes: PrefixConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// if the file does not exist.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!(path = %path.display(), "config file absent, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Effective path of the persisted access record.
    pub fn access_record_file(&self) -> PathBuf {
        self.access_record_path
            .clone()
            .unwrap_or_else(|| config_dir().join("access.json"))
    }
}
