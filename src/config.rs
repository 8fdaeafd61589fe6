//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in
//! the source root and is sparse: stock defaults are the base layer and the
//! user's file overrides just the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! build_dir = "_build"      # Output directory, inside the source root
//! watch_dirs = []           # Extra directories checked for changes by `serve`
//!
//! [interpreters]            # suffix = built-in transformer name
//! md = "markdown"
//! tmpl = "template"
//!
//! [context]                 # Variables handed to every transformer
//!
//! [serve]
//! port = 8000
//! rebuild = true            # Rebuild on request when sources changed
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

use crate::naming;
use crate::transformers;

/// Name of the configuration file within the source root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Name of the build output directory, relative to the source root.
    pub build_dir: String,
    /// Directories (relative to the source root) whose immediate entries are
    /// also checked for changes. Template files in these directories are
    /// available to the `template` transformer for `include` and `extends`.
    pub watch_dirs: Vec<String>,
    /// Suffix (no leading dot) → built-in transformer name.
    pub interpreters: BTreeMap<String, String>,
    /// Site-wide variables passed to every transformer.
    pub context: toml::Table,
    /// Development server settings.
    pub serve: ServeConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            build_dir: "_build".to_string(),
            watch_dirs: Vec::new(),
            interpreters: default_interpreters(),
            context: toml::Table::new(),
            serve: ServeConfig::default(),
        }
    }
}

fn default_interpreters() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("md".to_string(), "markdown".to_string()),
        ("tmpl".to_string(), "template".to_string()),
    ])
}

/// Development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    /// TCP port to bind on localhost.
    pub port: u16,
    /// Check for source changes and rebuild before answering each request.
    pub rebuild: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            rebuild: true,
        }
    }
}

impl SiteConfig {
    /// Validate names and paths before anything touches the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let build_dir = self.build_dir.as_str();
        if build_dir.is_empty() {
            return Err(ConfigError::Validation("build_dir must not be empty".into()));
        }
        if build_dir.contains(['/', '\\']) || naming::is_hidden(build_dir) {
            return Err(ConfigError::Validation(format!(
                "build_dir must be a single, non-hidden directory name, got {build_dir:?}"
            )));
        }

        for dir in &self.watch_dirs {
            let path = Path::new(dir);
            if dir.is_empty()
                || path.is_absolute()
                || path.components().any(|c| matches!(c, Component::ParentDir))
            {
                return Err(ConfigError::Validation(format!(
                    "watch_dirs entries must be relative paths inside the source root, got {dir:?}"
                )));
            }
        }

        for (suffix, name) in &self.interpreters {
            if suffix.is_empty() || suffix.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "interpreter suffix must be non-empty and have no dots, got {suffix:?}"
                )));
            }
            if !transformers::BUILTIN_NAMES.contains(&name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "unknown transformer {name:?} for suffix {suffix:?} (expected one of: {})",
                    transformers::BUILTIN_NAMES.join(", ")
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the source root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# sitewright configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory the built site is written to, inside the source root.
# Underscore-prefixed names are never treated as source content.
build_dir = "_build"

# Extra directories whose files are checked for changes by `serve`.
# Their .html/.htm files (and files with a suffix bound to `template`) are
# also available to `{% include %}` and `{% extends %}`.
# Example: watch_dirs = ["_templates"]
watch_dirs = []

# ---------------------------------------------------------------------------
# Interpreters
# ---------------------------------------------------------------------------
# Maps a file suffix (without the dot) to a built-in transformer. The suffix
# is stripped from the output name: `index.html.tmpl` -> `index.html`.
# Files with any other suffix are copied verbatim.
#
# Built-in transformers:
#   copy      verbatim byte copy
#   markdown  Markdown rendered into a standalone HTML page
#   template  Tera template rendered with the [context] variables
[interpreters]
md = "markdown"
tmpl = "template"

# ---------------------------------------------------------------------------
# Context
# ---------------------------------------------------------------------------
# Variables handed to every transformer. Templates see them by name, next to
# `source_path` and `output_path`.
# Example: site_name = "My Site"
[context]

# ---------------------------------------------------------------------------
# Development server
# ---------------------------------------------------------------------------
[serve]
# TCP port on localhost.
port = 8000

# Rebuild before answering a request when sources changed since the last build.
rebuild = true
"##
}
