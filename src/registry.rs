//! Suffix-keyed transformer dispatch.
//!
//! The registry maps a file suffix (`"md"`, `"tmpl"`, no leading dot) to the
//! [`Transformer`] that renders files carrying it. It is populated once from
//! configuration and only read afterwards. A suffix without an entry is not an
//! error: those files get the verbatim copy fallback and keep their name.
//!
//! ```text
//! about.html.md     → markdown → about.html
//! index.html.tmpl   → template → index.html
//! logo.png          → copy     → logo.png
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ConfigError, SiteConfig};
use crate::{interpret, naming, transformers};

/// Extra variables handed to a transformer alongside the source path.
pub type Context = serde_json::Map<String, serde_json::Value>;

type RenderFn =
    dyn Fn(&Path, &mut dyn Write, &Context) -> Result<(), TransformError> + Send + Sync;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Template error in {path}: {message}")]
    Template { path: PathBuf, message: String },
}

/// A named content transformer.
///
/// Reads the source file itself and writes the complete rendered output to
/// the destination. Cloning is cheap; clones share the same function.
#[derive(Clone)]
pub struct Transformer {
    name: Arc<str>,
    render: Arc<RenderFn>,
}

impl Transformer {
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Path, &mut dyn Write, &Context) -> Result<(), TransformError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            render: Arc::new(render),
        }
    }

    /// The verbatim byte-copy transformer used when no suffix matches.
    pub fn copy() -> Self {
        Self::new(transformers::COPY, |source, destination, _context| {
            interpret::default_copy(source, destination)?;
            Ok(())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(
        &self,
        source: &Path,
        destination: &mut dyn Write,
        context: &Context,
    ) -> Result<(), TransformError> {
        (self.render)(source, destination, context)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer").field("name", &self.name).finish()
    }
}

/// Suffix → transformer mapping with a copy fallback.
#[derive(Debug, Clone)]
pub struct Registry {
    transformers: HashMap<String, Transformer>,
    fallback: Transformer,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry. Every file resolves to the copy fallback.
    pub fn new() -> Self {
        Self {
            transformers: HashMap::new(),
            fallback: Transformer::copy(),
        }
    }

    /// Build the registry from the `[interpreters]` table.
    ///
    /// Names are resolved against the built-in transformers; the source root
    /// anchors the template lookup directories.
    pub fn from_config(config: &SiteConfig, source_root: &Path) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (suffix, name) in &config.interpreters {
            let transformer = transformers::builtin(name, source_root, config).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "unknown transformer {name:?} for suffix {suffix:?}"
                ))
            })?;
            registry.register(suffix.clone(), transformer);
        }
        Ok(registry)
    }

    /// Register a transformer for a suffix. The last registration wins; the
    /// displaced transformer is returned.
    pub fn register(
        &mut self,
        suffix: impl Into<String>,
        transformer: Transformer,
    ) -> Option<Transformer> {
        self.transformers.insert(suffix.into(), transformer)
    }

    pub fn is_registered(&self, suffix: &str) -> bool {
        self.transformers.contains_key(suffix)
    }

    /// Registered suffixes, sorted.
    pub fn suffixes(&self) -> Vec<&str> {
        let mut suffixes: Vec<&str> = self.transformers.keys().map(String::as_str).collect();
        suffixes.sort_unstable();
        suffixes
    }

    /// Output filename for a source filename.
    ///
    /// Drops the last suffix iff it is registered:
    /// - `"index.mako"` → `"index"`
    /// - `"archive.tar.mako"` → `"archive.tar"`
    /// - `"style.css"` → `"style.css"` (unregistered)
    /// - `"README"` → `"README"` (no suffix)
    pub fn resolve_output_name<'a>(&self, filename: &'a str) -> &'a str {
        let split = naming::split_suffix(filename);
        match split.suffix {
            Some(suffix) if self.is_registered(suffix) => split.stem,
            _ => filename,
        }
    }

    /// Transformer for a source filename; the copy fallback when the last
    /// suffix is absent or unregistered. Never fails.
    pub fn resolve_transformer(&self, filename: &str) -> &Transformer {
        naming::split_suffix(filename)
            .suffix
            .and_then(|suffix| self.transformers.get(suffix))
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &Transformer {
        &self.fallback
    }
}
