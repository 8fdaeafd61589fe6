//! The site aggregate and the full build.
//!
//! A [`Site`] ties a source root to its loaded configuration and dispatch
//! registry. [`Site::build`] walks the source tree and runs every file through
//! the interpretation engine into the build directory:
//!
//! ```text
//! site/                         site/_build/
//! ├── config.toml      (skip)
//! ├── index.html.tmpl  ──────→  ├── index.html
//! ├── about.html.md    ──────→  ├── about.html
//! ├── css/style.css    ──────→  ├── css/style.css
//! ├── _templates/      (skip)
//! ├── .git/            (skip)
//! └── _build/          (skip)
//! ```
//!
//! Every build is a full build. Outputs are overwritten, never cleaned, and
//! the first transformer failure aborts the build. Symlinks are followed, so
//! a linked directory is mirrored like a real one; a link cycle is a walk
//! error. Output names are derived from file names, which must be UTF-8.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::{self, ConfigError, SiteConfig};
use crate::interpret;
use crate::naming;
use crate::registry::{Context, Registry, TransformError};
use crate::staleness::{self, StalenessError};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Context error: {0}")]
    Context(#[from] serde_json::Error),
    #[error("File name is not valid UTF-8: {0}")]
    NonUtf8Name(PathBuf),
    #[error("Failed to build {path}: {source}")]
    Transform {
        path: PathBuf,
        #[source]
        source: TransformError,
    },
}

/// One source file and what the build made of it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltFile {
    /// Source path relative to the source root.
    pub source: PathBuf,
    /// Output path relative to the build directory.
    pub output: PathBuf,
    /// Name of the transformer that produced the output.
    pub transformer: String,
}

/// Result of a full build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub files: Vec<BuiltFile>,
}

impl BuildReport {
    /// Number of outputs produced by something other than the copy fallback.
    pub fn transformed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.transformer != crate::transformers::COPY)
            .count()
    }
}

/// A source tree with its configuration and registry.
#[derive(Debug, Clone)]
pub struct Site {
    source: PathBuf,
    config: SiteConfig,
    registry: Registry,
}

impl Site {
    /// Load `config.toml` from the source root and build the registry.
    pub fn load(source: &Path) -> Result<Self, ConfigError> {
        let config = config::load_config(source)?;
        Self::with_config(source, config)
    }

    /// Create a site from an already resolved configuration.
    pub fn with_config(source: &Path, config: SiteConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = Registry::from_config(&config, source)?;
        Ok(Self {
            source: source.to_path_buf(),
            config,
            registry,
        })
    }

    /// Replace the registry, e.g. to register transformers beyond the built-ins.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Absolute location of the build output directory.
    pub fn build_dir(&self) -> PathBuf {
        self.source.join(&self.config.build_dir)
    }

    /// Latest modification time across the watched paths.
    pub fn latest_change(&self) -> Result<SystemTime, StalenessError> {
        staleness::compute_latest_change(&self.source, &self.config)
    }

    /// Whether a walk entry is content to build.
    fn is_source_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        if naming::is_hidden(&name) || naming::is_private(&name) {
            return false;
        }
        if entry.depth() == 1 {
            return name != self.config.build_dir.as_str() && name != config::CONFIG_FILENAME;
        }
        true
    }

    /// Run the full build: every source file through the interpretation
    /// engine into the build directory.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let build_dir = self.build_dir();
        fs::create_dir_all(&build_dir)?;

        let base_context = serde_json::to_value(&self.config.context)?;
        let mut report = BuildReport::default();

        let walker = WalkDir::new(&self.source)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.is_source_entry(e));

        for entry in walker {
            let entry = entry?;
            if entry.depth() == 0 {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.source)
                .unwrap_or(entry.path())
                .to_path_buf();

            if entry.file_type().is_dir() {
                fs::create_dir_all(build_dir.join(&rel))?;
                continue;
            }

            let filename = entry
                .file_name()
                .to_str()
                .ok_or_else(|| BuildError::NonUtf8Name(rel.clone()))?;
            let output_name = self.registry.resolve_output_name(filename);
            let output = rel.with_file_name(output_name);
            let transformer = self.registry.resolve_transformer(filename);

            let mut context = match &base_context {
                serde_json::Value::Object(map) => map.clone(),
                _ => Context::new(),
            };
            context.insert("source_path".into(), slash_path(&rel).into());
            context.insert("output_path".into(), slash_path(&output).into());

            debug!(
                source = %rel.display(),
                output = %output.display(),
                transformer = transformer.name(),
                "building"
            );
            interpret::interpret_to_path(
                &self.registry,
                entry.path(),
                &build_dir.join(&output),
                &context,
            )
            .map_err(|source| BuildError::Transform {
                path: rel.clone(),
                source,
            })?;

            report.files.push(BuiltFile {
                source: rel,
                output,
                transformer: transformer.name().to_string(),
            });
        }

        Ok(report)
    }
}

/// Relative path with `/` separators, as templates expect.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn build_applies_registered_transformers() {
        let tmp = site_fixture(&[
            ("index.html.tmpl", "<h1>{{ source_path }}</h1>"),
            ("about.html.md", "# About"),
        ]);
        let site = Site::load(tmp.path()).unwrap();
        let report = site.build().unwrap();

        assert_eq!(
            read_output(&site, "index.html"),
            "<h1>index.html.tmpl</h1>"
        );
        assert!(read_output(&site, "about.html").contains("<h1>About</h1>"));
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.transformed_count(), 2);
    }

    #[test]
    fn build_copies_unregistered_files_verbatim() {
        let tmp = site_fixture(&[("style.css", "body { color: red }"), ("README", "hi")]);
        let binary: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        fs::write(tmp.path().join("logo.png"), &binary).unwrap();

        let site = Site::load(tmp.path()).unwrap();
        let report = site.build().unwrap();

        assert_eq!(read_output(&site, "style.css"), "body { color: red }");
        assert_eq!(read_output(&site, "README"), "hi");
        assert_eq!(fs::read(site.build_dir().join("logo.png")).unwrap(), binary);
        assert_eq!(report.transformed_count(), 0);
    }

    #[test]
    fn build_mirrors_subdirectories() {
        let tmp = site_fixture(&[
            ("blog/first.html.md", "# First"),
            ("blog/img/photo.jpg", "jpeg"),
            ("blog/empty/.keep", ""),
        ]);
        let site = Site::load(tmp.path()).unwrap();
        let report = site.build().unwrap();

        assert!(read_output(&site, "blog/first.html").contains("<h1>First</h1>"));
        assert_eq!(read_output(&site, "blog/img/photo.jpg"), "jpeg");
        assert!(site.build_dir().join("blog/empty").is_dir());
        assert!(!site.build_dir().join("blog/empty/.keep").exists());
        assert_eq!(
            output_names(&report),
            vec!["blog/first.html", "blog/img/photo.jpg"]
        );
    }

    #[test]
    fn build_skips_hidden_private_and_config() {
        let tmp = site_fixture(&[
            ("config.toml", "[context]\nsite_name = \"x\"\n"),
            (".git/HEAD", "ref"),
            (".hidden.html", "no"),
            ("_templates/base.html", "tpl"),
            ("_drafts/post.html.md", "# Draft"),
            ("page.html", "yes"),
        ]);
        let site = Site::load(tmp.path()).unwrap();
        let report = site.build().unwrap();

        assert_eq!(output_names(&report), vec!["page.html"]);
        assert!(!site.build_dir().join("config.toml").exists());
        assert!(!site.build_dir().join("_templates").exists());
        assert!(!site.build_dir().join(".git").exists());
    }

    #[test]
    fn build_never_reads_its_own_output() {
        let tmp = site_fixture(&[("page.html", "one")]);
        let site = Site::load(tmp.path()).unwrap();
        site.build().unwrap();
        let report = site.build().unwrap();

        assert_eq!(output_names(&report), vec!["page.html"]);
        assert!(!site.build_dir().join("_build").exists());
    }

    #[test]
    fn build_honors_custom_build_dir() {
        let tmp = site_fixture(&[
            ("config.toml", "build_dir = \"public\"\n"),
            ("page.html", "x"),
        ]);
        let site = Site::load(tmp.path()).unwrap();
        site.build().unwrap();
        let report = site.build().unwrap();

        assert_eq!(site.build_dir(), tmp.path().join("public"));
        assert_eq!(output_names(&report), vec!["page.html"]);
        assert!(!tmp.path().join("public/public").exists());
    }

    #[test]
    fn build_passes_config_context_to_templates() {
        let tmp = site_fixture(&[
            ("config.toml", "[context]\nsite_name = \"Field Notes\"\nyear = 2024\n"),
            ("index.html.tmpl", "{{ site_name }} {{ year }} {{ output_path }}"),
        ]);
        let site = Site::load(tmp.path()).unwrap();
        site.build().unwrap();

        assert_eq!(read_output(&site, "index.html"), "Field Notes 2024 index.html");
    }

    #[test]
    fn build_uses_templates_from_watch_dirs() {
        let tmp = site_fixture(&[
            ("config.toml", "watch_dirs = [\"_templates\"]\n"),
            ("_templates/nav.html", "<nav>{{ output_path }}</nav>"),
            ("docs/index.html.tmpl", "{% include \"_templates/nav.html\" %}"),
        ]);
        let site = Site::load(tmp.path()).unwrap();
        site.build().unwrap();

        assert_eq!(
            read_output(&site, "docs/index.html"),
            "<nav>docs/index.html</nav>"
        );
    }

    #[test]
    fn build_stops_at_first_transformer_error() {
        let tmp = site_fixture(&[
            ("a.html", "fine"),
            ("b.html.tmpl", "{{ undefined_var }}"),
            ("c.html", "never"),
        ]);
        let site = Site::load(tmp.path()).unwrap();
        let err = site.build().unwrap_err();

        match err {
            BuildError::Transform { path, source } => {
                assert_eq!(path, Path::new("b.html.tmpl"));
                assert!(matches!(source, TransformError::Template { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(read_output(&site, "a.html"), "fine");
        assert!(!site.build_dir().join("c.html").exists());
    }

    #[test]
    fn build_with_custom_registry() {
        let tmp = site_fixture(&[("notes.txt.rev", "abc")]);
        let mut registry = Registry::new();
        registry.register(
            "rev",
            interpret::save_returned("reverse", |source, _context| {
                Ok(fs::read_to_string(source)?.chars().rev().collect())
            }),
        );

        let site = Site::load(tmp.path()).unwrap().with_registry(registry);
        let report = site.build().unwrap();

        assert_eq!(read_output(&site, "notes.txt"), "cba");
        assert_eq!(report.files[0].transformer, "reverse");
    }

    #[cfg(unix)]
    #[test]
    fn build_follows_symlinked_directories() {
        let vendor = site_fixture(&[("b.css", "b {}"), ("theme.html.md", "# Theme")]);
        let tmp = site_fixture(&[("page.html", "x")]);
        std::os::unix::fs::symlink(vendor.path(), tmp.path().join("vendor")).unwrap();
        std::os::unix::fs::symlink(
            vendor.path().join("b.css"),
            tmp.path().join("linked.css"),
        )
        .unwrap();

        let site = Site::load(tmp.path()).unwrap();
        let report = site.build().unwrap();

        assert_eq!(read_output(&site, "vendor/b.css"), "b {}");
        assert!(read_output(&site, "vendor/theme.html").contains("<h1>Theme</h1>"));
        assert_eq!(read_output(&site, "linked.css"), "b {}");
        assert!(site.build_dir().join("vendor").is_dir());
        assert_eq!(
            output_names(&report),
            vec!["linked.css", "page.html", "vendor/b.css", "vendor/theme.html"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn build_symlink_cycle_is_walk_error() {
        let tmp = site_fixture(&[("blog/post.html", "x")]);
        std::os::unix::fs::symlink(tmp.path().join("blog"), tmp.path().join("blog/again"))
            .unwrap();

        let site = Site::load(tmp.path()).unwrap();
        assert!(matches!(site.build(), Err(BuildError::Walk(_))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn build_rejects_non_utf8_file_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = site_fixture(&[]);
        let name = OsStr::from_bytes(b"bad\xff.html.md");
        fs::write(tmp.path().join(name), "# Bad").unwrap();

        let site = Site::load(tmp.path()).unwrap();
        match site.build() {
            Err(BuildError::NonUtf8Name(path)) => assert_eq!(path.as_os_str(), name),
            other => panic!("unexpected result: {other:?}"),
        }
        let outputs: Vec<_> = fs::read_dir(site.build_dir()).unwrap().collect();
        assert!(outputs.is_empty(), "no mangled output expected");
    }

    #[test]
    fn load_rejects_invalid_config() {
        let tmp = site_fixture(&[("config.toml", "[interpreters]\nmako = \"mako\"\n")]);
        assert!(matches!(
            Site::load(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn slash_path_joins_components() {
        assert_eq!(slash_path(Path::new("a/b/c.html")), "a/b/c.html");
        assert_eq!(slash_path(Path::new("c.html")), "c.html");
    }
}
