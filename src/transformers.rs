//! Built-in transformers that configuration can bind to suffixes.
//!
//! | Name | Output |
//! |------|--------|
//! | `copy` | Source bytes, unchanged |
//! | `markdown` | Standalone HTML page rendered from Markdown |
//! | `template` | Tera template rendered with the transformer context |
//!
//! `markdown` and `template` render to a `String` and are wrapped with
//! [`save_returned`](crate::interpret::save_returned).
//!
//! ## Templates
//!
//! Templates may `include` or `extends` template files under the configured
//! `watch_dirs`, named by their path relative to the source root
//! (`{% include "_templates/header.html" %}`). A template file carries one of
//! [`PARTIAL_SUFFIXES`] or a suffix bound to `template` in `[interpreters]`;
//! everything else in a watch dir (images, scripts, stylesheets) is only
//! watched, never parsed. The lookup set is loaded from disk on every render
//! so an edited partial shows up in the next rebuild.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tera::Tera;
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::interpret::save_returned;
use crate::naming;
use crate::registry::{Context, TransformError, Transformer};

pub const COPY: &str = "copy";
pub const MARKDOWN: &str = "markdown";
pub const TEMPLATE: &str = "template";

/// Names accepted in the `[interpreters]` table.
pub const BUILTIN_NAMES: &[&str] = &[COPY, MARKDOWN, TEMPLATE];

/// Suffixes of watch-dir files loaded as partials and layouts, in addition
/// to the suffixes bound to `template`.
pub const PARTIAL_SUFFIXES: &[&str] = &["html", "htm"];

/// Construct a built-in transformer by name.
pub fn builtin(name: &str, source_root: &Path, config: &SiteConfig) -> Option<Transformer> {
    match name {
        COPY => Some(Transformer::copy()),
        MARKDOWN => Some(save_returned(MARKDOWN, render_markdown)),
        TEMPLATE => {
            let suffixes = PARTIAL_SUFFIXES
                .iter()
                .map(|suffix| suffix.to_string())
                .chain(
                    config
                        .interpreters
                        .iter()
                        .filter(|(_, name)| name.as_str() == TEMPLATE)
                        .map(|(suffix, _)| suffix.clone()),
                )
                .collect();
            let templates = TemplateSet {
                root: source_root.to_path_buf(),
                dirs: config
                    .watch_dirs
                    .iter()
                    .map(|dir| source_root.join(dir))
                    .collect(),
                suffixes,
            };
            Some(save_returned(TEMPLATE, move |source, context| {
                templates.render(source, context)
            }))
        }
        _ => None,
    }
}

// ============================================================================
// Markdown
// ============================================================================

fn render_markdown(source: &Path, context: &Context) -> Result<String, TransformError> {
    let body = fs::read_to_string(source)?;
    let title = extract_title(&body).unwrap_or_else(|| fallback_title(source));
    let site_name = context.get("site_name").and_then(|v| v.as_str());

    let parser = Parser::new_ext(
        &body,
        Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH,
    );
    let mut body_html = String::new();
    md_html::push_html(&mut body_html, parser);

    Ok(markdown_page(&title, site_name, &body_html).into_string())
}

/// Title from the first `# heading` line.
fn extract_title(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .find(|line| line.starts_with("# "))
        .map(|line| line.trim_start_matches("# ").trim().to_string())
        .filter(|title| !title.is_empty())
}

/// `about.html.md` → "about"
fn fallback_title(source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().replace('-', " ")
}

fn markdown_page(title: &str, site_name: Option<&str>, body_html: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title {
                    (title)
                    @if let Some(site) = site_name {
                        " | " (site)
                    }
                }
            }
            body {
                main {
                    article {
                        (PreEscaped(body_html))
                    }
                }
            }
        }
    }
}

// ============================================================================
// Templates
// ============================================================================

struct TemplateSet {
    root: PathBuf,
    dirs: Vec<PathBuf>,
    suffixes: BTreeSet<String>,
}

impl TemplateSet {
    fn render(&self, source: &Path, context: &Context) -> Result<String, TransformError> {
        let mut tera = self.load(source)?;
        let input = fs::read_to_string(source)?;
        let tera_context =
            tera::Context::from_serialize(context).map_err(|e| template_error(source, &e))?;
        tera.render_str(&input, &tera_context)
            .map_err(|e| template_error(source, &e))
    }

    fn is_template(&self, filename: &str) -> bool {
        naming::split_suffix(filename)
            .suffix
            .is_some_and(|suffix| self.suffixes.contains(suffix))
    }

    /// Register the template files under the lookup directories, named
    /// relative to the source root with `/` separators.
    fn load(&self, source: &Path) -> Result<Tera, TransformError> {
        let mut raw = Vec::new();
        for dir in self.dirs.iter().filter(|dir| dir.is_dir()) {
            let walker = WalkDir::new(dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0 || !naming::is_hidden(&e.file_name().to_string_lossy())
                });
            for entry in walker {
                let entry = entry.map_err(io::Error::from)?;
                if !entry.file_type().is_file()
                    || !self.is_template(&entry.file_name().to_string_lossy())
                {
                    continue;
                }
                let rel = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
                let name = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                raw.push((name, fs::read_to_string(entry.path())?));
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(raw)
            .map_err(|e| template_error(source, &e))?;
        Ok(tera)
    }
}

/// Flatten a Tera error and its causes; the top-level message alone only
/// names the one-off template.
fn template_error(path: &Path, err: &tera::Error) -> TransformError {
    let mut message = err.to_string();
    let mut cause = std::error::Error::source(err);
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    TransformError::Template {
        path: path.to_path_buf(),
        message,
    }
}
