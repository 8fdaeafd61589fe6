//! # sitewright
//!
//! A small static site builder. Every file in the source tree goes through a
//! transformer picked by its last suffix, and the result lands in a build
//! directory inside the source root. A development server serves that
//! directory and rebuilds the site when a request arrives after a source
//! change.
//!
//! # Architecture
//!
//! ```text
//! config.toml ─▶ Site { config, Registry }
//!                  │
//!   build:         ├─ walk source tree ─▶ interpret_to_path ─▶ _build/
//!                  │      (suffix ─▶ Transformer, else verbatim copy)
//!                  │
//!   serve:         └─ RebuildState { baseline }
//!                        request ─▶ latest_change > baseline? ─▶ rebuild ─▶ file
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`registry`] | Suffix → transformer dispatch, output filename resolution |
//! | [`interpret`] | Runs the resolved transformer into a writer or a file; copy fallback; return-value adapter |
//! | [`transformers`] | Built-in `copy`, `markdown` and `template` transformers |
//! | [`site`] | The `Site` aggregate and the full build |
//! | [`staleness`] | Latest modification time across the watched paths |
//! | [`server`] | axum dev server: rebuild middleware in front of `ServeDir` |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`naming`] | Suffix splitting, hidden and private entry names |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## Suffix Dispatch, Suffix Stripping
//!
//! The suffix that selects a transformer is also removed from the output
//! name, so the name before it is the published name: `index.html.tmpl`
//! becomes `index.html`, `notes.html.md` becomes `notes.html`. Files whose
//! suffix is not registered keep their name and bytes.
//!
//! ## Full Builds Only
//!
//! There is no dependency graph and no per-file diffing. A change anywhere in
//! the watched set rebuilds everything, sequentially.
//!
//! ## Shallow Change Detection
//!
//! The staleness check stats the top level of the source root and one level
//! of each configured watch directory. It does not recurse; see [`staleness`].
//!
//! ## Rebuild Ordering
//!
//! The baseline timestamp advances only after a rebuild succeeds. A broken
//! template makes every request answer `500` until it is fixed, instead of
//! quietly serving stale output after the first failure.

pub mod config;
pub mod interpret;
pub mod logging;
pub mod naming;
pub mod output;
pub mod registry;
pub mod server;
pub mod site;
pub mod staleness;
pub mod transformers;

#[cfg(test)]
pub(crate) mod test_helpers;
