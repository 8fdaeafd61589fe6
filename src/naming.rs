//! Centralized filename conventions for source entries.
//!
//! Every part of the build that looks at a filename goes through this module,
//! so dispatch, the build walk and the staleness check agree on what a name
//! means.
//!
//! ## Suffixes
//!
//! Only the **last** dot-delimited segment of a name is its suffix:
//! - `index.html.tmpl` → stem `index.html`, suffix `tmpl`
//! - `archive.tar.gz` → stem `archive.tar`, suffix `gz`
//! - `README` → no suffix
//! - `.htaccess` → no suffix (a leading dot marks a hidden file, not a suffix)
//!
//! ## Hidden and private entries
//!
//! - **Hidden** (`.git`, `.DS_Store`): dot-prefixed, ignored everywhere.
//! - **Private** (`_templates`, `_build`): underscore-prefixed, never copied to
//!   the build output but may still be watched for changes.

/// A filename split at its last suffix separator.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitName<'a> {
    /// Everything before the last dot. The full name when there is no suffix.
    pub stem: &'a str,
    /// Text after the last dot, without the dot. May be empty for `name.`.
    pub suffix: Option<&'a str>,
}

/// Split a filename into stem and last suffix.
///
/// - `"index.mako"` → stem=`"index"`, suffix=Some(`"mako"`)
/// - `"archive.tar.mako"` → stem=`"archive.tar"`, suffix=Some(`"mako"`)
/// - `"README"` → stem=`"README"`, suffix=None
/// - `".mako"` → stem=`".mako"`, suffix=None
/// - `"notes."` → stem=`"notes"`, suffix=Some(`""`)
pub fn split_suffix(name: &str) -> SplitName<'_> {
    match name.rsplit_once('.') {
        Some((stem, suffix)) if !stem.is_empty() => SplitName {
            stem,
            suffix: Some(suffix),
        },
        _ => SplitName {
            stem: name,
            suffix: None,
        },
    }
}

/// Dot-prefixed entries are version-control metadata and editor droppings.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Underscore-prefixed entries hold templates, partials and build output.
pub fn is_private(name: &str) -> bool {
    name.starts_with('_')
}
