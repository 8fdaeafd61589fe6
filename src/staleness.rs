//! Change detection for the development server.
//!
//! The staleness timestamp is the latest modification time across a fixed,
//! shallow set of paths:
//!
//! - the immediate entries of the source root, minus the build directory and
//!   dot-prefixed names;
//! - the immediate entries of every configured watch directory, minus
//!   dot-prefixed names.
//!
//! The scan is not recursive. An edit two levels below the root changes
//! neither the edited file's parent listing nor any stat'd entry, so it goes
//! unnoticed unless its directory is listed in `watch_dirs`. Adding or
//! removing a file in a top-level directory does bump that directory's own
//! mtime and is detected.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::trace;

use crate::config::SiteConfig;
use crate::naming;

#[derive(Error, Debug)]
pub enum StalenessError {
    #[error("Failed to list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Latest modification time across the watched paths.
///
/// Returns `UNIX_EPOCH` when nothing is watched. A path that disappears
/// between listing and stat fails the whole check.
pub fn compute_latest_change(
    source_root: &Path,
    config: &SiteConfig,
) -> Result<SystemTime, StalenessError> {
    let paths = watched_paths(source_root, config)?;
    let mut latest = SystemTime::UNIX_EPOCH;
    for path in &paths {
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|source| StalenessError::Stat {
                path: path.clone(),
                source,
            })?;
        latest = latest.max(modified);
    }
    trace!(paths = paths.len(), ?latest, "computed latest change");
    Ok(latest)
}

/// The paths whose modification times make up the staleness timestamp.
pub fn watched_paths(
    source_root: &Path,
    config: &SiteConfig,
) -> Result<Vec<PathBuf>, StalenessError> {
    let build_dir = config.build_dir.as_str();
    let mut paths = list_entries(source_root, |name| {
        name != build_dir && !naming::is_hidden(name)
    })?;
    for dir in &config.watch_dirs {
        paths.extend(list_entries(&source_root.join(dir), |name| {
            !naming::is_hidden(name)
        })?);
    }
    Ok(paths)
}

fn list_entries(
    dir: &Path,
    keep: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, StalenessError> {
    let read_dir_error = |source| StalenessError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        if keep(&entry.file_name().to_string_lossy()) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}
