//! Shared test utilities for the sitewright test suite.
//!
//! Provides a throwaway source tree builder and mtime controls so staleness
//! tests can pin modification times instead of sleeping.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = site_fixture(&[("index.html.tmpl", "{{ source_path }}")]);
//! age_tree(tmp.path(), at(1_000));
//! set_mtime(&tmp.path().join("index.html.tmpl"), at(2_000));
//! ```

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::site::{BuildReport, Site};

// =========================================================================
// Fixture setup
// =========================================================================

/// Create a temp source root holding `files` (relative path, contents).
/// Parent directories are created as needed.
pub fn site_fixture(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (rel, content) in files {
        write_file(tmp.path(), rel, content);
    }
    tmp
}

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
}

// =========================================================================
// Modification times
// =========================================================================

/// A point in time `secs` after a fixed base in 2020. Whole seconds survive
/// any filesystem timestamp resolution.
pub fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000 + secs)
}

/// Set the modification time of a file or directory.
pub fn set_mtime(path: &Path, time: SystemTime) {
    File::open(path)
        .and_then(|f| f.set_modified(time))
        .unwrap_or_else(|e| panic!("set_mtime {}: {e}", path.display()));
}

/// Set every entry under `root` (root included) to the same modification time.
pub fn age_tree(root: &Path, time: SystemTime) {
    for entry in WalkDir::new(root) {
        set_mtime(entry.unwrap().path(), time);
    }
}

// =========================================================================
// Build output
// =========================================================================

/// Read a file from the site's build directory. Panics if missing.
pub fn read_output(site: &Site, rel: &str) -> String {
    let path = site.build_dir().join(rel);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

/// Output paths of a build report, `/`-separated, in build order.
pub fn output_names(report: &BuildReport) -> Vec<String> {
    report
        .files
        .iter()
        .map(|f| f.output.to_string_lossy().replace('\\', "/"))
        .collect()
}
