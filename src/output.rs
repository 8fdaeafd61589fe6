//! CLI output formatting for builds, checks and the dev server.
//!
//! Each report has a `format_*` function returning lines (pure, tested) and a
//! `print_*` wrapper that writes them to stdout.
//!
//! ## Build
//!
//! ```text
//! 001 about.html.md → about.html [markdown]
//! 002 css/style.css [copy]
//! 003 index.html.tmpl → index.html [template]
//!
//! Built 3 files (2 transformed) → site/_build
//! ```
//!
//! Sources that keep their name show the path once.

use std::net::SocketAddr;
use std::path::Path;

use crate::site::{BuildReport, Site};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_output(report: &BuildReport, build_dir: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, file) in report.files.iter().enumerate() {
        let line = if file.source == file.output {
            format!(
                "{} {} [{}]",
                format_index(i + 1),
                file.source.display(),
                file.transformer
            )
        } else {
            format!(
                "{} {} → {} [{}]",
                format_index(i + 1),
                file.source.display(),
                file.output.display(),
                file.transformer
            )
        };
        lines.push(line);
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Built {} ({} transformed) → {}",
        plural(report.files.len(), "file"),
        report.transformed_count(),
        build_dir.display()
    ));
    lines
}

pub fn print_build_output(report: &BuildReport, build_dir: &Path) {
    for line in format_build_output(report, build_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Summarize the resolved configuration of a site.
pub fn format_check_output(site: &Site) -> Vec<String> {
    let config = site.config();
    let mut lines = vec!["Config".to_string()];
    lines.push(format!("    build_dir: {}", config.build_dir));
    if config.watch_dirs.is_empty() {
        lines.push("    watch_dirs: (none)".to_string());
    } else {
        lines.push(format!("    watch_dirs: {}", config.watch_dirs.join(", ")));
    }
    if !config.context.is_empty() {
        let keys: Vec<&str> = config.context.keys().map(String::as_str).collect();
        lines.push(format!("    context: {}", keys.join(", ")));
    }

    lines.push(String::new());
    lines.push("Interpreters".to_string());
    let registry = site.registry();
    for suffix in registry.suffixes() {
        let probe = format!("x.{suffix}");
        lines.push(format!(
            "    .{} → {}",
            suffix,
            registry.resolve_transformer(&probe).name()
        ));
    }
    lines.push(format!("    (other) → {}", registry.fallback().name()));
    lines
}

pub fn print_check_output(site: &Site) {
    for line in format_check_output(site) {
        println!("{}", line);
    }
}

// ============================================================================
// Dev server
// ============================================================================

pub fn format_serving(addr: SocketAddr, build_dir: &Path, rebuild: bool) -> String {
    let mode = if rebuild {
        "rebuilding on change"
    } else {
        "no rebuild"
    };
    format!(
        "==> Serving {} at http://{} ({})",
        build_dir.display(),
        addr,
        mode
    )
}

pub fn print_serving(addr: SocketAddr, build_dir: &Path, rebuild: bool) {
    println!("{}", format_serving(addr, build_dir, rebuild));
}

pub fn print_rebuild_started() {
    println!("==> Rebuilding site...");
}
