//! Discovery of project files under a scan root.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;

/// Directories never descended into: build output and restored packages.
const SKIPPED_DIRS: &[&str] = &["bin", "obj", "packages", ".git", ".vs"];

/// Find project files under `root` that match the config's extensions and
/// include/exclude filters. Returned paths are `root`-joined and sorted, so
/// repeated runs process projects in the same order.
pub fn scan(root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut projects: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !is_skipped_dir(e))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter(|e| return has_project_extension(e.path(), config.extensions()))
        .filter(|e| {
            let relative = e.path().strip_prefix(root).unwrap_or(e.path());
            return config.should_scan(&relative.to_string_lossy().replace('\\', "/"));
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    projects.sort();
    return projects;
}

/// Whether the path ends in one of the configured extensions (ASCII case-insensitive).
fn has_project_extension(path: &Path, extensions: &[String]) -> bool {
    return path
        .extension()
        .map(|ext| return ext.to_string_lossy())
        .is_some_and(|ext| return extensions.iter().any(|wanted| return wanted.eq_ignore_ascii_case(&ext)));
}

/// Whether a directory entry is one the scan never enters.
fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    return entry.file_type().is_dir()
        && SKIPPED_DIRS
            .iter()
            .any(|skipped| return entry.file_name().to_string_lossy().eq_ignore_ascii_case(skipped));
}
