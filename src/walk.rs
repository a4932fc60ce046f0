// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! File selection shared by the directory-walking tools

use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::Result;

/// Include/exclude globs plus an optional extension allow-list
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    extensions: Vec<String>,
}

impl FileFilter {
    /// Compile include/exclude globs. Extensions are matched case-insensitively
    /// and may be given with or without the leading dot.
    pub fn new(include: &[String], exclude: &[String], extensions: &[String]) -> Result<Self> {
        let include = include.iter().map(|g| Pattern::new(g)).collect::<std::result::Result<_, _>>()?;
        let exclude = exclude.iter().map(|g| Pattern::new(g)).collect::<std::result::Result<_, _>>()?;
        let extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();

        Ok(Self { include, exclude, extensions })
    }

    /// Whether `path` (found under `base`) passes the filter.
    ///
    /// Globs are tried against both the bare file name and the path relative to `base`.
    pub fn matches(&self, path: &Path, base: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let rel = path
            .strip_prefix(base)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();

        if !self.extensions.is_empty() {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            if !self.extensions.contains(&ext) {
                return false;
            }
        }

        if !self.include.is_empty()
            && !self.include.iter().any(|g| g.matches(name) || g.matches(&rel))
        {
            return false;
        }

        !self.exclude.iter().any(|g| g.matches(name) || g.matches(&rel))
    }
}

/// How to walk a root
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    pub recursive: bool,
    pub follow_symlinks: bool,
}

/// List regular files under `root`.
///
/// A file root yields itself. Unreadable entries are logged and skipped.
pub fn list_files(root: &Path, options: WalkOptions) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let max_depth = if options.recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(options.follow_symlinks)
    {
        match entry {
            Ok(entry) => {
                let is_file = entry.file_type().is_file()
                    || (options.follow_symlinks && entry.path().is_file());
                if is_file {
                    files.push(entry.into_path());
                }
            }
            Err(e) => warn!("Skipping unreadable entry: {}", e),
        }
    }

    debug!("Listed {} file(s) under {:?}", files.len(), root);
    files
}

/// List files under `root` that pass `filter`, sorted by path
pub fn select_files(root: &Path, options: WalkOptions, filter: &FileFilter) -> Vec<PathBuf> {
    let base = if root.is_file() {
        root.parent().unwrap_or(root)
    } else {
        root
    };

    let mut files: Vec<PathBuf> = list_files(root, options)
        .into_iter()
        .filter(|p| filter.matches(p, base))
        .collect();
    files.sort();
    files
}

/// Pick a free path next to `target` by appending `-1`, `-2`, ... to its stem
pub fn numbered_free_path(target: &Path) -> PathBuf {
    numbered_path_where(target, |p| !p.exists())
}

/// Like [`numbered_free_path`], with the caller deciding which paths are free
pub fn numbered_path_where(target: &Path, is_free: impl Fn(&Path) -> bool) -> PathBuf {
    if is_free(target) {
        return target.to_path_buf();
    }

    let stem = target.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let ext = target
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = target.with_file_name(format!("{}-{}{}", stem, counter, ext));
        if is_free(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
