// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Find duplicate files by content hash.
//!
//! Features:
//! - Size-based pre-filtering, then SHA-256 of the candidates
//! - Keep the first, last, newest or oldest copy, or choose interactively
//! - Delete, move or hardlink duplicates
//! - JSON report and dry-run mode

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{error, info, warn};

use super::hasher::{hash_file, HashAlgorithm};
use crate::walk::{list_files, numbered_free_path, WalkOptions};
use crate::{Result, UtilkitError};

/// Files sharing one digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub hash: String,
    pub size: u64,
    pub files: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Bytes reclaimable by keeping one copy
    pub fn wasted(&self) -> u64 {
        self.size * (self.files.len() as u64).saturating_sub(1)
    }
}

/// Which copy survives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum KeepStrategy {
    #[default]
    First,
    Last,
    Newest,
    Oldest,
}

/// What happens to the copies that do not survive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DuplicateAction {
    #[default]
    Report,
    Delete,
    Move,
    Hardlink,
}

impl DuplicateAction {
    fn verb(&self) -> &'static str {
        match self {
            DuplicateAction::Report => "report",
            DuplicateAction::Delete => "delete",
            DuplicateAction::Move => "move",
            DuplicateAction::Hardlink => "hardlink",
        }
    }
}

/// The kept file of a group and the copies to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub keep: PathBuf,
    pub remove: Vec<PathBuf>,
}

/// Serializable summary of a scan
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    pub groups: usize,
    pub total_files: usize,
    pub wasted_space: u64,
    pub duplicates: Vec<ReportGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportGroup {
    pub hash: String,
    pub size: u64,
    pub count: usize,
    pub files: Vec<String>,
}

/// Group files under `root` with identical content.
///
/// Only files sharing a size with another file are hashed. Groups come back
/// ordered by their first path, files within a group by path.
pub fn find_duplicates(root: &Path, recursive: bool, min_size: u64) -> Result<Vec<DuplicateGroup>> {
    if !root.is_dir() {
        return Err(UtilkitError::invalid(format!("Not a directory: {}", root.display())));
    }

    let mut by_size: HashMap<u64, Vec<PathBuf>> = HashMap::new();
    let walk = WalkOptions { recursive, follow_symlinks: false };
    for path in list_files(root, walk) {
        match fs::metadata(&path) {
            Ok(meta) if meta.len() >= min_size => by_size.entry(meta.len()).or_default().push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping {:?}: {}", path, e),
        }
    }

    let mut by_hash: BTreeMap<String, DuplicateGroup> = BTreeMap::new();
    for (size, paths) in by_size.into_iter().filter(|(_, p)| p.len() > 1) {
        info!("Hashing {} files of size {}", paths.len(), size);
        for path in paths {
            match hash_file(&path, HashAlgorithm::Sha256) {
                Ok(digest) => by_hash
                    .entry(digest.clone())
                    .or_insert_with(|| DuplicateGroup { hash: digest, size, files: Vec::new() })
                    .files
                    .push(path),
                Err(e) => warn!("Cannot hash {:?}: {}", path, e),
            }
        }
    }

    let mut groups: Vec<DuplicateGroup> = by_hash
        .into_values()
        .filter(|g| g.files.len() > 1)
        .map(|mut g| {
            g.files.sort();
            g
        })
        .collect();
    groups.sort_by(|a, b| a.files[0].cmp(&b.files[0]));
    Ok(groups)
}

/// Build the JSON report for a set of groups
pub fn build_report(groups: &[DuplicateGroup]) -> DuplicateReport {
    DuplicateReport {
        groups: groups.len(),
        total_files: groups.iter().map(|g| g.files.len()).sum(),
        wasted_space: groups.iter().map(DuplicateGroup::wasted).sum(),
        duplicates: groups
            .iter()
            .map(|g| ReportGroup {
                hash: g.hash.clone(),
                size: g.size,
                count: g.files.len(),
                files: g.files.iter().map(|p| p.display().to_string()).collect(),
            })
            .collect(),
    }
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn split_keep(group: &DuplicateGroup, keep_idx: usize) -> Selection {
    Selection {
        keep: group.files[keep_idx].clone(),
        remove: group
            .files
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != keep_idx)
            .map(|(_, p)| p.clone())
            .collect(),
    }
}

/// Pick the surviving copy of one group
pub fn select_by_strategy(group: &DuplicateGroup, keep: KeepStrategy) -> Selection {
    let last = group.files.len().saturating_sub(1);
    let keep_idx = match keep {
        KeepStrategy::First => 0,
        KeepStrategy::Last => last,
        KeepStrategy::Newest => (0..group.files.len())
            .max_by_key(|&i| modified(&group.files[i]))
            .unwrap_or(0),
        KeepStrategy::Oldest => (0..group.files.len())
            .min_by_key(|&i| modified(&group.files[i]))
            .unwrap_or(0),
    };
    split_keep(group, keep_idx)
}

/// Ask on `input` which copy of each group to keep.
///
/// `s` or `a` keeps every copy of that group. Invalid answers are asked again.
pub fn interactive_select<R: BufRead, W: Write>(
    groups: &[DuplicateGroup],
    mut input: R,
    mut output: W,
) -> Result<Vec<Selection>> {
    let mut selections = Vec::new();

    for group in groups {
        let short: String = group.hash.chars().take(8).collect();
        writeln!(output, "\n=== Duplicate group ({} files, hash: {}...) ===", group.files.len(), short)?;
        for (i, file) in group.files.iter().enumerate() {
            writeln!(output, "  [{}] {} ({} bytes)", i + 1, file.display(), group.size)?;
        }

        loop {
            write!(
                output,
                "Keep which file? (1-{}, 'a' for all, 's' to skip): ",
                group.files.len()
            )?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(selections);
            }
            let choice = line.trim().to_lowercase();
            if choice == "s" || choice == "a" {
                break;
            }
            match choice.parse::<usize>() {
                Ok(n) if (1..=group.files.len()).contains(&n) => {
                    selections.push(split_keep(group, n - 1));
                    break;
                }
                _ => writeln!(output, "Invalid choice")?,
            }
        }
    }

    Ok(selections)
}

/// Counts from acting on duplicates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSummary {
    pub done: usize,
    pub failed: usize,
}

fn act_on(action: DuplicateAction, path: &Path, keep: &Path, move_to: Option<&Path>) -> Result<()> {
    match action {
        DuplicateAction::Report => {}
        DuplicateAction::Delete => {
            fs::remove_file(path)?;
            info!("Deleted: {:?}", path);
        }
        DuplicateAction::Move => {
            let dir = move_to.ok_or_else(|| UtilkitError::invalid("--move-to required for move action"))?;
            fs::create_dir_all(dir)?;
            let name = path
                .file_name()
                .ok_or_else(|| UtilkitError::invalid(format!("No file name: {}", path.display())))?;
            let dest = numbered_free_path(&dir.join(name));
            if fs::rename(path, &dest).is_err() {
                fs::copy(path, &dest)?;
                fs::remove_file(path)?;
            }
            info!("Moved: {:?} -> {:?}", path, dest);
        }
        DuplicateAction::Hardlink => {
            replace_with_hard_link(keep, path)?;
            info!("Hardlinked: {:?} -> {:?}", path, keep);
        }
    }
    Ok(())
}

/// Link `keep` beside `path` under a temporary name, then rename it over
/// `path`. The duplicate stays in place if either step fails.
fn replace_with_hard_link(keep: &Path, path: &Path) -> Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| UtilkitError::invalid(format!("No file name: {}", path.display())))?;
    let temp = path.with_file_name(format!(
        ".{}.{}.link",
        name.to_string_lossy(),
        uuid::Uuid::new_v4().simple()
    ));

    fs::hard_link(keep, &temp)?;
    if let Err(e) = fs::rename(&temp, path) {
        if let Err(cleanup) = fs::remove_file(&temp) {
            warn!("Could not remove temporary link {:?}: {}", temp, cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}

/// Apply `action` to every selected duplicate
pub fn apply_action(
    selections: &[Selection],
    action: DuplicateAction,
    move_to: Option<&Path>,
    dry_run: bool,
) -> Result<ActionSummary> {
    if action == DuplicateAction::Move && move_to.is_none() {
        return Err(UtilkitError::invalid("--move-to required for move action"));
    }

    let mut summary = ActionSummary::default();
    for selection in selections {
        for path in &selection.remove {
            if dry_run {
                info!("Would {}: {:?}", action.verb(), path);
                continue;
            }
            match act_on(action, path, &selection.keep, move_to) {
                Ok(()) => summary.done += 1,
                Err(e) => {
                    error!("Failed to {} {:?}: {}", action.verb(), path, e);
                    summary.failed += 1;
                }
            }
        }
    }
    Ok(summary)
}
