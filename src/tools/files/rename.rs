// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Batch rename files in a directory.
//!
//! Features:
//! - Prefix/suffix, find/replace and regex substitutions
//! - Case transforms (lower/upper/title)
//! - Enumeration with padding and sorting by name or mtime
//! - Templates with tokens: {n}, {stem}, {ext}, {parent}, {date}
//! - Include/exclude globs, extension filters, recursive mode
//! - Dry-run preview and collision handling (skip, overwrite, number, error)
//! - Every rename is recorded in the history log for undo

use chrono::{DateTime, Local};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{error, info, warn};

use crate::history::{History, HistoryEntry};
use crate::walk::{numbered_path_where, select_files, FileFilter, WalkOptions};
use crate::{Result, UtilkitError};

const WINDOWS_INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Case transform applied to the stem
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CaseMode {
    Lower,
    Upper,
    Title,
}

/// Ordering used before enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortKey {
    #[default]
    Name,
    Mtime,
}

/// What to do when the target name already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CollisionStrategy {
    Skip,
    Overwrite,
    #[default]
    Number,
    Error,
}

/// Everything that shapes a rename run
#[derive(Debug, Clone)]
pub struct RenameOptions {
    pub recursive: bool,
    pub filter: FileFilter,
    pub prefix: String,
    pub suffix: String,
    pub find: Option<String>,
    pub replace_with: String,
    pub regex: Option<String>,
    pub regex_repl: String,
    pub case: Option<CaseMode>,
    pub new_ext: Option<String>,
    pub template: Option<String>,
    pub enumerate: bool,
    pub start: i64,
    pub pad: usize,
    pub sort: SortKey,
    pub on_collision: CollisionStrategy,
    pub sanitize: bool,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            filter: FileFilter::default(),
            prefix: String::new(),
            suffix: String::new(),
            find: None,
            replace_with: String::new(),
            regex: None,
            regex_repl: String::new(),
            case: None,
            new_ext: None,
            template: None,
            enumerate: false,
            start: 1,
            pad: 2,
            sort: SortKey::Name,
            on_collision: CollisionStrategy::Number,
            sanitize: true,
        }
    }
}

/// One planned rename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl RenamePlan {
    fn old_name(&self) -> String {
        file_name(&self.source)
    }

    fn new_name(&self) -> String {
        file_name(&self.target)
    }
}

/// Counts from executing a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameSummary {
    pub changed: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn split_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

/// Accept `\1`-style backreferences alongside the regex crate's `$1`
fn convert_backrefs(repl: &str) -> String {
    let mut out = String::with_capacity(repl.len());
    let mut chars = repl.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
            out.push_str("${");
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                out.push(d);
                chars.next();
            }
            out.push('}');
        } else {
            out.push(c);
        }
    }
    out
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Replace characters Windows forbids in file names. A no-op elsewhere.
pub fn sanitize_filename(name: &str) -> String {
    if cfg!(windows) {
        name.chars()
            .map(|c| if WINDOWS_INVALID_CHARS.contains(&c) { '_' } else { c })
            .collect()
    } else {
        name.to_string()
    }
}

/// Compiled stem transforms
struct StemTransform<'a> {
    options: &'a RenameOptions,
    regex: Option<Regex>,
    regex_repl: String,
}

impl<'a> StemTransform<'a> {
    fn new(options: &'a RenameOptions) -> Result<Self> {
        let regex = options
            .regex
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        Ok(Self {
            options,
            regex,
            regex_repl: convert_backrefs(&options.regex_repl),
        })
    }

    fn apply(&self, stem: &str) -> String {
        let mut out = stem.to_string();
        if let Some(find) = self.options.find.as_deref() {
            if !find.is_empty() {
                out = out.replace(find, &self.options.replace_with);
            }
        }
        if let Some(re) = &self.regex {
            out = re.replace_all(&out, self.regex_repl.as_str()).into_owned();
        }
        out = match self.options.case {
            Some(CaseMode::Lower) => out.to_lowercase(),
            Some(CaseMode::Upper) => out.to_uppercase(),
            Some(CaseMode::Title) => title_case(&out),
            None => out,
        };
        format!("{}{}{}", self.options.prefix, out, self.options.suffix)
    }
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn compose_name(
    path: &Path,
    stem: &str,
    ext: &str,
    template: Option<&str>,
    seq: Option<i64>,
    pad: usize,
) -> String {
    let n_token = seq
        .map(|n| format!("{:0width$}", n, width = pad))
        .unwrap_or_default();

    match template {
        Some(template) => {
            let parent = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let date: DateTime<Local> = modified(path).into();
            template
                .replace("{n}", &n_token)
                .replace("{stem}", stem)
                .replace("{ext}", ext)
                .replace("{parent}", &parent)
                .replace("{date}", &date.format("%Y-%m-%d").to_string())
        }
        None if seq.is_some() => format!("{}_{}{}", n_token, stem, ext),
        None => format!("{}{}", stem, ext),
    }
}

/// Work out every rename without touching the filesystem.
///
/// Returns the plans plus warnings for files left alone because of a collision.
pub fn plan_renames(dir: &Path, options: &RenameOptions) -> Result<(Vec<RenamePlan>, Vec<String>)> {
    if !dir.is_dir() {
        return Err(UtilkitError::invalid(format!(
            "Path is not a directory: {}",
            dir.display()
        )));
    }
    let base = dir.canonicalize()?;
    let transform = StemTransform::new(options)?;

    let walk = WalkOptions { recursive: options.recursive, follow_symlinks: false };
    let mut files = select_files(&base, walk, &options.filter);
    match options.sort {
        SortKey::Name => files.sort_by_key(|p| file_name(p)),
        SortKey::Mtime => files.sort_by_key(|p| (modified(p), file_name(p))),
    }

    let numbering = options.enumerate
        || options.template.as_deref().is_some_and(|t| t.contains("{n}"));
    let mut seq = numbering.then_some(options.start);

    let new_ext = options.new_ext.as_deref().map(|e| {
        if e.is_empty() || e.starts_with('.') {
            e.to_string()
        } else {
            format!(".{}", e)
        }
    });

    let mut plans = Vec::new();
    let mut warnings = Vec::new();
    // targets earlier plans in this batch will occupy
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    for path in files {
        let current = seq;
        if let Some(n) = seq.as_mut() {
            *n += 1;
        }

        let (stem, orig_ext) = split_name(&path);
        let ext = new_ext.clone().unwrap_or(orig_ext);
        let mut new_name = compose_name(
            &path,
            &transform.apply(&stem),
            &ext,
            options.template.as_deref(),
            current,
            options.pad,
        );
        if options.sanitize {
            new_name = sanitize_filename(&new_name);
        }

        let old_name = file_name(&path);
        if new_name == old_name || new_name.is_empty() {
            continue;
        }

        let mut target = path.with_file_name(&new_name);
        if target.exists() || claimed.contains(&target) {
            match options.on_collision {
                CollisionStrategy::Skip => {
                    warnings.push(format!("Skipping (exists): {} -> {}", old_name, new_name));
                    continue;
                }
                CollisionStrategy::Error => {
                    warnings.push(format!("Collision error (exists): {} -> {}", old_name, new_name));
                    continue;
                }
                CollisionStrategy::Overwrite => {}
                CollisionStrategy::Number => {
                    target = numbered_path_where(&target, |p| !p.exists() && !claimed.contains(p))
                }
            }
        }

        claimed.insert(target.clone());
        plans.push(RenamePlan { source: path, target });
    }

    Ok((plans, warnings))
}

/// Carry out planned renames, recording each in `history` when given.
///
/// In a dry run every plan is only logged and counted as skipped.
pub fn execute_renames(
    plans: &[RenamePlan],
    dry_run: bool,
    on_collision: CollisionStrategy,
    history: Option<&History>,
) -> RenameSummary {
    let mut summary = RenameSummary::default();

    for plan in plans {
        if dry_run {
            info!("DRY-RUN: {} -> {}", plan.old_name(), plan.new_name());
            summary.skipped += 1;
            continue;
        }

        let result = (|| -> Result<()> {
            if plan.target.is_file() && on_collision == CollisionStrategy::Overwrite {
                fs::remove_file(&plan.target)?;
            }
            fs::rename(&plan.source, &plan.target)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                info!("RENAMED: {} -> {}", plan.old_name(), plan.new_name());
                summary.changed += 1;
                if let Some(history) = history {
                    let entry =
                        HistoryEntry::new(plan.source.clone(), plan.target.clone(), "rename");
                    if let Err(e) = history.append(&entry) {
                        warn!("Failed to record history: {}", e);
                    }
                }
            }
            Err(e) => {
                error!("ERROR: {} -> {}: {}", plan.old_name(), plan.new_name(), e);
                summary.failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        path
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn run(dir: &Path, options: &RenameOptions, dry_run: bool) -> RenameSummary {
        let (plans, _) = plan_renames(dir, options).unwrap();
        execute_renames(&plans, dry_run, options.on_collision, None)
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hello world-foo"), "Hello World-Foo");
        assert_eq!(title_case("MIXED case"), "Mixed Case");
        assert_eq!(title_case("abc1def"), "Abc1Def");
    }

    #[test]
    fn test_convert_backrefs() {
        assert_eq!(convert_backrefs(r"\1-\2"), "${1}-${2}");
        assert_eq!(convert_backrefs("$1"), "$1");
        assert_eq!(convert_backrefs(r"a\b"), r"a\b");
    }

    #[test]
    fn test_prefix_suffix_and_find_replace() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "my file.txt");

        let options = RenameOptions {
            find: Some(" ".to_string()),
            replace_with: "_".to_string(),
            prefix: "pre_".to_string(),
            suffix: "_post".to_string(),
            ..RenameOptions::default()
        };
        let summary = run(dir.path(), &options, false);
        assert_eq!(summary.changed, 1);
        assert_eq!(names(dir.path()), vec!["pre_my_file_post.txt"]);
    }

    #[test]
    fn test_regex_with_backref() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "report2023.pdf");

        let options = RenameOptions {
            regex: Some(r"(.*?)(\d+)$".to_string()),
            regex_repl: r"\2_\1".to_string(),
            ..RenameOptions::default()
        };
        run(dir.path(), &options, false);
        assert_eq!(names(dir.path()), vec!["2023_report.pdf"]);
    }

    #[test]
    fn test_invalid_regex_is_planning_error() {
        let dir = TempDir::new().unwrap();
        let options = RenameOptions { regex: Some("(".to_string()), ..RenameOptions::default() };
        assert!(matches!(plan_renames(dir.path(), &options), Err(UtilkitError::Regex(_))));
    }

    #[test]
    fn test_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "a.txt");
        assert!(plan_renames(&file, &RenameOptions::default()).is_err());
    }

    #[test]
    fn test_enumerate_with_template_and_new_ext() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.WAV");
        touch(dir.path(), "a.WAV");

        let options = RenameOptions {
            template: Some("track_{n}{ext}".to_string()),
            new_ext: Some("wav".to_string()),
            pad: 3,
            ..RenameOptions::default()
        };
        run(dir.path(), &options, false);
        assert_eq!(names(dir.path()), vec!["track_001.wav", "track_002.wav"]);
    }

    #[test]
    fn test_default_enumeration_composition() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "x.jpg");
        let options = RenameOptions { enumerate: true, start: 7, ..RenameOptions::default() };
        run(dir.path(), &options, false);
        assert_eq!(names(dir.path()), vec!["07_x.jpg"]);
    }

    #[test]
    fn test_counter_advances_over_unchanged_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "01_a.txt");
        touch(dir.path(), "b.txt");

        let options = RenameOptions {
            template: Some("{n}_a{ext}".to_string()),
            ..RenameOptions::default()
        };
        let (plans, _) = plan_renames(dir.path(), &options).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].new_name(), "02_a.txt");
    }

    #[test]
    fn test_dry_run_leaves_tree_untouched() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Alpha.TXT");
        touch(dir.path(), "Beta.TXT");
        let before = names(dir.path());

        let options = RenameOptions { case: Some(CaseMode::Lower), ..RenameOptions::default() };
        let summary = run(dir.path(), &options, true);
        assert_eq!(summary, RenameSummary { changed: 0, skipped: 2, failed: 0 });
        assert_eq!(names(dir.path()), before);
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Alpha.txt");
        touch(dir.path(), "BETA.txt");

        let options = RenameOptions { case: Some(CaseMode::Lower), ..RenameOptions::default() };
        assert_eq!(run(dir.path(), &options, false).changed, 2);
        let after_first = names(dir.path());

        let (plans, _) = plan_renames(dir.path(), &options).unwrap();
        assert!(plans.is_empty());
        assert_eq!(names(dir.path()), after_first);
    }

    #[test]
    fn test_collision_strategies() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.txt");
        touch(dir.path(), "x_a.txt");
        let only_a = FileFilter::new(&["a.txt".to_string()], &[], &[]).unwrap();

        let mut options = RenameOptions {
            prefix: "x_".to_string(),
            filter: only_a,
            on_collision: CollisionStrategy::Skip,
            ..RenameOptions::default()
        };
        let (plans, warnings) = plan_renames(dir.path(), &options).unwrap();
        assert!(plans.is_empty());
        assert_eq!(warnings.len(), 1);

        options.on_collision = CollisionStrategy::Error;
        let (plans, warnings) = plan_renames(dir.path(), &options).unwrap();
        assert!(plans.is_empty());
        assert!(warnings[0].starts_with("Collision error"));

        options.on_collision = CollisionStrategy::Number;
        let (plans, _) = plan_renames(dir.path(), &options).unwrap();
        assert_eq!(plans[0].new_name(), "x_a-1.txt");

        options.on_collision = CollisionStrategy::Overwrite;
        let (plans, _) = plan_renames(dir.path(), &options).unwrap();
        let summary = execute_renames(&plans, false, options.on_collision, None);
        assert_eq!(summary.changed, 1);
        assert_eq!(names(dir.path()), vec!["x_a.txt"]);
        assert_eq!(fs::read_to_string(dir.path().join("x_a.txt")).unwrap(), "a.txt");
    }

    #[test]
    fn test_batch_targets_collide_with_each_other() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "x1.txt");
        touch(dir.path(), "x2.txt");

        let mut options = RenameOptions {
            regex: Some(r"\d".to_string()),
            ..RenameOptions::default()
        };
        let (plans, _) = plan_renames(dir.path(), &options).unwrap();
        let targets: Vec<String> = plans.iter().map(|p| p.new_name()).collect();
        assert_eq!(targets, vec!["x.txt", "x-1.txt"]);

        let summary = execute_renames(&plans, false, options.on_collision, None);
        assert_eq!(summary, RenameSummary { changed: 2, skipped: 0, failed: 0 });
        assert_eq!(names(dir.path()), vec!["x-1.txt", "x.txt"]);
        assert_eq!(fs::read_to_string(dir.path().join("x.txt")).unwrap(), "x1.txt");
        assert_eq!(fs::read_to_string(dir.path().join("x-1.txt")).unwrap(), "x2.txt");

        // nothing on disk yet, but the second file still sees the first one's target
        let fresh = TempDir::new().unwrap();
        touch(fresh.path(), "y1.txt");
        touch(fresh.path(), "y2.txt");
        options.on_collision = CollisionStrategy::Skip;
        let (plans, warnings) = plan_renames(fresh.path(), &options).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].new_name(), "y.txt");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_renames_are_recorded_for_undo() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        fs::create_dir(&work).unwrap();
        touch(&work, "one.txt");
        let history = History::new(dir.path().join("history.jsonl"));

        let options = RenameOptions { suffix: "_v2".to_string(), ..RenameOptions::default() };
        let (plans, _) = plan_renames(&work, &options).unwrap();
        execute_renames(&plans, false, options.on_collision, Some(&history));

        let entries = history.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tool, "rename");

        history.undo(1, false).unwrap();
        assert_eq!(names(&work), vec!["one.txt"]);
    }
}
