// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rename history for undo support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::Result;

/// A single rename recorded in history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    /// Tool that performed the rename
    pub tool: String,
    #[serde(default)]
    pub undone: bool,
}

impl HistoryEntry {
    pub fn new(original_path: PathBuf, new_path: PathBuf, tool: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            original_path,
            new_path,
            tool: tool.to_string(),
            undone: false,
        }
    }
}

/// Outcome of a single undo attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Undone,
    WouldUndo,
    /// The renamed file is gone
    MissingTarget,
    /// Something already occupies the original path
    OriginalOccupied,
    /// The rename back failed
    Failed(String),
}

/// Append-only JSON Lines log of renames
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the history
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all history entries, oldest first
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Failed to parse history entry: {}", e),
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Entries that have not been undone, newest first
    pub fn get_undoable(&self) -> Result<Vec<HistoryEntry>> {
        let mut entries: Vec<_> = self.read_all()?.into_iter().filter(|e| !e.undone).collect();
        entries.reverse();
        Ok(entries)
    }

    /// Mark the given entries as undone
    pub fn mark_undone(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let entries = self.read_all()?;
        let mut writer = BufWriter::new(File::create(&self.path)?);

        for mut entry in entries {
            if ids.contains(&entry.id) {
                entry.undone = true;
            }
            writeln!(writer, "{}", serde_json::to_string(&entry)?)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Reverse the most recent `count` renames.
    ///
    /// A failed rename is reported as [`UndoOutcome::Failed`] and the rest
    /// still run. Entries restored on disk are always marked undone.
    pub fn undo(&self, count: usize, dry_run: bool) -> Result<Vec<(HistoryEntry, UndoOutcome)>> {
        let mut results = Vec::new();
        let mut undone_ids = Vec::new();

        for entry in self.get_undoable()?.into_iter().take(count) {
            let outcome = if !entry.new_path.exists() {
                warn!("File not found (may have been moved/deleted): {:?}", entry.new_path);
                UndoOutcome::MissingTarget
            } else if entry.original_path.exists() {
                warn!("Original path already exists: {:?}", entry.original_path);
                UndoOutcome::OriginalOccupied
            } else if dry_run {
                UndoOutcome::WouldUndo
            } else {
                match fs::rename(&entry.new_path, &entry.original_path) {
                    Ok(()) => {
                        info!("Undone: {:?} -> {:?}", entry.new_path, entry.original_path);
                        undone_ids.push(entry.id.clone());
                        UndoOutcome::Undone
                    }
                    Err(e) => {
                        error!("Failed to undo {:?}: {}", entry.new_path, e);
                        UndoOutcome::Failed(e.to_string())
                    }
                }
            };
            results.push((entry, outcome));
        }

        self.mark_undone(&undone_ids)?;
        Ok(results)
    }

    /// Clear all history
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Get history file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
