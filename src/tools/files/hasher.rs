// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Compute and verify file checksum manifests.
//!
//! Features:
//! - Hash a file or a directory tree with sha256 (default), sha512, sha1, md5 or blake3
//! - Include/exclude globs, optional symlink following
//! - Text or JSON manifests, verify mode reporting missing and mismatched files
//! - Optional parallel hashing on a bounded worker pool

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info};

use crate::walk::{select_files, FileFilter, WalkOptions};
use crate::{Result, UtilkitError};

const CHUNK_SIZE: usize = 1024 * 1024;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Sha1,
    Md5,
    Blake3,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = UtilkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "md5" => Ok(HashAlgorithm::Md5),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(UtilkitError::invalid(format!("Unsupported hash algorithm: {}", other))),
        }
    }
}

/// One manifest line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    /// Stored path, relative to the base or absolute
    pub path: String,
    pub algo: HashAlgorithm,
    pub digest: String,
}

/// Options for manifest generation
#[derive(Debug, Clone)]
pub struct HashOptions {
    pub algorithm: HashAlgorithm,
    pub filter: FileFilter,
    pub walk: WalkOptions,
    pub relative_paths: bool,
    pub parallel: bool,
    pub workers: usize,
    pub show_progress: bool,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            filter: FileFilter::default(),
            walk: WalkOptions::default(),
            relative_paths: false,
            parallel: false,
            workers: 1,
            show_progress: false,
        }
    }
}

/// Verification counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifySummary {
    pub ok: usize,
    pub missing: usize,
    pub mismatched: usize,
}

impl VerifySummary {
    pub fn total(&self) -> usize {
        self.ok + self.missing + self.mismatched
    }

    pub fn is_clean(&self) -> bool {
        self.missing == 0 && self.mismatched == 0
    }
}

fn digest_reader<D: Digest>(reader: &mut impl Read) -> Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect())
}

fn blake3_reader(reader: &mut impl Read) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Hex digest of everything `reader` yields
pub fn hash_reader(reader: &mut impl Read, algo: HashAlgorithm) -> Result<String> {
    match algo {
        HashAlgorithm::Sha256 => digest_reader::<sha2::Sha256>(reader),
        HashAlgorithm::Sha512 => digest_reader::<sha2::Sha512>(reader),
        HashAlgorithm::Sha1 => digest_reader::<sha1::Sha1>(reader),
        HashAlgorithm::Md5 => digest_reader::<md5::Md5>(reader),
        HashAlgorithm::Blake3 => blake3_reader(reader),
    }
}

/// Hex digest of a file, read in 1 MiB chunks
pub fn hash_file(path: &Path, algo: HashAlgorithm) -> Result<String> {
    let mut file = File::open(path)?;
    hash_reader(&mut file, algo)
}

fn make_record(path: &Path, base: &Path, options: &HashOptions) -> Result<HashRecord> {
    let stored = if options.relative_paths {
        path.strip_prefix(base).unwrap_or(path).to_string_lossy().into_owned()
    } else {
        path.canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .into_owned()
    };
    let digest = hash_file(path, options.algorithm)?;
    Ok(HashRecord { path: stored, algo: options.algorithm, digest })
}

/// Base directory that relative manifest paths are stored against
pub fn manifest_base(root: &Path) -> PathBuf {
    let resolved = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    if resolved.is_file() {
        resolved.parent().map(Path::to_path_buf).unwrap_or(resolved)
    } else {
        resolved
    }
}

/// Hash every selected file under `root`, in sorted path order
pub fn generate_manifest(root: &Path, options: &HashOptions) -> Result<Vec<HashRecord>> {
    if !root.exists() {
        return Err(UtilkitError::NotFound(root.to_path_buf()));
    }

    let resolved = root.canonicalize()?;
    let base = manifest_base(&resolved);
    let files = select_files(&resolved, options.walk, &options.filter);
    info!("Found {} file(s) to hash", files.len());

    let progress = if options.show_progress {
        let bar = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    };

    let hash_one = |p: &PathBuf| {
        let record = make_record(p, &base, options);
        progress.inc(1);
        record
    };

    let records = if options.parallel && !files.is_empty() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers.max(1))
            .build()
            .map_err(|e| UtilkitError::invalid(format!("Failed to start worker pool: {}", e)))?;
        pool.install(|| files.par_iter().map(hash_one).collect::<Result<Vec<_>>>())?
    } else {
        files.iter().map(hash_one).collect::<Result<Vec<_>>>()?
    };

    progress.finish_and_clear();
    Ok(records)
}

/// Render one record in the text manifest format
pub fn format_record(record: &HashRecord) -> String {
    format!("{}  {}  {}", record.algo, record.digest, record.path)
}

/// Write a text manifest, creating parent directories
pub fn write_manifest_text(records: &[HashRecord], target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::io::BufWriter::new(File::create(target)?);
    for record in records {
        writeln!(file, "{}", format_record(record))?;
    }
    file.flush()?;
    Ok(())
}

/// Parse manifest text: a JSON array first, then `algo  digest  path` lines
pub fn parse_manifest(text: &str) -> Result<Vec<HashRecord>> {
    if let Ok(records) = serde_json::from_str::<Vec<HashRecord>>(text) {
        return Ok(records);
    }

    let mut records = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let invalid = || UtilkitError::Manifest(format!("Invalid manifest line: {}", line));

        let (algo, rest) = line.split_once(char::is_whitespace).ok_or_else(invalid)?;
        let (digest, path) = rest
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or_else(invalid)?;
        let path = path.trim_start();
        if path.is_empty() {
            return Err(invalid());
        }

        records.push(HashRecord {
            path: path.to_string(),
            algo: algo.parse().map_err(|_| invalid())?,
            digest: digest.to_string(),
        });
    }
    Ok(records)
}

/// Read a manifest file in either format
pub fn read_manifest(path: &Path) -> Result<Vec<HashRecord>> {
    let text = std::fs::read_to_string(path)?;
    parse_manifest(&text)
}

/// Re-hash every manifest entry. Relative paths resolve against `base`.
pub fn verify_manifest(records: &[HashRecord], base: &Path) -> VerifySummary {
    let mut summary = VerifySummary::default();

    for record in records {
        let stored = Path::new(&record.path);
        let path = if stored.is_absolute() {
            stored.to_path_buf()
        } else {
            base.join(stored)
        };

        if !path.is_file() {
            error!("MISSING: {}", record.path);
            summary.missing += 1;
            continue;
        }

        match hash_file(&path, record.algo) {
            Ok(actual) if actual.eq_ignore_ascii_case(&record.digest) => summary.ok += 1,
            Ok(actual) => {
                error!(
                    "MISMATCH: {}\n  expected: {}\n  actual:   {}",
                    record.path, record.digest, actual
                );
                summary.mismatched += 1;
            }
            Err(e) => {
                error!("UNREADABLE: {}: {}", record.path, e);
                summary.mismatched += 1;
            }
        }
    }

    summary
}
