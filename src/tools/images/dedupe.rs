// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Find exact and near-duplicate images via perceptual hashing.
//!
//! Features:
//! - Exact duplicates via SHA-256, near duplicates via aHash/dHash/pHash/wHash
//! - Adjustable Hamming distance threshold
//! - Include/exclude globs, recursive walking, symlink following
//! - CSV and JSON reports
//! - Move duplicates to a quarantine folder or delete them (requires confirmation)

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::perceptual::{hash_path, ImageHash, PerceptualAlgo};
use super::IMAGE_EXTENSIONS;
use crate::tools::files::hasher::{hash_file, HashAlgorithm};
use crate::walk::{list_files, numbered_free_path, FileFilter, WalkOptions};
use crate::{Result, UtilkitError};

/// One scanned image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub sha256: String,
    /// Empty when the image could not be decoded or only exact matching was asked for
    pub phash: Option<ImageHash>,
}

/// A representative image and its duplicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGroup {
    pub representative: ImageInfo,
    pub duplicates: Vec<ImageInfo>,
    /// 0 for exact groups, the threshold for near groups
    pub distance: u32,
}

#[derive(Debug, Clone)]
pub struct DedupeOptions {
    pub filter: FileFilter,
    pub walk: WalkOptions,
    pub algo: PerceptualAlgo,
    pub threshold: u32,
    pub exact: bool,
    pub max_files: Option<usize>,
}

impl Default for DedupeOptions {
    fn default() -> Self {
        Self {
            filter: FileFilter::default(),
            walk: WalkOptions::default(),
            algo: PerceptualAlgo::Phash,
            threshold: 8,
            exact: false,
            max_files: None,
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Hash every image under `root` (or `root` itself when it is a file)
pub fn collect_images(root: &Path, options: &DedupeOptions) -> Result<Vec<ImageInfo>> {
    if !root.exists() {
        return Err(UtilkitError::NotFound(root.to_path_buf()));
    }
    let base_root = root.canonicalize()?;
    let base = if base_root.is_file() {
        base_root.parent().map(Path::to_path_buf).unwrap_or_else(|| base_root.clone())
    } else {
        base_root.clone()
    };

    let single = base_root.is_file();
    let mut files = list_files(&base_root, options.walk);
    files.sort();

    let mut images = Vec::new();
    for path in files {
        if !(single || is_image(&path)) || !options.filter.matches(&path, &base) {
            continue;
        }
        match hash_file(&path, HashAlgorithm::Sha256) {
            Ok(sha256) => {
                let phash = if options.exact {
                    None
                } else {
                    hash_path(&path, options.algo)
                        .map_err(|e| debug!("Failed to hash {:?}: {}", path, e))
                        .ok()
                };
                images.push(ImageInfo { path, sha256, phash });
            }
            Err(e) => warn!("Skipping {:?}: {}", path, e),
        }
        if options.max_files.is_some_and(|max| images.len() >= max) {
            break;
        }
    }

    info!("Collected {} image(s)", images.len());
    Ok(images)
}

/// Group byte-identical images; the first occurrence represents the group
pub fn group_exact(images: &[ImageInfo]) -> Vec<ImageGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_digest: HashMap<&str, Vec<&ImageInfo>> = HashMap::new();
    for info in images {
        let entry = by_digest.entry(info.sha256.as_str()).or_default();
        if entry.is_empty() {
            order.push(info.sha256.as_str());
        }
        entry.push(info);
    }

    order
        .into_iter()
        .filter_map(|digest| {
            let infos = by_digest.remove(digest)?;
            let (first, rest) = infos.split_first()?;
            (!rest.is_empty()).then(|| ImageGroup {
                representative: (*first).clone(),
                duplicates: rest.iter().map(|i| (*i).clone()).collect(),
                distance: 0,
            })
        })
        .collect()
}

/// Quadratic near-duplicate grouping against each unused representative
pub fn group_near(images: &[ImageInfo], threshold: u32) -> Vec<ImageGroup> {
    let hashed: Vec<(&ImageInfo, ImageHash)> = images
        .iter()
        .filter_map(|i| i.phash.map(|h| (i, h)))
        .collect();
    let mut used: HashSet<&Path> = HashSet::new();
    let mut groups = Vec::new();

    for (idx, (rep, rep_hash)) in hashed.iter().enumerate() {
        if used.contains(rep.path.as_path()) {
            continue;
        }
        let mut duplicates = Vec::new();
        for (cand, cand_hash) in &hashed[idx + 1..] {
            if used.contains(cand.path.as_path()) {
                continue;
            }
            if rep_hash.distance(cand_hash) <= threshold {
                duplicates.push((*cand).clone());
                used.insert(cand.path.as_path());
            }
        }
        if !duplicates.is_empty() {
            used.insert(rep.path.as_path());
            groups.push(ImageGroup {
                representative: (*rep).clone(),
                duplicates,
                distance: threshold,
            });
        }
    }
    groups
}

/// Exact groups followed by near groups unless `exact` is set
pub fn find_groups(images: &[ImageInfo], exact: bool, threshold: u32) -> Vec<ImageGroup> {
    let mut groups = group_exact(images);
    if !groups.is_empty() {
        info!("Exact duplicate groups: {}", groups.len());
    }
    if !exact {
        let near = group_near(images, threshold);
        if !near.is_empty() {
            info!("Near-duplicate groups: {} (threshold={})", near.len(), threshold);
        }
        groups.extend(near);
    }
    groups
}

#[derive(Serialize)]
struct CsvRow<'a> {
    representative: String,
    duplicate: String,
    distance: u32,
    rep_sha256: &'a str,
    dup_sha256: &'a str,
}

/// Write one CSV row per duplicate, creating parent directories
pub fn write_report_csv(groups: &[ImageGroup], target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(target)?;
    writer.write_record(["representative", "duplicate", "distance", "rep_sha256", "dup_sha256"])?;
    for group in groups {
        for dup in &group.duplicates {
            writer.serialize(CsvRow {
                representative: group.representative.path.display().to_string(),
                duplicate: dup.path.display().to_string(),
                distance: group.distance,
                rep_sha256: &group.representative.sha256,
                dup_sha256: &dup.sha256,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// JSON report of every group
pub fn report_json(groups: &[ImageGroup]) -> Value {
    Value::Array(
        groups
            .iter()
            .map(|g| {
                json!({
                    "representative": g.representative.path.display().to_string(),
                    "distance": g.distance,
                    "rep_sha256": g.representative.sha256,
                    "duplicates": g.duplicates.iter().map(|d| json!({
                        "path": d.path.display().to_string(),
                        "sha256": d.sha256,
                    })).collect::<Vec<_>>(),
                })
            })
            .collect(),
    )
}

fn move_into(path: &Path, dir: &Path) -> Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| UtilkitError::invalid(format!("No file name: {}", path.display())))?;
    let target = numbered_free_path(&dir.join(name));
    if fs::rename(path, &target).is_err() {
        fs::copy(path, &target)?;
        fs::remove_file(path)?;
    }
    info!("MOVED: {:?} -> {:?}", path, target);
    Ok(())
}

/// Move or delete every duplicate, returning how many were handled.
///
/// A path that appears in several groups is acted on once.
pub fn act_on_duplicates(
    groups: &[ImageGroup],
    move_to: Option<&Path>,
    delete: bool,
    yes: bool,
    dry_run: bool,
) -> Result<usize> {
    if delete && move_to.is_some() {
        return Err(UtilkitError::invalid("Choose either --delete or --move-to, not both"));
    }
    if !delete && move_to.is_none() {
        return Ok(0);
    }
    if !yes {
        return Err(UtilkitError::invalid(
            "Destructive action requested without --yes. Aborting.",
        ));
    }
    if groups.is_empty() {
        info!("No duplicate groups found.");
        return Ok(0);
    }

    if let (Some(dir), false) = (move_to, dry_run) {
        fs::create_dir_all(dir)?;
    }

    let mut seen: HashSet<&Path> = HashSet::new();
    let mut total = 0;
    for dup in groups.iter().flat_map(|g| &g.duplicates) {
        if !seen.insert(dup.path.as_path()) {
            continue;
        }
        total += 1;

        if dry_run {
            let action = if move_to.is_some() { "MOVE" } else { "DELETE" };
            info!("DRY-RUN {}: {:?}", action, dup.path);
            continue;
        }

        let result = match move_to {
            Some(dir) => move_into(&dup.path, dir),
            None => fs::remove_file(&dup.path)
                .map(|_| info!("DELETED: {:?}", dup.path))
                .map_err(UtilkitError::from),
        };
        if let Err(e) = result {
            error!("Failed to act on {:?}: {}", dup.path, e);
        }
    }

    info!("Processed {} duplicate(s)", total);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use tempfile::TempDir;

    fn info(path: &str, sha: &str, hash: Option<u64>) -> ImageInfo {
        ImageInfo { path: path.into(), sha256: sha.into(), phash: hash.map(ImageHash) }
    }

    fn save(dir: &Path, name: &str, img: &RgbImage) -> PathBuf {
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_exact_groups_keep_first_occurrence() {
        let images = vec![
            info("a.png", "x", None),
            info("b.png", "y", None),
            info("c.png", "x", None),
        ];
        let groups = group_exact(&images);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].representative.path, PathBuf::from("a.png"));
        assert_eq!(groups[0].duplicates[0].path, PathBuf::from("c.png"));
        assert_eq!(groups[0].distance, 0);
    }

    #[test]
    fn test_near_groups_use_threshold() {
        let images = vec![
            info("a", "1", Some(0b0000)),
            info("b", "2", Some(0b0011)),
            info("c", "3", Some(0xffff)),
            info("d", "4", None),
        ];
        let groups = group_near(&images, 2);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].duplicates.len(), 1);
        assert_eq!(groups[0].distance, 2);

        assert!(group_near(&images, 1).is_empty());
    }

    #[test]
    fn test_collect_and_report() {
        let dir = TempDir::new().unwrap();
        let img = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 0]));
        save(dir.path(), "one.png", &img);
        save(dir.path(), "two.png", &img);
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        fs::write(dir.path().join("broken.jpg"), "not really a jpeg").unwrap();

        let images = collect_images(dir.path(), &DedupeOptions::default()).unwrap();
        assert_eq!(images.len(), 3);
        assert!(images.iter().any(|i| i.phash.is_none()));

        let groups = find_groups(&images, true, 8);
        assert_eq!(groups.len(), 1);

        let csv_path = dir.path().join("reports/dupes.csv");
        write_report_csv(&groups, &csv_path).unwrap();
        let text = fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("representative,duplicate,distance,rep_sha256,dup_sha256"));
        assert_eq!(text.lines().count(), 2);

        let json = report_json(&groups);
        assert_eq!(json[0]["duplicates"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_max_files() {
        let dir = TempDir::new().unwrap();
        let img = RgbImage::new(8, 8);
        for name in ["a.png", "b.png", "c.png"] {
            save(dir.path(), name, &img);
        }
        let options = DedupeOptions { max_files: Some(2), exact: true, ..DedupeOptions::default() };
        assert_eq!(collect_images(dir.path(), &options).unwrap().len(), 2);
    }

    #[test]
    fn test_actions_require_confirmation() {
        let groups = vec![ImageGroup {
            representative: info("a", "1", None),
            duplicates: vec![info("b", "1", None)],
            distance: 0,
        }];
        assert!(act_on_duplicates(&groups, None, true, false, false).is_err());
        assert!(act_on_duplicates(&groups, Some(Path::new("q")), true, true, false).is_err());
        assert_eq!(act_on_duplicates(&groups, None, false, false, false).unwrap(), 0);
    }

    #[test]
    fn test_move_with_dry_run_then_for_real() {
        let dir = TempDir::new().unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::new(8, 8)).to_rgb8();
        save(dir.path(), "a.png", &img);
        save(dir.path(), "b.png", &img);
        let quarantine = dir.path().join("quarantine");
        fs::create_dir(&quarantine).unwrap();
        fs::write(quarantine.join("b.png"), "occupied").unwrap();

        let options = DedupeOptions { exact: true, ..DedupeOptions::default() };
        let images = collect_images(dir.path(), &options).unwrap();
        let groups = find_groups(&images, true, 0);

        act_on_duplicates(&groups, Some(&quarantine), false, true, true).unwrap();
        assert!(dir.path().join("b.png").exists());

        let moved = act_on_duplicates(&groups, Some(&quarantine), false, true, false).unwrap();
        assert_eq!(moved, 1);
        assert!(!dir.path().join("b.png").exists());
        assert!(quarantine.join("b-1.png").exists());
    }
}
