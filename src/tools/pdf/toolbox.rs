// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! PDF toolbox: info, merge, split, extract and rotate.
//!
//! Ranges are 1-based and may be open-ended, e.g. `1-3,7,10-`.

use lopdf::{Document, Object, ObjectId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{load_document, save_document};
use crate::{Result, UtilkitError};

/// Document summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct PdfInfo {
    pub page_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// Parse a range list into inclusive 1-based `(start, end)` pairs.
///
/// A missing start means page 1, a missing end means `max_pages`.
pub fn parse_ranges(expr: &str, max_pages: u32) -> Result<Vec<(u32, u32)>> {
    let mut ranges = Vec::new();

    for part in expr.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let invalid = || UtilkitError::invalid(format!("Invalid range: {}", part));
        let number = |s: &str, default: u32| -> Result<i64> {
            let s = s.trim();
            if s.is_empty() {
                Ok(i64::from(default))
            } else {
                s.parse().map_err(|_| invalid())
            }
        };

        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (number(a, 1)?, number(b, max_pages)?),
            None => {
                let n = number(part, 0)?;
                (n, n)
            }
        };
        if start <= 0 || end < start || end > i64::from(u32::MAX) {
            return Err(invalid());
        }
        ranges.push((start as u32, end as u32));
    }

    Ok(ranges)
}

/// Parse a comma list of 1-based page numbers
pub fn parse_pages(expr: &str) -> Result<BTreeSet<u32>> {
    expr.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| match t.parse::<i64>() {
            Ok(n) if n > 0 && n <= i64::from(u32::MAX) => Ok(n as u32),
            _ => Err(UtilkitError::invalid("Page numbers must be >= 1")),
        })
        .collect()
}

fn info_string(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_str().ok())
        .map(|b| String::from_utf8_lossy(b).into_owned())
}

/// Page count and document info fields
pub fn pdf_info(path: &Path) -> Result<PdfInfo> {
    let doc = load_document(path)?;
    let mut info = PdfInfo { page_count: doc.get_pages().len(), ..PdfInfo::default() };

    let dict = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_dictionary(id));
    if let Ok(dict) = dict {
        info.title = info_string(dict, b"Title");
        info.author = info_string(dict, b"Author");
        info.subject = info_string(dict, b"Subject");
    }
    Ok(info)
}

fn pages_in_ranges(ranges: &[(u32, u32)], total: u32) -> BTreeSet<u32> {
    ranges
        .iter()
        .flat_map(|&(start, end)| start..=end.min(total))
        .collect()
}

/// Write a copy of `src` holding only `keep`, in document order
fn write_subset(src: &Path, keep: &BTreeSet<u32>, out: &Path) -> Result<usize> {
    let mut doc = load_document(src)?;
    let drop: Vec<u32> = doc.get_pages().keys().copied().filter(|n| !keep.contains(n)).collect();
    let kept = doc.get_pages().len() - drop.len();
    if kept == 0 {
        return Err(UtilkitError::invalid("Selection contains no pages"));
    }
    doc.delete_pages(&drop);
    save_document(&mut doc, out)?;
    Ok(kept)
}

/// One file per range, named `<stem>_part<N>.pdf` in `out_dir`
pub fn split(src: &Path, ranges_expr: &str, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let total = load_document(src)?.get_pages().len() as u32;
    let ranges = parse_ranges(ranges_expr, total)?;
    if ranges.is_empty() {
        return Err(UtilkitError::invalid("No ranges provided"));
    }

    std::fs::create_dir_all(out_dir)?;
    let stem = src.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();

    let mut written = Vec::new();
    for (idx, range) in ranges.iter().enumerate() {
        let target = out_dir.join(format!("{}_part{}.pdf", stem, idx + 1));
        write_subset(src, &pages_in_ranges(&[*range], total), &target)?;
        info!("Wrote {:?}", target);
        written.push(target);
    }
    Ok(written)
}

/// The pages covered by the ranges, in one file
pub fn extract(src: &Path, ranges_expr: &str, out: &Path) -> Result<usize> {
    let total = load_document(src)?.get_pages().len() as u32;
    let ranges = parse_ranges(ranges_expr, total)?;
    if ranges.is_empty() {
        return Err(UtilkitError::invalid("No ranges provided"));
    }
    write_subset(src, &pages_in_ranges(&ranges, total), out)
}

/// Rotate the selected pages by `angle` degrees on top of their current rotation
pub fn rotate(src: &Path, pages_expr: &str, angle: i64, out: &Path) -> Result<usize> {
    if angle % 90 != 0 {
        return Err(UtilkitError::invalid("Angle must be a multiple of 90"));
    }
    let selected = parse_pages(pages_expr)?;
    let mut doc = load_document(src)?;

    let targets: Vec<ObjectId> = doc
        .get_pages()
        .into_iter()
        .filter(|(n, _)| selected.contains(n))
        .map(|(_, id)| id)
        .collect();

    for id in &targets {
        let page = doc.get_object_mut(*id).and_then(Object::as_dict_mut)?;
        let current = page.get(b"Rotate").and_then(Object::as_i64).unwrap_or(0);
        page.set("Rotate", Object::Integer((current + angle).rem_euclid(360)));
    }

    save_document(&mut doc, out)?;
    Ok(targets.len())
}

fn dict_type(object: &Object) -> &[u8] {
    object
        .as_dict()
        .and_then(|d| d.get(b"Type"))
        .and_then(Object::as_name)
        .unwrap_or(b"")
}

const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A page dictionary with attributes inherited from its page tree copied in
fn page_with_inherited(doc: &Document, id: ObjectId) -> Result<lopdf::Dictionary> {
    let mut page = doc.get_dictionary(id)?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    while let Some(parent_id) = parent {
        let node = doc.get_dictionary(parent_id)?;
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(page)
}

/// Concatenate the pages of `inputs` into `out`
pub fn merge(inputs: &[PathBuf], out: &Path) -> Result<usize> {
    if inputs.is_empty() {
        return Err(UtilkitError::invalid("No input PDFs given"));
    }

    let mut max_id = 1;
    let mut pages: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut page_order: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for path in inputs {
        let mut doc = load_document(path)?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, id) in doc.get_pages() {
            pages.insert(id, Object::Dictionary(page_with_inherited(&doc, id)?));
            page_order.push(id);
        }
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Object)> = None;
    let mut root_pages: Option<(ObjectId, Object)> = None;

    for (id, object) in objects {
        match dict_type(&object) {
            b"Catalog" => {
                catalog.get_or_insert((id, object));
            }
            b"Pages" => {
                root_pages.get_or_insert((id, object));
            }
            b"Page" | b"Outlines" | b"Outline" => {}
            _ => {
                merged.objects.insert(id, object);
            }
        }
    }

    let (pages_id, pages_object) =
        root_pages.ok_or_else(|| UtilkitError::Pdf("Pages root not found".to_string()))?;
    let (catalog_id, catalog_object) =
        catalog.ok_or_else(|| UtilkitError::Pdf("Catalog not found".to_string()))?;

    for id in &page_order {
        if let Some(Ok(dict)) = pages.get(id).map(Object::as_dict) {
            let mut dict = dict.clone();
            dict.set("Parent", pages_id);
            merged.objects.insert(*id, Object::Dictionary(dict));
        }
    }

    let mut pages_dict = pages_object.as_dict()?.clone();
    pages_dict.set("Count", Object::Integer(page_order.len() as i64));
    pages_dict.set(
        "Kids",
        Object::Array(page_order.iter().map(|id| Object::Reference(*id)).collect()),
    );
    merged.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = catalog_object.as_dict()?.clone();
    catalog_dict.set("Pages", pages_id);
    catalog_dict.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(catalog_dict));

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.keys().map(|(n, _)| *n).max().unwrap_or(0);

    save_document(&mut merged, out)?;
    Ok(page_order.len())
}
