// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Extract text from a PDF with page selection and output options.
//!
//! Pages are read one at a time through lopdf. When no pages are selected and
//! lopdf cannot handle the file, the whole document goes through pdf-extract.

use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

use super::load_document;
use crate::{Result, UtilkitError};

/// Larger page numbers are rejected rather than expanded
const MAX_PAGE_NUMBER: i64 = 100_000;

/// Parse `1,3-5` into unique, sorted 1-based page numbers
pub fn parse_page_ranges(expr: &str) -> Result<Vec<u32>> {
    let mut pages = BTreeSet::new();

    for part in expr.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((a, b)) = part.split_once('-') {
            let invalid = || UtilkitError::invalid(format!("Invalid page range: {}", part));
            let a: i64 = a.trim().parse().map_err(|_| invalid())?;
            let b: i64 = b.trim().parse().map_err(|_| invalid())?;
            if a <= 0 || b <= 0 || b < a || b > MAX_PAGE_NUMBER {
                return Err(invalid());
            }
            pages.extend((a..=b).map(|n| n as u32));
        } else {
            let n: i64 = part
                .parse()
                .ok()
                .filter(|n| *n > 0 && *n <= MAX_PAGE_NUMBER)
                .ok_or_else(|| UtilkitError::invalid(format!("Invalid page number: {}", part)))?;
            pages.insert(n as u32);
        }
    }

    Ok(pages.into_iter().collect())
}

fn extract_per_page(path: &Path, pages: Option<&[u32]>, strip: bool) -> Result<Vec<String>> {
    let doc = load_document(path)?;
    let total = doc.get_pages().len() as u32;
    let selected: Vec<u32> = match pages {
        Some(p) => p.to_vec(),
        None => (1..=total).collect(),
    };

    let mut texts = Vec::with_capacity(selected.len());
    for page in selected {
        if !(1..=total).contains(&page) {
            warn!("Skipping out-of-range page {} (1..{})", page, total);
            continue;
        }
        let text = doc
            .extract_text(&[page])
            .map_err(|e| UtilkitError::Pdf(format!("Page {}: {}", page, e)))?;
        texts.push(if strip { text.trim().to_string() } else { text });
    }
    Ok(texts)
}

fn extract_whole(path: &Path, strip: bool) -> Result<Vec<String>> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| UtilkitError::Pdf(format!("Text extraction failed: {}", e)))?;
    Ok(vec![if strip { text.trim().to_string() } else { text }])
}

/// Text of each selected page (all pages when `pages` is `None`)
pub fn extract_pdf_text(path: &Path, pages: Option<&[u32]>, strip: bool) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(UtilkitError::NotFound(path.to_path_buf()));
    }
    match extract_per_page(path, pages, strip) {
        Ok(texts) => Ok(texts),
        Err(e) if pages.is_none() => {
            debug!("Per-page extraction failed, falling back: {}", e);
            extract_whole(path, strip)
        }
        Err(e) => Err(e),
    }
}
