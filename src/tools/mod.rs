// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The utilities themselves, grouped by category.
//!
//! Each `<category>/<tool>.rs` file is one tool. The tool indexer scans this
//! layout, so a new tool only needs a file with a `//!` module doc.

pub mod audio;
pub mod files;
pub mod images;
pub mod pdf;
pub mod qr;
pub mod web;

/// Directory names the indexer treats as tool categories
pub const CATEGORIES: &[&str] = &["audio", "files", "images", "pdf", "qr", "web"];
