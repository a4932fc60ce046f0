// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! utilkit: a kit of small single-purpose utilities.
//!
//! Image seam carving, resizing and de-duplication, file hashing, batch
//! renaming with undo, duplicate detection, PDF text and page tools, QR codes,
//! URL status checks and text to speech. A tree-sitter index of the tools
//! feeds a small web browser.

pub mod config;
pub mod error;
pub mod history;
pub mod index;
pub mod tools;
pub mod walk;
pub mod web;

pub use config::AppConfig;
pub use error::{Result, UtilkitError};
