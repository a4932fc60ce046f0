// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Image utilities

pub mod carve;
pub mod dedupe;
pub mod perceptual;
pub mod resize;

/// Extensions treated as images by the directory-scanning tools
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];
