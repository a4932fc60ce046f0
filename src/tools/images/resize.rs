// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Resize an image with optional aspect ratio preservation.

use image::imageops::FilterType;
use image::GenericImageView;
use std::path::Path;
use tracing::info;

use crate::{Result, UtilkitError};

/// Resampling filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Resample {
    Nearest,
    Bilinear,
    Bicubic,
    #[default]
    Lanczos,
}

impl From<Resample> for FilterType {
    fn from(r: Resample) -> Self {
        match r {
            Resample::Nearest => FilterType::Nearest,
            Resample::Bilinear => FilterType::Triangle,
            Resample::Bicubic => FilterType::CatmullRom,
            Resample::Lanczos => FilterType::Lanczos3,
        }
    }
}

fn scaled(dim: u32, scale: f64) -> u32 {
    ((dim as f64 * scale) as u32).max(1)
}

/// Work out the output size from the requested dimensions
pub fn compute_target_size(
    original: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    keep_aspect: bool,
    fit_within: bool,
) -> Result<(u32, u32)> {
    let (ow, oh) = original;

    if fit_within {
        let (Some(w), Some(h)) = (width, height) else {
            return Err(UtilkitError::invalid("--fit-within requires both --width and --height"));
        };
        let scale = (w as f64 / ow as f64).min(h as f64 / oh as f64);
        return Ok((scaled(ow, scale), scaled(oh, scale)));
    }

    match (width, height, keep_aspect) {
        (Some(w), Some(h), _) => Ok((w.max(1), h.max(1))),
        (_, _, false) => Err(UtilkitError::invalid(
            "Provide both --width and --height or enable --keep-aspect",
        )),
        (None, None, true) => Err(UtilkitError::invalid(
            "With --keep-aspect, specify at least one of --width/--height",
        )),
        (None, Some(h), true) => Ok((scaled(ow, h as f64 / oh as f64), h.max(1))),
        (Some(w), None, true) => Ok((w.max(1), scaled(oh, w as f64 / ow as f64))),
    }
}

/// Resize `input` into `output`, returning the new size
pub fn resize_file(
    input: &Path,
    output: &Path,
    width: Option<u32>,
    height: Option<u32>,
    keep_aspect: bool,
    fit_within: bool,
    resample: Resample,
) -> Result<(u32, u32)> {
    if !input.exists() {
        return Err(UtilkitError::NotFound(input.to_path_buf()));
    }
    let img = image::open(input)?;
    info!("Original size: {}x{}", img.width(), img.height());

    let (w, h) = compute_target_size(img.dimensions(), width, height, keep_aspect, fit_within)?;
    let resized = img.resize_exact(w, h, resample.into());
    info!("Resized size: {}x{}", resized.width(), resized.height());

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    resized.save(output)?;
    Ok((w, h))
}
