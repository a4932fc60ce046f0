// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Content-aware image resizing by seam carving.
//!
//! Repeatedly removes the lowest-energy vertical seam until the target width is
//! reached, then does the same on the transposed image for the height. Only
//! shrinking is supported.

use image::{DynamicImage, Rgb, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::info;

use crate::{Result, UtilkitError};

/// Energy function used to score pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum EnergyMethod {
    #[default]
    Auto,
    Sobel,
}

#[derive(Debug, Clone, Default)]
pub struct CarveOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub energy: EnergyMethod,
    pub show_progress: bool,
}

/// Float RGB pixels in [0, 1], row-major
#[derive(Debug, Clone, PartialEq)]
struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<[f32; 3]>,
}

impl Canvas {
    fn from_image(img: &DynamicImage) -> Self {
        let rgb = img.to_rgb32f();
        let (w, h) = rgb.dimensions();
        let pixels = rgb.pixels().map(|p| p.0).collect();
        Self { width: w as usize, height: h as usize, pixels }
    }

    fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let p = self.pixels[y as usize * self.width + x as usize];
            Rgb(p.map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8))
        })
    }

    fn grey(&self) -> Vec<f32> {
        self.pixels
            .iter()
            .map(|[r, g, b]| 0.2125 * r + 0.7154 * g + 0.0721 * b)
            .collect()
    }

    fn transpose(&self) -> Self {
        let mut pixels = Vec::with_capacity(self.pixels.len());
        for x in 0..self.width {
            for y in 0..self.height {
                pixels.push(self.pixels[y * self.width + x]);
            }
        }
        Self { width: self.height, height: self.width, pixels }
    }

    fn remove_vertical_seam(&mut self, seam: &[usize]) {
        let mut pixels = Vec::with_capacity(self.pixels.len() - self.height);
        for (y, &skip) in seam.iter().enumerate() {
            let row = &self.pixels[y * self.width..(y + 1) * self.width];
            pixels.extend_from_slice(&row[..skip]);
            pixels.extend_from_slice(&row[skip + 1..]);
        }
        self.pixels = pixels;
        self.width -= 1;
    }
}

/// Reflect an out-of-range index back into `0..n` (edge pixel repeated)
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let r = if i < 0 {
        -i - 1
    } else if i >= n {
        2 * n - i - 1
    } else {
        i
    };
    r.clamp(0, n - 1) as usize
}

/// Sobel gradient magnitude `sqrt((gx² + gy²) / 2)` of a grey image
pub fn sobel_energy(grey: &[f32], width: usize, height: usize) -> Vec<f32> {
    let at = |x: isize, y: isize| grey[reflect(y, height) * width + reflect(x, width)];
    let mut energy = vec![0.0; width * height];

    for y in 0..height as isize {
        for x in 0..width as isize {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
                - at(x - 1, y - 1)
                - 2.0 * at(x - 1, y)
                - at(x - 1, y + 1))
                / 4.0;
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
                - at(x - 1, y - 1)
                - 2.0 * at(x, y - 1)
                - at(x + 1, y - 1))
                / 4.0;
            energy[y as usize * width + x as usize] = ((gx * gx + gy * gy) / 2.0).sqrt();
        }
    }
    energy
}

/// Column index of the minimal-energy vertical seam in each row.
///
/// Ties between the left, upper and right predecessor go to the first of those.
pub fn find_vertical_seam(energy: &[f32], width: usize, height: usize) -> Vec<usize> {
    let mut cumulative = energy[..width].to_vec();
    let mut backtrack = vec![0usize; width * height];

    for y in 1..height {
        let mut row = vec![0.0; width];
        for x in 0..width {
            let mut best = x;
            let mut best_val = cumulative[x];
            if x > 0 && cumulative[x - 1] <= best_val {
                best = x - 1;
                best_val = cumulative[x - 1];
            }
            if x + 1 < width && cumulative[x + 1] < best_val {
                best = x + 1;
                best_val = cumulative[x + 1];
            }
            backtrack[y * width + x] = best;
            row[x] = energy[y * width + x] + best_val;
        }
        cumulative = row;
    }

    let mut seam = vec![0usize; height];
    let mut col = cumulative
        .iter()
        .enumerate()
        .fold((0, f32::INFINITY), |acc, (i, &v)| if v < acc.1 { (i, v) } else { acc })
        .0;
    for y in (0..height).rev() {
        seam[y] = col;
        col = backtrack[y * width + col];
    }
    seam
}

fn reduce_width(mut canvas: Canvas, target: usize, energy: EnergyMethod, progress: &ProgressBar) -> Canvas {
    while canvas.width > target {
        let energy_map = match energy {
            EnergyMethod::Auto | EnergyMethod::Sobel => {
                sobel_energy(&canvas.grey(), canvas.width, canvas.height)
            }
        };
        let seam = find_vertical_seam(&energy_map, canvas.width, canvas.height);
        canvas.remove_vertical_seam(&seam);
        progress.inc(1);
    }
    canvas
}

/// Carve an in-memory image down to the requested size
pub fn carve_image(img: &DynamicImage, options: &CarveOptions) -> Result<RgbImage> {
    if options.width.is_none() && options.height.is_none() {
        return Err(UtilkitError::Carving("Provide --width and/or --height".to_string()));
    }

    let (w, h) = (img.width(), img.height());
    let target_w = options.width.map_or(w, |t| t.max(1));
    let target_h = options.height.map_or(h, |t| t.max(1));

    if target_w > w {
        return Err(UtilkitError::Carving(
            "Widening via seam insertion is not supported".to_string(),
        ));
    }
    if target_h > h {
        return Err(UtilkitError::Carving(
            "Height increase via seam insertion is not supported".to_string(),
        ));
    }

    info!("Original size: {}x{}", w, h);
    let progress = if options.show_progress {
        let bar = ProgressBar::new(u64::from((w - target_w) + (h - target_h)));
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} seams") {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut canvas = Canvas::from_image(img);
    if target_w < w {
        info!("Removing {} vertical seams to reach width {}", w - target_w, target_w);
        canvas = reduce_width(canvas, target_w as usize, options.energy, &progress);
    }
    if target_h < h {
        info!("Removing {} horizontal seams to reach height {}", h - target_h, target_h);
        canvas = reduce_width(canvas.transpose(), target_h as usize, options.energy, &progress)
            .transpose();
    }
    progress.finish_and_clear();

    info!("Resized size: {}x{}", canvas.width, canvas.height);
    Ok(canvas.to_image())
}

/// Carve `input` and save the result to `output`, returning the new size
pub fn carve_file(input: &Path, output: &Path, options: &CarveOptions) -> Result<(u32, u32)> {
    if !input.exists() {
        return Err(UtilkitError::NotFound(input.to_path_buf()));
    }
    let img = image::open(input).map_err(|e| {
        UtilkitError::Carving(format!("Failed to open image '{}': {}", input.display(), e))
    })?;

    let carved = carve_image(&img, options)?;
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    carved.save(output)?;
    Ok(carved.dimensions())
}
