// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! 64-bit perceptual image hashes (aHash, dHash, pHash, wHash)

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use serde::{Serialize, Serializer};
use std::f64::consts::PI;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{Result, UtilkitError};

/// Perceptual hashing algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PerceptualAlgo {
    Ahash,
    Dhash,
    #[default]
    Phash,
    Whash,
}

/// A 64-bit image fingerprint, first bit most significant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHash(pub u64);

impl ImageHash {
    /// Number of differing bits
    pub fn distance(&self, other: &ImageHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        ImageHash(bits.into_iter().fold(0u64, |acc, b| (acc << 1) | u64::from(b)))
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for ImageHash {
    type Err = UtilkitError;

    fn from_str(s: &str) -> Result<Self> {
        u64::from_str_radix(s, 16)
            .map(ImageHash)
            .map_err(|_| UtilkitError::invalid(format!("Invalid image hash: {}", s)))
    }
}

impl Serialize for ImageHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn grey_matrix(img: &DynamicImage, width: u32, height: u32) -> Vec<Vec<f64>> {
    let small: GrayImage = image::imageops::resize(&img.to_luma8(), width, height, FilterType::Lanczos3);
    (0..height)
        .map(|y| (0..width).map(|x| f64::from(small.get_pixel(x, y).0[0])).collect())
        .collect()
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn threshold_hash(values: &[f64], pivot: f64) -> ImageHash {
    ImageHash::from_bits(values.iter().map(|&v| v > pivot))
}

/// Each pixel of an 8×8 thumbnail against the mean
pub fn average_hash(img: &DynamicImage) -> ImageHash {
    let values: Vec<f64> = grey_matrix(img, 8, 8).into_iter().flatten().collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    threshold_hash(&values, mean)
}

/// Each pixel of a 9×8 thumbnail against its right neighbour
pub fn difference_hash(img: &DynamicImage) -> ImageHash {
    let rows = grey_matrix(img, 9, 8);
    ImageHash::from_bits(rows.iter().flat_map(|row| row.windows(2).map(|w| w[1] > w[0])))
}

/// Unnormalised 1-D DCT-II
fn dct(input: &[f64]) -> Vec<f64> {
    let n = input.len() as f64;
    (0..input.len())
        .map(|k| {
            2.0 * input
                .iter()
                .enumerate()
                .map(|(i, x)| x * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .sum::<f64>()
        })
        .collect()
}

/// Low frequencies of a 32×32 DCT against their median
pub fn phash(img: &DynamicImage) -> ImageHash {
    let rows = grey_matrix(img, 32, 32);

    // columns first, then rows
    let size = rows.len();
    let cols: Vec<Vec<f64>> = (0..size)
        .map(|x| dct(&rows.iter().map(|r| r[x]).collect::<Vec<_>>()))
        .collect();
    let transformed: Vec<Vec<f64>> = (0..size)
        .map(|y| dct(&cols.iter().map(|c| c[y]).collect::<Vec<_>>()))
        .collect();

    let low: Vec<f64> = transformed[..8].iter().flat_map(|r| r[..8].to_vec()).collect();
    threshold_hash(&low, median(&low))
}

fn haar_ll(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let half = matrix.len() / 2;
    (0..half)
        .map(|y| {
            (0..half)
                .map(|x| {
                    (matrix[2 * y][2 * x]
                        + matrix[2 * y][2 * x + 1]
                        + matrix[2 * y + 1][2 * x]
                        + matrix[2 * y + 1][2 * x + 1])
                        / 4.0
                })
                .collect()
        })
        .collect()
}

/// 8×8 LL band of a three-level Haar decomposition of a 64×64 thumbnail against its median
pub fn whash(img: &DynamicImage) -> ImageHash {
    let mut matrix: Vec<Vec<f64>> = grey_matrix(img, 64, 64)
        .into_iter()
        .map(|row| row.into_iter().map(|v| v / 255.0).collect())
        .collect();
    for _ in 0..3 {
        matrix = haar_ll(&matrix);
    }
    let values: Vec<f64> = matrix.into_iter().flatten().collect();
    threshold_hash(&values, median(&values))
}

/// Hash an in-memory image
pub fn hash_image(img: &DynamicImage, algo: PerceptualAlgo) -> ImageHash {
    match algo {
        PerceptualAlgo::Ahash => average_hash(img),
        PerceptualAlgo::Dhash => difference_hash(img),
        PerceptualAlgo::Phash => phash(img),
        PerceptualAlgo::Whash => whash(img),
    }
}

/// Decode and hash an image file
pub fn hash_path(path: &Path, algo: PerceptualAlgo) -> Result<ImageHash> {
    let img = image::open(path)?;
    Ok(hash_image(&img, algo))
}
