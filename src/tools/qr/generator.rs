// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Generate QR code images.
//!
//! Features:
//! - Data from an argument or a UTF-8 file
//! - Version 1-40 or automatic, error correction L/M/Q/H
//! - Box size, quiet-zone border and colours (CSS names or #rrggbb)
//! - PNG (or any format the extension implies) or a base64 data URI

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Rgb, RgbImage};
use qrcode::{Color, EcLevel, QrCode, Version};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::{Result, UtilkitError};

/// Error correction level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QrOptions {
    /// 1-40, or `None` to fit the data
    pub version: Option<i16>,
    pub error_correction: ErrorCorrection,
    /// Pixels per module
    pub box_size: u32,
    /// Quiet zone, in modules
    pub border: u32,
    pub fill: String,
    pub back: String,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            version: None,
            error_correction: ErrorCorrection::M,
            box_size: 10,
            border: 4,
            fill: "black".to_string(),
            back: "white".to_string(),
        }
    }
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("navy", [0, 0, 128]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
    ("magenta", [255, 0, 255]),
    ("cyan", [0, 255, 255]),
    ("teal", [0, 128, 128]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("brown", [165, 42, 42]),
    ("pink", [255, 192, 203]),
];

/// Parse a CSS colour name, `#rrggbb` or `#rgb`
pub fn parse_color(value: &str) -> Result<Rgb<u8>> {
    let value = value.trim().to_lowercase();
    let invalid = || UtilkitError::invalid(format!("Unknown colour: {}", value));

    if let Some(hex) = value.strip_prefix('#') {
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(invalid()),
        };
        let packed = u32::from_str_radix(&expanded, 16).map_err(|_| invalid())?;
        return Ok(Rgb([(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]));
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, rgb)| Rgb(*rgb))
        .ok_or_else(invalid)
}

/// Read the payload from `--data` or a UTF-8 file
pub fn read_data(data: Option<&str>, file: Option<&Path>) -> Result<String> {
    match (data, file) {
        (Some(d), _) => Ok(d.to_string()),
        (None, Some(f)) => std::fs::read_to_string(f).map_err(|e| {
            UtilkitError::Qr(format!("Failed to read data file '{}': {}", f.display(), e))
        }),
        (None, None) => Err(UtilkitError::invalid("Provide --data or --file")),
    }
}

/// Largest rendered image side in pixels
const MAX_IMAGE_SIDE: u32 = 32_768;

/// Encode `data` and draw it as an image
pub fn render_qr(data: &str, options: &QrOptions) -> Result<RgbImage> {
    if data.is_empty() {
        return Err(UtilkitError::Qr("Data is empty".to_string()));
    }
    if options.box_size == 0 {
        return Err(UtilkitError::invalid("--box-size must be at least 1"));
    }

    let level = EcLevel::from(options.error_correction);
    let code = match options.version {
        Some(v) if !(1..=40).contains(&v) => {
            return Err(UtilkitError::Qr("--version must be between 1 and 40".to_string()))
        }
        Some(v) => QrCode::with_version(data.as_bytes(), Version::Normal(v), level),
        None => QrCode::with_error_correction_level(data.as_bytes(), level),
    }
    .map_err(|e| UtilkitError::Qr(format!("Failed to generate QR code: {}", e)))?;

    let fill = parse_color(&options.fill)?;
    let back = parse_color(&options.back)?;
    let modules = code.width() as u32;
    let colors = code.to_colors();
    debug!("QR code is {}x{} modules", modules, modules);

    let side = options
        .border
        .checked_mul(2)
        .and_then(|b| b.checked_add(modules))
        .and_then(|m| m.checked_mul(options.box_size))
        .filter(|&side| side <= MAX_IMAGE_SIDE)
        .ok_or_else(|| {
            UtilkitError::invalid(format!(
                "--box-size {} with --border {} exceeds {} pixels per side",
                options.box_size, options.border, MAX_IMAGE_SIDE
            ))
        })?;
    let img = RgbImage::from_fn(side, side, |x, y| {
        let mx = (x / options.box_size).checked_sub(options.border);
        let my = (y / options.box_size).checked_sub(options.border);
        match (mx, my) {
            (Some(mx), Some(my)) if mx < modules && my < modules => {
                match colors[(my * modules + mx) as usize] {
                    Color::Dark => fill,
                    Color::Light => back,
                }
            }
            _ => back,
        }
    });
    Ok(img)
}

/// Render and save to `output`, creating parent directories
pub fn generate_qr_file(data: &str, options: &QrOptions, output: &Path) -> Result<(u32, u32)> {
    let img = render_qr(data, options)?;
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    img.save(output)?;
    Ok(img.dimensions())
}

/// Render as a `data:image/png;base64,...` URI
pub fn generate_qr_data_uri(data: &str, options: &QrOptions) -> Result<String> {
    let img = render_qr(data, options)?;
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("black").unwrap(), Rgb([0, 0, 0]));
        assert_eq!(parse_color("White").unwrap(), Rgb([255, 255, 255]));
        assert_eq!(parse_color("#1a2b3c").unwrap(), Rgb([0x1a, 0x2b, 0x3c]));
        assert_eq!(parse_color("#f00").unwrap(), Rgb([255, 0, 0]));
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn test_version_one_size_and_quiet_zone() {
        let options = QrOptions { version: Some(1), box_size: 2, ..QrOptions::default() };
        let img = render_qr("hi", &options).unwrap();
        // 21 modules + 2 * 4 border, 2 px each
        assert_eq!(img.dimensions(), (58, 58));
        assert_eq!(*img.get_pixel(0, 0), Rgb([255, 255, 255]));
        // top-left finder pattern starts right after the border
        assert_eq!(*img.get_pixel(8, 8), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(render_qr("", &QrOptions::default()).is_err());
        let options = QrOptions { version: Some(41), ..QrOptions::default() };
        assert!(render_qr("x", &options).is_err());
        let options = QrOptions { fill: "nope".into(), ..QrOptions::default() };
        assert!(render_qr("x", &options).is_err());
    }

    #[test]
    fn test_oversized_image_is_rejected() {
        let options = QrOptions { border: u32::MAX / 2, ..QrOptions::default() };
        assert!(matches!(render_qr("x", &options), Err(UtilkitError::InvalidArgument(_))));

        let options = QrOptions { box_size: u32::MAX, ..QrOptions::default() };
        assert!(matches!(render_qr("x", &options), Err(UtilkitError::InvalidArgument(_))));

        let options = QrOptions { version: Some(1), box_size: 2000, ..QrOptions::default() };
        assert!(render_qr("x", &options).is_err());
    }

    #[test]
    fn test_data_too_long_for_version() {
        let options = QrOptions { version: Some(1), error_correction: ErrorCorrection::H, ..QrOptions::default() };
        assert!(render_qr(&"x".repeat(200), &options).is_err());
    }

    #[test]
    fn test_file_output_and_data_uri() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("codes/site.png");
        generate_qr_file("https://example.com", &QrOptions::default(), &out).unwrap();
        assert!(image::open(&out).is_ok());

        let uri = generate_qr_data_uri("hello", &QrOptions::default()).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_read_data_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("payload.txt");
        std::fs::write(&path, "from file").unwrap();
        assert_eq!(read_data(None, Some(&path)).unwrap(), "from file");
        assert_eq!(read_data(Some("inline"), None).unwrap(), "inline");
        assert!(read_data(None, None).is_err());
    }
}
