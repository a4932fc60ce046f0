// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Speak text aloud through the system text-to-speech engine.
//!
//! Text comes from `--text`, a UTF-8 file, or piped stdin. The first engine
//! found among espeak-ng, espeak and macOS `say` is used unless one is
//! configured. Speech can be written to a WAV/AIFF file instead of played.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::config::SpeechConfig;
use crate::{Result, UtilkitError};

/// Engines probed in order when none is configured
pub const ENGINES: &[&str] = &["espeak-ng", "espeak", "say"];

#[derive(Debug, Clone, Default)]
pub struct SpeakOptions {
    pub engine: Option<String>,
    pub voice: Option<String>,
    /// Words per minute
    pub rate: Option<u32>,
    /// Write audio here instead of playing it
    pub output: Option<PathBuf>,
}

impl From<&SpeechConfig> for SpeakOptions {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            engine: config.engine.clone(),
            voice: config.voice.clone(),
            rate: Some(config.rate),
            output: None,
        }
    }
}

/// Pick the text source: `--text`, then `--file`, then stdin
pub fn read_text(text: Option<&str>, file: Option<&Path>, stdin: Option<String>) -> Result<String> {
    let text = match (text, file) {
        (Some(t), _) => t.to_string(),
        (None, Some(f)) => std::fs::read_to_string(f).map_err(|e| {
            UtilkitError::Speech(format!("Failed to read file '{}': {}", f.display(), e))
        })?,
        (None, None) => stdin.unwrap_or_default(),
    };

    if text.trim().is_empty() {
        return Err(UtilkitError::Speech("Empty text provided; nothing to speak".to_string()));
    }
    Ok(text)
}

/// Whether `name` can be spawned at all
pub fn engine_available(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

fn select_engine(preferred: Option<&str>, available: impl Fn(&str) -> bool) -> Result<String> {
    let candidates: Vec<&str> = match preferred {
        Some(engine) => vec![engine],
        None => ENGINES.to_vec(),
    };

    candidates
        .iter()
        .find(|name| available(name))
        .map(|name| name.to_string())
        .ok_or_else(|| {
            UtilkitError::Speech(format!(
                "No text-to-speech engine found (tried: {})",
                candidates.join(", ")
            ))
        })
}

/// The configured engine if it runs, else the first of [`ENGINES`] that does
pub fn find_engine(preferred: Option<&str>) -> Result<String> {
    select_engine(preferred, engine_available)
}

fn is_say(engine: &str) -> bool {
    Path::new(engine).file_name().and_then(|n| n.to_str()) == Some("say")
}

/// Command-line arguments for `engine`. `say` and the espeak family differ.
pub fn engine_args(engine: &str, text: &str, options: &SpeakOptions) -> Vec<String> {
    let (voice_flag, rate_flag, output_flag) = if is_say(engine) {
        ("-v", "-r", "-o")
    } else {
        ("-v", "-s", "-w")
    };

    let mut args = Vec::new();
    if let Some(voice) = &options.voice {
        args.extend([voice_flag.to_string(), voice.clone()]);
    }
    if let Some(rate) = options.rate {
        args.extend([rate_flag.to_string(), rate.to_string()]);
    }
    if let Some(out) = &options.output {
        args.extend([output_flag.to_string(), out.to_string_lossy().into_owned()]);
    }
    args.push(text.to_string());
    args
}

/// Speak `text`, returning the engine that was used
pub fn speak(text: &str, options: &SpeakOptions) -> Result<String> {
    if text.trim().is_empty() {
        return Err(UtilkitError::Speech("Empty text provided; nothing to speak".to_string()));
    }

    let engine = find_engine(options.engine.as_deref())?;
    if let Some(parent) = options.output.as_deref().and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let args = engine_args(&engine, text, options);
    debug!("Running {} with {} args", engine, args.len());

    let output = Command::new(&engine)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| UtilkitError::Speech(format!("Failed to run {}: {}", engine, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(UtilkitError::Speech(format!(
            "{} exited with {}: {}",
            engine,
            output.status,
            stderr.trim()
        )));
    }

    match &options.output {
        Some(out) => info!("Wrote speech to {}", out.display()),
        None => info!("Spoke {} characters with {}", text.chars().count(), engine),
    }
    Ok(engine)
}
