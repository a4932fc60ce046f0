// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Check HTTP status codes for many URLs concurrently.
//!
//! Each URL gets a HEAD request, falling back to GET when HEAD is refused or
//! fails. Results come back in input order.

use futures_util::stream::{self, StreamExt};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::UrlCheckConfig;
use crate::{Result, UtilkitError};

/// Outcome of one URL check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlStatus {
    pub url: String,
    pub status: Option<u16>,
    pub ok: bool,
    pub method: String,
    pub final_url: Option<String>,
    /// Seconds until the response headers arrived
    pub elapsed: Option<f64>,
    pub error: Option<String>,
}

/// HTTP client plus a concurrency bound
pub struct UrlChecker {
    client: Client,
    max_workers: usize,
}

/// Request timeout from seconds. Must be positive and finite.
pub fn timeout_duration(secs: f64) -> Result<Duration> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(UtilkitError::invalid(format!("--timeout must be a positive number, got {}", secs)));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| UtilkitError::invalid(format!("--timeout {} is out of range: {}", secs, e)))
}

impl UrlChecker {
    pub fn new(config: &UrlCheckConfig) -> Result<Self> {
        let timeout = timeout_duration(config.timeout_secs)?;
        if config.max_workers == 0 {
            return Err(UtilkitError::invalid("--max-workers must be >= 1"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, max_workers: config.max_workers })
    }

    async fn request(&self, method: Method, url: &str) -> std::result::Result<UrlStatus, String> {
        let start = Instant::now();
        let response = self
            .client
            .request(method.clone(), url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();

        Ok(UrlStatus {
            url: url.to_string(),
            status: Some(status.as_u16()),
            ok: (200..400).contains(&status.as_u16()),
            method: method.to_string(),
            final_url: Some(response.url().to_string()),
            elapsed: Some(start.elapsed().as_secs_f64()),
            error: None,
        })
    }

    /// Check a single URL
    pub async fn check(&self, url: &str) -> UrlStatus {
        let head_error = match self.request(Method::HEAD, url).await {
            Ok(result)
                if result.status != Some(StatusCode::METHOD_NOT_ALLOWED.as_u16())
                    && result.status != Some(StatusCode::NOT_IMPLEMENTED.as_u16()) =>
            {
                return result;
            }
            Ok(result) => {
                debug!("HEAD not allowed for {}; retrying with GET", url);
                format!("HEAD returned status {}", result.status.unwrap_or_default())
            }
            Err(e) => {
                debug!("HEAD request failed for {}: {}; falling back to GET", url, e);
                e
            }
        };

        match self.request(Method::GET, url).await {
            Ok(result) => UrlStatus { error: Some(head_error), ..result },
            Err(e) => UrlStatus {
                url: url.to_string(),
                status: None,
                ok: false,
                method: Method::GET.to_string(),
                final_url: None,
                elapsed: None,
                error: Some(e),
            },
        }
    }

    /// Check every URL with at most `max_workers` requests in flight
    pub async fn check_all(&self, urls: &[String]) -> Vec<UrlStatus> {
        stream::iter(urls)
            .map(|url| self.check(url))
            .buffered(self.max_workers)
            .collect()
            .await
    }
}

/// Non-blank lines that are not `#` comments
pub fn parse_url_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Merge URLs from arguments, files and piped stdin. Empty is an error.
pub fn collect_urls(args: &[String], files: &[PathBuf], stdin: Option<&str>) -> Result<Vec<String>> {
    let mut urls: Vec<String> = args
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();

    for path in files {
        let text = std::fs::read_to_string(path).map_err(|e| {
            UtilkitError::invalid(format!("Failed to read URLs from {}: {}", path.display(), e))
        })?;
        urls.extend(parse_url_lines(&text));
    }

    if let Some(text) = stdin {
        urls.extend(parse_url_lines(text));
    }

    if urls.is_empty() {
        return Err(UtilkitError::invalid("No URLs provided."));
    }
    Ok(urls)
}

fn format_elapsed(elapsed: Option<f64>) -> String {
    elapsed.map_or_else(|| "-".to_string(), |e| format!("{:.3}s", e))
}

/// Aligned plain-text table of results
pub fn render_table(results: &[UrlStatus]) -> String {
    let headers = ["URL", "Status", "OK", "Method", "Elapsed", "Final URL", "Error"];
    let rows: Vec<[String; 7]> = results
        .iter()
        .map(|r| {
            [
                r.url.clone(),
                r.status.map_or_else(|| "-".to_string(), |s| s.to_string()),
                if r.ok { "yes" } else { "no" }.to_string(),
                r.method.clone(),
                format_elapsed(r.elapsed),
                r.final_url.clone().unwrap_or_else(|| "-".to_string()),
                r.error.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut lines = vec![
        format_row(&headers.map(str::to_string)[..]),
        widths.map(|w| "-".repeat(w)).join("-+-"),
    ];
    lines.extend(rows.iter().map(|row| format_row(&row[..])));
    lines.join("\n")
}
