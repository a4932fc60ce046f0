// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Tool browser routes, driven through the router without a socket

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use utilkit::config::IndexConfig;
use utilkit::index;
use utilkit::web::{create_router, AppState};

const HASHER_SOURCE: &str = r#"//! Hash files and verify manifests.
//!
//! Features:
//! - Several digest algorithms
//! - Manifest verification

use sha2::Sha256;
use std::path::Path;

/// Hash one file
pub fn hash_file(path: &Path, algo: &str) -> String {
    String::new()
}
"#;

const QR_SOURCE: &str = r#"//! Generate QR codes as PNG images.

use qrcode::QrCode;

pub fn render(data: &str) {}
"#;

const README: &str = r#"# utilkit

```sh
utilkit hash ./photos --relative -o SUMS
```

```sh
utilkit qr --data hello
```
"#;

fn fixture() -> (TempDir, IndexConfig) {
    let root = TempDir::new().unwrap();
    let files = root.path().join("src/tools/files");
    let qr = root.path().join("src/tools/qr");
    fs::create_dir_all(&files).unwrap();
    fs::create_dir_all(&qr).unwrap();
    fs::write(files.join("mod.rs"), "pub mod hasher;\n").unwrap();
    fs::write(files.join("hasher.rs"), HASHER_SOURCE).unwrap();
    fs::write(qr.join("generator.rs"), QR_SOURCE).unwrap();
    fs::write(root.path().join("README.md"), README).unwrap();

    let config = IndexConfig {
        root: root.path().to_path_buf(),
        source_dir: PathBuf::from("src/tools"),
        cache_path: PathBuf::from("tool_index.json"),
        readme: PathBuf::from("README.md"),
    };
    (root, config)
}

fn app(config: &IndexConfig) -> axum::Router {
    let tools = index::build_index(&config.root, &config.source_dir).unwrap();
    let state = AppState::new(tools, config.clone()).unwrap();
    create_router(Arc::new(state))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_list_tools_and_filters() {
    let (_root, config) = fixture();
    let app = app(&config);

    let (status, all) = get_json(app.clone(), "/api/tools").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, files) = get_json(app.clone(), "/api/tools?category=files").await;
    let names: Vec<&str> = files
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["hasher"]);

    let (_, everything) = get_json(app.clone(), "/api/tools?category=all").await;
    assert_eq!(everything.as_array().unwrap().len(), 2);

    // search also looks at crate dependencies
    let (_, by_dep) = get_json(app.clone(), "/api/tools?search=QRCODE").await;
    assert_eq!(by_dep.as_array().unwrap().len(), 1);
    assert_eq!(by_dep[0]["name"], "generator");

    let (_, none) = get_json(app, "/api/tools?search=nothing-matches").await;
    assert!(none.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_tool_detail_has_source_and_examples() {
    let (_root, config) = fixture();
    let (status, detail) = get_json(app(&config), "/api/tool/files/hasher").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["subcommand"], "hash");
    assert_eq!(detail["module_path"], "files::hasher");
    assert_eq!(detail["source_code"], HASHER_SOURCE);

    let examples = detail["examples"].as_array().unwrap();
    assert_eq!(examples.len(), 1);
    assert!(examples[0].as_str().unwrap().starts_with("utilkit hash"));

    let deps: Vec<&str> = detail["dependencies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_str().unwrap())
        .collect();
    assert_eq!(deps, vec!["sha2"]);
}

#[tokio::test]
async fn test_unknown_tool_is_404() {
    let (_root, config) = fixture();
    let (status, body) = get_json(app(&config), "/api/tool/files/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Tool not found");
}

#[tokio::test]
async fn test_categories_and_stats() {
    let (_root, config) = fixture();
    let app = app(&config);

    let (_, categories) = get_json(app.clone(), "/api/categories").await;
    assert_eq!(categories, serde_json::json!({ "files": 1, "qr": 1 }));

    let (status, stats) = get_json(app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_tools"], 2);
    assert_eq!(stats["categories"], 2);
    assert_eq!(stats["category_breakdown"]["files"], 1);
}

#[tokio::test]
async fn test_index_page_lists_tools() {
    let (_root, config) = fixture();
    let (status, body) = get(app(&config), "/").await;
    assert_eq!(status, StatusCode::OK);

    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("utilkit hash"));
    assert!(html.contains("2 tools"));
}

#[tokio::test]
async fn test_refresh_picks_up_new_sources() {
    let (root, config) = fixture();
    let app = app(&config);

    fs::write(
        root.path().join("src/tools/files/rename.rs"),
        "//! Batch rename files.\n\npub fn run() {}\n",
    )
    .unwrap();

    let (status, body) = get_json(app.clone(), "/api/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["tools_indexed"], 3);
    assert!(config.resolved_cache_path().exists());

    let (_, stats) = get_json(app, "/api/stats").await;
    assert_eq!(stats["total_tools"], 3);
}
