// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! URL checker against a local mock server

use httpmock::prelude::*;
use httpmock::Method::HEAD;
use utilkit::config::UrlCheckConfig;
use utilkit::tools::web::url_status::UrlChecker;

fn checker(max_workers: usize) -> UrlChecker {
    let config = UrlCheckConfig {
        timeout_secs: 5.0,
        max_workers,
        ..UrlCheckConfig::default()
    };
    UrlChecker::new(&config).unwrap()
}

#[tokio::test]
async fn test_head_success() {
    let server = MockServer::start_async().await;
    let head = server
        .mock_async(|when, then| {
            when.method(HEAD).path("/ok");
            then.status(200);
        })
        .await;

    let result = checker(1).check(&server.url("/ok")).await;
    head.assert_async().await;
    assert_eq!(result.status, Some(200));
    assert!(result.ok);
    assert_eq!(result.method, "HEAD");
    assert_eq!(result.final_url.as_deref(), Some(server.url("/ok").as_str()));
    assert!(result.elapsed.is_some());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_head_not_allowed_falls_back_to_get() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(HEAD).path("/nohead");
            then.status(405);
        })
        .await;
    let get = server
        .mock_async(|when, then| {
            when.method(GET).path("/nohead");
            then.status(200).body("hello");
        })
        .await;

    let result = checker(1).check(&server.url("/nohead")).await;
    get.assert_async().await;
    assert_eq!(result.method, "GET");
    assert_eq!(result.status, Some(200));
    assert!(result.ok);
    assert_eq!(result.error.as_deref(), Some("HEAD returned status 405"));
}

#[tokio::test]
async fn test_client_error_is_not_ok() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(HEAD).path("/missing");
            then.status(404);
        })
        .await;

    let result = checker(1).check(&server.url("/missing")).await;
    assert_eq!(result.status, Some(404));
    assert!(!result.ok);
    assert_eq!(result.method, "HEAD");
}

#[tokio::test]
async fn test_redirect_reports_final_url() {
    let server = MockServer::start_async().await;
    let target = server.url("/new");
    server
        .mock_async(|when, then| {
            when.method(HEAD).path("/old");
            then.status(301).header("Location", target.as_str());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(HEAD).path("/new");
            then.status(200);
        })
        .await;

    let result = checker(1).check(&server.url("/old")).await;
    assert_eq!(result.status, Some(200));
    assert_eq!(result.final_url.as_deref(), Some(target.as_str()));
}

#[tokio::test]
async fn test_check_all_keeps_input_order() {
    let server = MockServer::start_async().await;
    for (path, status) in [("/a", 200), ("/b", 500), ("/c", 204)] {
        server
            .mock_async(|when, then| {
                when.method(HEAD).path(path);
                then.status(status);
            })
            .await;
    }

    let urls: Vec<String> = ["/a", "/b", "/c"].iter().map(|p| server.url(*p)).collect();
    let results = checker(2).check_all(&urls).await;

    let statuses: Vec<Option<u16>> = results.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![Some(200), Some(500), Some(204)]);
    let seen: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(seen, urls.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(results.iter().filter(|r| r.ok).count(), 2);
}

#[tokio::test]
async fn test_unreachable_host() {
    let result = checker(1).check("http://127.0.0.1:1/").await;
    assert_eq!(result.status, None);
    assert!(!result.ok);
    assert_eq!(result.method, "GET");
    assert!(result.error.is_some());
}
