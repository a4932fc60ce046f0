// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web UI for browsing the tool index

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{AppConfig, IndexConfig};
use crate::index::{self, category_counts, ToolInfo};
use crate::{Result, UtilkitError};

/// Shared application state
pub struct AppState {
    pub tools: RwLock<Vec<ToolInfo>>,
    pub index: IndexConfig,
    templates: Environment<'static>,
}

impl AppState {
    pub fn new(tools: Vec<ToolInfo>, index: IndexConfig) -> Result<Self> {
        let mut templates = Environment::new();
        templates
            .add_template("index.html", INDEX_TEMPLATE)
            .map_err(|e| UtilkitError::Server(format!("Template error: {}", e)))?;
        Ok(Self { tools: RwLock::new(tools), index, templates })
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Pages
        .route("/", get(index_page))
        // API endpoints
        .route("/api/tools", get(api_get_tools))
        .route("/api/tool/:category/:name", get(api_get_tool))
        .route("/api/categories", get(api_get_categories))
        .route("/api/stats", get(api_get_stats))
        .route("/api/refresh", get(api_refresh))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

// === Page Handlers ===

#[derive(Serialize)]
struct CategoryView<'a> {
    name: &'a str,
    tools: Vec<&'a ToolInfo>,
}

async fn index_page(State(state): State<Arc<AppState>>) -> Response {
    let tools = state.tools.read().await;

    let mut grouped: BTreeMap<&str, Vec<&ToolInfo>> = BTreeMap::new();
    for tool in tools.iter() {
        grouped.entry(tool.category.as_str()).or_default().push(tool);
    }
    let categories: Vec<CategoryView> = grouped
        .into_iter()
        .map(|(name, tools)| CategoryView { name, tools })
        .collect();

    let rendered = state
        .templates
        .get_template("index.html")
        .and_then(|t| t.render(context! { categories => categories, total => tools.len() }));

    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render index page: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page")
        }
    }
}

// === API Handlers ===

#[derive(Deserialize)]
struct ToolsQuery {
    category: Option<String>,
    search: Option<String>,
}

/// Category filter (`all` or empty means none), then a case-insensitive
/// search over name, description and dependencies
pub fn filter_tools<'a>(tools: &'a [ToolInfo], category: Option<&str>, search: Option<&str>) -> Vec<&'a ToolInfo> {
    let category = category.filter(|c| !c.is_empty() && *c != "all");
    let search = search.map(str::to_lowercase).filter(|s| !s.is_empty());

    tools
        .iter()
        .filter(|t| category.map_or(true, |c| t.category == c))
        .filter(|t| {
            search.as_deref().map_or(true, |s| {
                t.name.to_lowercase().contains(s)
                    || t.description.to_lowercase().contains(s)
                    || t.dependencies.iter().any(|d| d.to_lowercase().contains(s))
            })
        })
        .collect()
}

async fn api_get_tools(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ToolsQuery>,
) -> Json<Vec<ToolInfo>> {
    let tools = state.tools.read().await;
    let filtered = filter_tools(&tools, query.category.as_deref(), query.search.as_deref());
    Json(filtered.into_iter().cloned().collect())
}

/// README code blocks that mention the tool or its subcommand
pub fn extract_examples(readme: &str, tool: &ToolInfo) -> Vec<String> {
    let invocation = format!("utilkit {}", tool.subcommand);
    let mut examples = Vec::new();
    let mut block: Option<Vec<&str>> = None;

    for line in readme.lines() {
        if line.starts_with("```") {
            match block.take() {
                Some(lines) => {
                    let text = lines.join("\n");
                    if text.contains(&tool.name) || text.contains(&invocation) {
                        examples.push(text.trim().to_string());
                    }
                }
                None => block = Some(Vec::new()),
            }
        } else if let Some(lines) = block.as_mut() {
            lines.push(line);
        }
    }
    examples
}

async fn api_get_tool(
    State(state): State<Arc<AppState>>,
    Path((category, name)): Path<(String, String)>,
) -> Response {
    let tool = {
        let tools = state.tools.read().await;
        tools
            .iter()
            .find(|t| t.category == category && t.name == name)
            .cloned()
    };
    let Some(tool) = tool else {
        return error_response(StatusCode::NOT_FOUND, "Tool not found");
    };

    let source_code = tokio::fs::read_to_string(state.index.root.join(&tool.file_path))
        .await
        .unwrap_or_default();
    let examples = match tokio::fs::read_to_string(state.index.resolved_readme()).await {
        Ok(readme) => extract_examples(&readme, &tool),
        Err(_) => Vec::new(),
    };

    match serde_json::to_value(&tool) {
        Ok(Value::Object(mut detail)) => {
            detail.insert("source_code".to_string(), Value::String(source_code));
            detail.insert("examples".to_string(), json!(examples));
            Json(Value::Object(detail)).into_response()
        }
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to serialize tool"),
    }
}

async fn api_get_categories(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, usize>> {
    let tools = state.tools.read().await;
    Json(category_counts(&tools))
}

#[derive(Serialize)]
struct StatsResponse {
    total_tools: usize,
    categories: usize,
    category_breakdown: BTreeMap<String, usize>,
}

async fn api_get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let tools = state.tools.read().await;
    let categories: BTreeSet<&str> = tools.iter().map(|t| t.category.as_str()).collect();
    Json(StatsResponse {
        total_tools: tools.len(),
        categories: categories.len(),
        category_breakdown: category_counts(&tools),
    })
}

async fn api_refresh(State(state): State<Arc<AppState>>) -> Response {
    let config = state.index.clone();
    let rebuilt = tokio::task::spawn_blocking(move || index::rebuild(&config)).await;

    match rebuilt {
        Ok(Ok(tools)) => {
            let count = tools.len();
            *state.tools.write().await = tools;
            info!("Index refreshed: {} tools", count);
            Json(json!({ "status": "success", "tools_indexed": count })).into_response()
        }
        Ok(Err(e)) => {
            error!("Index refresh failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!("Index refresh task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Index refresh failed")
        }
    }
}

// === Template ===

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>utilkit tools</title>
    <style>
        :root {
            --bg-primary: #1a1a2e;
            --bg-secondary: #16213e;
            --bg-card: #0f3460;
            --text-primary: #e8e8e8;
            --text-secondary: #a0a0a0;
            --accent: #e94560;
            --border: #2a2a4a;
        }
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }
        .container { max-width: 1200px; margin: 0 auto; padding: 20px; }
        nav {
            background: var(--bg-secondary);
            padding: 15px 20px;
            border-bottom: 1px solid var(--border);
        }
        nav .logo { font-size: 1.5em; font-weight: bold; color: var(--accent); text-decoration: none; }
        nav .count { color: var(--text-secondary); margin-left: 20px; }
        .card {
            background: var(--bg-card);
            border-radius: 12px;
            padding: 20px;
            margin-bottom: 20px;
        }
        .card h2 { margin-bottom: 15px; color: var(--accent); text-transform: capitalize; }
        table { width: 100%; border-collapse: collapse; }
        th, td { padding: 10px; text-align: left; border-bottom: 1px solid var(--border); }
        th { color: var(--text-secondary); font-weight: 500; }
        code { color: var(--accent); }
        .dep {
            display: inline-block;
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            padding: 2px 8px;
            border-radius: 6px;
            font-size: 0.8em;
            margin: 2px;
        }
    </style>
</head>
<body>
    <nav>
        <a href="/" class="logo">utilkit</a>
        <span class="count">{{ total }} tools</span>
    </nav>
    <main class="container">
    {% for category in categories %}
        <div class="card">
            <h2>{{ category.name }}</h2>
            <table>
                <tr><th>Tool</th><th>Command</th><th>Description</th><th>Crates</th></tr>
                {% for tool in category.tools %}
                <tr>
                    <td><a href="/api/tool/{{ tool.category }}/{{ tool.name }}">{{ tool.name }}</a></td>
                    <td><code>utilkit {{ tool.subcommand }}</code></td>
                    <td title="{{ tool.long_description }}">{{ tool.short_description }}</td>
                    <td>{% for dep in tool.dependencies %}<span class="dep">{{ dep }}</span>{% endfor %}</td>
                </tr>
                {% endfor %}
            </table>
        </div>
    {% else %}
        <div class="card"><p>No tools indexed yet.</p></div>
    {% endfor %}
    </main>
</body>
</html>"#;

/// Start the web server over an already loaded index
pub async fn start_server(config: AppConfig, tools: Vec<ToolInfo>) -> Result<()> {
    let state = Arc::new(AppState::new(tools, config.index.clone())?);

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Tool browser available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router)
        .await
        .map_err(|e| UtilkitError::Server(format!("Server error: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, category: &str, deps: &[&str]) -> ToolInfo {
        ToolInfo {
            name: name.to_string(),
            category: category.to_string(),
            file_path: format!("src/tools/{}/{}.rs", category, name),
            description: format!("{} tool", name),
            short_description: String::new(),
            long_description: String::new(),
            commands: Vec::new(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            module_path: format!("{}::{}", category, name),
            subcommand: crate::index::subcommand_for(name),
        }
    }

    #[test]
    fn test_filter_tools() {
        let tools = vec![
            tool("carve", "images", &["image"]),
            tool("hasher", "files", &["sha2", "blake3"]),
            tool("generator", "qr", &["qrcode", "image"]),
        ];

        assert_eq!(filter_tools(&tools, Some("all"), None).len(), 3);
        assert_eq!(filter_tools(&tools, Some("files"), None)[0].name, "hasher");
        assert_eq!(filter_tools(&tools, None, Some("IMAGE")).len(), 2);
        assert_eq!(filter_tools(&tools, Some("qr"), Some("image")).len(), 1);
        assert_eq!(filter_tools(&tools, None, Some("Blake")).len(), 1);
        assert!(filter_tools(&tools, Some("audio"), None).is_empty());
    }

    #[test]
    fn test_extract_examples() {
        let readme = "# utilkit\n\n```bash\nutilkit hash ./photos --output SHA256SUMS\n```\n\ntext\n\n```bash\nutilkit carve in.jpg --width 800\n```\n";
        let hasher = tool("hasher", "files", &[]);
        assert_eq!(
            extract_examples(readme, &hasher),
            vec!["utilkit hash ./photos --output SHA256SUMS"]
        );
        let carve = tool("carve", "images", &[]);
        assert_eq!(extract_examples(readme, &carve).len(), 1);
        let speaker = tool("speaker", "audio", &[]);
        assert!(extract_examples(readme, &speaker).is_empty());
    }
}
