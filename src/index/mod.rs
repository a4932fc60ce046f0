// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Tool index: metadata extracted from the tool sources with tree-sitter.
//!
//! Every `<source_dir>/<category>/<tool>.rs` file is one tool. Its `//!` docs
//! give the descriptions, its public functions the commands, and its `use`
//! declarations the external crates it depends on.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};
use tree_sitter::{Node, Parser};

use crate::config::IndexConfig;
use crate::{Result, UtilkitError};

/// Path roots that are not external crates
const LOCAL_ROOTS: &[&str] = &["std", "core", "alloc", "crate", "self", "super"];

const SHORT_DESCRIPTION_MAX: usize = 100;

/// Tool file stems whose CLI subcommand differs from the kebab-cased stem
const SUBCOMMANDS: &[(&str, &str)] = &[
    ("dedupe", "img-dedupe"),
    ("hasher", "hash"),
    ("duplicates", "dupes"),
    ("text", "pdf text"),
    ("toolbox", "pdf"),
    ("generator", "qr"),
    ("url_status", "url-check"),
    ("speaker", "speak"),
];

/// One parameter of a public function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<String>,
}

/// A public function of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandInfo {
    pub name: String,
    pub docstring: Option<String>,
    pub args: Vec<ArgInfo>,
}

/// Indexed metadata for one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub category: String,
    pub file_path: String,
    pub description: String,
    pub short_description: String,
    pub long_description: String,
    pub commands: Vec<CommandInfo>,
    pub dependencies: Vec<String>,
    pub module_path: String,
    pub subcommand: String,
}

/// What the parser pulls out of one source file
#[derive(Debug, Default)]
pub struct ParsedSource {
    pub module_doc: Option<String>,
    pub functions: Vec<CommandInfo>,
    pub dependencies: Vec<String>,
}

/// Rust source parser backed by tree-sitter
pub struct SourceParser {
    parser: Parser,
}

impl SourceParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::language())
            .map_err(|e| UtilkitError::Index(format!("Failed to set Rust language: {}", e)))?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Result<ParsedSource> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| UtilkitError::Index("Failed to parse Rust source".to_string()))?;
        let root = tree.root_node();
        let bytes = source.as_bytes();

        let mut module_doc = Vec::new();
        let mut dependencies = BTreeSet::new();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "line_comment" => {
                    let text = node_text(&child, bytes);
                    if let Some(line) = text.strip_prefix("//!") {
                        module_doc.push(strip_doc_line(line));
                    }
                }
                "use_declaration" => {
                    if let Some(arg) = child.child_by_field_name("argument") {
                        dependencies.extend(crate_roots(node_text(&arg, bytes)));
                    }
                }
                _ => {}
            }
        }

        let mut functions = Vec::new();
        collect_functions(&root, bytes, None, &mut functions);

        let module_doc = module_doc.join("\n").trim().to_string();
        Ok(ParsedSource {
            module_doc: (!module_doc.is_empty()).then_some(module_doc),
            functions,
            dependencies: dependencies.into_iter().collect(),
        })
    }
}

fn node_text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("").trim_end()
}

fn strip_doc_line(line: &str) -> String {
    line.strip_prefix(' ').unwrap_or(line).trim_end().to_string()
}

fn is_pub(node: &Node, source: &[u8]) -> bool {
    let mut cursor = node.walk();
    let public = node
        .children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier" && node_text(&c, source) == "pub");
    public
}

/// Public free functions, plus public methods of inherent impls as `Type::method`
fn collect_functions(parent: &Node, source: &[u8], owner: Option<&str>, out: &mut Vec<CommandInfo>) {
    let mut pending_doc: Vec<String> = Vec::new();
    let mut cursor = parent.walk();

    for child in parent.children(&mut cursor) {
        match child.kind() {
            "line_comment" => {
                let text = node_text(&child, source);
                if let Some(line) = text.strip_prefix("///").filter(|l| !l.starts_with('/')) {
                    pending_doc.push(strip_doc_line(line));
                }
                continue;
            }
            "attribute_item" => continue,
            "function_item" if is_pub(&child, source) => {
                if let Some(name) = child.child_by_field_name("name") {
                    let name = node_text(&name, source);
                    let doc = pending_doc.join("\n").trim().to_string();
                    out.push(CommandInfo {
                        name: match owner {
                            Some(ty) => format!("{}::{}", ty, name),
                            None => name.to_string(),
                        },
                        docstring: (!doc.is_empty()).then_some(doc),
                        args: function_args(&child, source),
                    });
                }
            }
            "impl_item" if owner.is_none() && child.child_by_field_name("trait").is_none() => {
                if let (Some(ty), Some(body)) =
                    (child.child_by_field_name("type"), child.child_by_field_name("body"))
                {
                    collect_functions(&body, source, Some(node_text(&ty, source)), out);
                }
            }
            _ => {}
        }
        pending_doc.clear();
    }
}

fn function_args(function: &Node, source: &[u8]) -> Vec<ArgInfo> {
    let Some(params) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    let args = params
        .named_children(&mut cursor)
        .filter_map(|param| match param.kind() {
            "parameter" => Some(ArgInfo {
                name: param
                    .child_by_field_name("pattern")
                    .map(|p| node_text(&p, source).to_string())
                    .unwrap_or_default(),
                ty: param
                    .child_by_field_name("type")
                    .map(|t| node_text(&t, source).to_string()),
            }),
            "self_parameter" => Some(ArgInfo {
                name: node_text(&param, source).to_string(),
                ty: None,
            }),
            _ => None,
        })
        .collect();
    args
}

/// Split on commas that are not nested inside braces
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

/// External crate names named by a `use` argument
fn crate_roots(use_arg: &str) -> Vec<String> {
    let arg = use_arg.trim().trim_start_matches("::");

    if let Some(inner) = arg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        return split_top_level(inner).into_iter().flat_map(crate_roots).collect();
    }

    let root = arg
        .split("::")
        .next()
        .and_then(|s| s.split_whitespace().next())
        .unwrap_or("")
        .trim_matches(|c: char| c == '{' || c == '}' || c == ';');

    if root.is_empty() || LOCAL_ROOTS.contains(&root) {
        Vec::new()
    } else {
        vec![root.to_string()]
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}

fn category_template(category: &str, name: &str) -> String {
    let words = name.replace('_', " ");
    let has = |needle: &str| name.contains(needle);
    match category {
        "images" if has("resize") => "Resize and scale images".to_string(),
        "images" if has("dedup") || has("duplicate") => "Find and remove duplicate images".to_string(),
        "images" => "Process and manipulate images".to_string(),
        "files" if has("duplicate") || has("dupe") => "Find and manage duplicate files".to_string(),
        "files" if has("rename") => "Batch rename files with patterns".to_string(),
        "files" if has("hash") => "Generate and verify file checksums".to_string(),
        "files" => "Manage and organize files".to_string(),
        "pdf" => "Extract and process PDF documents".to_string(),
        "qr" => "Generate QR codes".to_string(),
        "web" => "Check and process web resources".to_string(),
        "audio" => "Work with speech and audio".to_string(),
        _ => format!("Process {}", words),
    }
}

/// Short and long descriptions from the module doc, with fallbacks
pub fn describe(name: &str, category: &str, doc: Option<&str>) -> (String, String) {
    let doc = doc.unwrap_or("");
    let lines: Vec<&str> = doc.lines().map(str::trim).collect();

    let short = lines
        .iter()
        .find(|l| !l.is_empty())
        .map(|l| l.trim_end_matches('.').to_string())
        .unwrap_or_else(|| category_template(category, name));
    let short = truncate_chars(&capitalize(&short), SHORT_DESCRIPTION_MAX);

    let paragraph: Vec<&str> = lines
        .iter()
        .skip_while(|l| l.is_empty())
        .take_while(|l| {
            !l.is_empty()
                && !l.starts_with("Features:")
                && !l.starts_with("Usage:")
                && !l.starts_with("Examples:")
                && !l.starts_with('-')
                && !l.starts_with('*')
        })
        .copied()
        .collect();
    let mut long = paragraph.join(" ");

    if long.chars().count() < 50 {
        let features: Vec<&str> = lines
            .iter()
            .skip_while(|l| !l.contains("Features:"))
            .skip(1)
            .filter_map(|l| l.strip_prefix('-').or_else(|| l.strip_prefix('*')))
            .map(str::trim)
            .filter(|f| !f.is_empty() && f.chars().count() < 100)
            .take(3)
            .collect();

        if !features.is_empty() {
            long = format!("{}. {}", short, features.join("; "));
        } else if long.is_empty() {
            long = format!(
                "{}. {} utility for {} operations.",
                short,
                capitalize(&name.replace('_', " ")),
                category
            );
        }
    }

    (short, capitalize(&long))
}

/// CLI subcommand that runs the tool
pub fn subcommand_for(name: &str) -> String {
    SUBCOMMANDS
        .iter()
        .find(|(stem, _)| *stem == name)
        .map(|(_, cmd)| cmd.to_string())
        .unwrap_or_else(|| name.replace('_', "-"))
}

fn title_words(name: &str) -> String {
    name.split('_').map(capitalize).collect::<Vec<_>>().join(" ")
}

/// Metadata for one tool file. `mod.rs` is not a tool.
pub fn extract_tool_info(
    parser: &mut SourceParser,
    path: &Path,
    category: &str,
    root: &Path,
) -> Result<Option<ToolInfo>> {
    let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
        return Ok(None);
    };
    if name == "mod" {
        return Ok(None);
    }

    let source = std::fs::read_to_string(path)?;
    let parsed = parser.parse(&source)?;
    let (short_description, long_description) = describe(name, category, parsed.module_doc.as_deref());

    Ok(Some(ToolInfo {
        name: name.to_string(),
        category: category.to_string(),
        file_path: path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/"),
        description: parsed.module_doc.unwrap_or_else(|| title_words(name)),
        short_description,
        long_description,
        commands: parsed.functions,
        dependencies: parsed.dependencies,
        module_path: format!("{}::{}", category, name),
        subcommand: subcommand_for(name),
    }))
}

fn sorted_entries(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

/// Scan `root/source_dir/<category>/*.rs`
pub fn build_index(root: &Path, source_dir: &Path) -> Result<Vec<ToolInfo>> {
    let tools_dir = root.join(source_dir);
    if !tools_dir.is_dir() {
        return Err(UtilkitError::Index(format!(
            "Tool directory not found: {}",
            tools_dir.display()
        )));
    }

    let mut parser = SourceParser::new()?;
    let mut tools = Vec::new();

    for category_dir in sorted_entries(&tools_dir)?.into_iter().filter(|p| p.is_dir()) {
        let Some(category) = category_dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };

        for file in sorted_entries(&category_dir)? {
            if file.extension().and_then(|e| e.to_str()) != Some("rs") {
                continue;
            }
            match extract_tool_info(&mut parser, &file, &category, root) {
                Ok(Some(tool)) => {
                    info!("Indexed: {} ({})", tool.name, category);
                    tools.push(tool);
                }
                Ok(None) => debug!("Skipping {}", file.display()),
                Err(e) => warn!("Could not index {}: {}", file.display(), e),
            }
        }
    }

    info!("Total tools indexed: {}", tools.len());
    Ok(tools)
}

/// Write the index as pretty JSON, creating parent directories
pub fn save_index(tools: &[ToolInfo], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(tools)?)?;
    info!("Index saved to: {}", path.display());
    Ok(())
}

pub fn load_index(path: &Path) -> Result<Vec<ToolInfo>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| UtilkitError::Index(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Rescan the sources and overwrite the cache
pub fn rebuild(config: &IndexConfig) -> Result<Vec<ToolInfo>> {
    let tools = build_index(&config.root, &config.source_dir)?;
    save_index(&tools, &config.resolved_cache_path())?;
    Ok(tools)
}

/// Load the cached index, building it first when missing
pub fn load_or_build(config: &IndexConfig) -> Result<Vec<ToolInfo>> {
    let cache = config.resolved_cache_path();
    if cache.exists() {
        let tools = load_index(&cache)?;
        info!("Loaded {} tools", tools.len());
        Ok(tools)
    } else {
        info!("Index not found, creating...");
        rebuild(config)
    }
}

/// Number of tools per category
pub fn category_counts(tools: &[ToolInfo]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for tool in tools {
        *counts.entry(tool.category.clone()).or_insert(0) += 1;
    }
    counts
}
