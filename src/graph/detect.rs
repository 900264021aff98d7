use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::model::{EdgeKind, GraphEdge, GraphNode, NodeType};
use super::resolve::FileIndex;
use crate::util::{file_label, node_id};

pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];
pub const MARKUP_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];

static SOURCE_IMPORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?m)^\s*import\s+(?:type\s+)?[^'";]*?\sfrom\s*['"]([^'"]+)['"]"#,
        r#"(?m)^\s*import\s*['"]([^'"]+)['"]"#,
        r#"(?m)^\s*export\s+[^'";]*?\sfrom\s*['"]([^'"]+)['"]"#,
        r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
        r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static SOURCE_DECLARATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*[(<]",
        r"(?m)^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*(?::[^=]+)?=>|[A-Za-z_$][\w$]*\s*=>)",
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static WIKI_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]\|#]+)(?:#[^\]\|]*)?(?:\|[^\]]*)?\]\]").ok());

static MARKDOWN_LINK: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).ok()
});

/// A file handed to the builder. `contents` is `None` when the file is not
/// on the text whitelist or could not be read as UTF-8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: Option<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, contents: Option<String>) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Detection {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    SourceLike,
    MarkupLike,
    Generic,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Self {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return Self::Generic;
        };
        let extension = extension.to_ascii_lowercase();

        if SOURCE_EXTENSIONS.contains(&extension.as_str()) {
            Self::SourceLike
        } else if MARKUP_EXTENSIONS.contains(&extension.as_str()) {
            Self::MarkupLike
        } else {
            Self::Generic
        }
    }

    /// Whether the scanner should read this file's contents.
    pub fn wants_contents(self) -> bool {
        !matches!(self, Self::Generic)
    }

    pub fn node_type(self) -> NodeType {
        match self {
            Self::SourceLike => NodeType::SourceFile,
            Self::MarkupLike => NodeType::MarkupFile,
            Self::Generic => NodeType::Other,
        }
    }

    fn probe_extensions(self) -> &'static [&'static str] {
        match self {
            Self::SourceLike => SOURCE_EXTENSIONS,
            Self::MarkupLike => MARKUP_EXTENSIONS,
            Self::Generic => &[],
        }
    }

    pub fn detect(self, path: &Path, contents: Option<&str>, index: &FileIndex) -> Detection {
        let file_id = node_id(path);
        let mut detection = Detection {
            nodes: vec![
                GraphNode::new(file_id.clone(), file_label(path), self.node_type())
                    .with_origin(path),
            ],
            edges: Vec::new(),
        };

        let Some(contents) = contents else {
            return detection;
        };

        match self {
            Self::SourceLike => {
                detect_declarations(path, &file_id, contents, &mut detection);
                detect_imports(path, &file_id, contents, index, &mut detection);
            }
            Self::MarkupLike => detect_links(path, &file_id, contents, index, &mut detection),
            Self::Generic => {}
        }

        detection
    }
}

fn detect_declarations(path: &Path, file_id: &str, contents: &str, detection: &mut Detection) {
    for pattern in SOURCE_DECLARATION_PATTERNS.iter() {
        for captures in pattern.captures_iter(contents) {
            let Some(name) = captures.get(1).map(|m| m.as_str()) else {
                continue;
            };
            let id = format!("{file_id}::{name}");
            detection.nodes.push(
                GraphNode::new(id.clone(), format!("{name}()"), NodeType::FunctionDeclaration)
                    .with_origin(path)
                    .with_parent(file_id),
            );
            detection
                .edges
                .push(GraphEdge::new(file_id, id, EdgeKind::Contains));
        }
    }
}

fn detect_imports(
    path: &Path,
    file_id: &str,
    contents: &str,
    index: &FileIndex,
    detection: &mut Detection,
) {
    for pattern in SOURCE_IMPORT_PATTERNS.iter() {
        for captures in pattern.captures_iter(contents) {
            let Some(specifier) = captures.get(1).map(|m| m.as_str()) else {
                continue;
            };
            // Bare package specifiers never name a workspace file.
            if !(specifier.starts_with('.') || specifier.starts_with('/')) {
                continue;
            }

            match index.resolve_relative(path, specifier, FileKind::SourceLike.probe_extensions()) {
                Some(target) => {
                    detection
                        .edges
                        .push(GraphEdge::new(file_id, node_id(&target), EdgeKind::Import));
                }
                None => debug!("unresolved import {specifier:?} in {}", path.display()),
            }
        }
    }
}

fn detect_links(
    path: &Path,
    file_id: &str,
    contents: &str,
    index: &FileIndex,
    detection: &mut Detection,
) {
    if let Some(wiki) = WIKI_LINK.as_ref() {
        for captures in wiki.captures_iter(contents) {
            let Some(name) = captures.get(1).map(|m| m.as_str().trim()) else {
                continue;
            };
            match index.resolve_basename(name) {
                Some(target) => detection
                    .edges
                    .push(GraphEdge::new(file_id, node_id(&target), EdgeKind::Link)),
                None => debug!("unresolved wiki link [[{name}]] in {}", path.display()),
            }
        }
    }

    if let Some(markdown) = MARKDOWN_LINK.as_ref() {
        for captures in markdown.captures_iter(contents) {
            let Some(raw) = captures.get(1).map(|m| m.as_str()) else {
                continue;
            };
            let Some(target) = markdown_link_target(raw) else {
                continue;
            };

            let extensions = FileKind::MarkupLike.probe_extensions();
            match index.resolve_relative(path, &target, extensions) {
                Some(resolved) => detection
                    .edges
                    .push(GraphEdge::new(file_id, node_id(&resolved), EdgeKind::Link)),
                None => debug!("unresolved link {raw:?} in {}", path.display()),
            }
        }
    }
}

/// Strips fragments and queries from a markdown link target; `None` for
/// external, mail and same-document links.
fn markdown_link_target(raw: &str) -> Option<String> {
    if raw.starts_with('#') || raw.starts_with("mailto:") || raw.contains("://") {
        return None;
    }

    let end = raw.find(['#', '?']).unwrap_or(raw.len());
    let target = raw[..end].replace("%20", " ");
    if target.is_empty() { None } else { Some(target) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(paths: &[&str]) -> FileIndex {
        FileIndex::new(paths.iter().map(Path::new))
    }

    fn edge_targets(detection: &Detection, kind: EdgeKind) -> Vec<&str> {
        detection
            .edges
            .iter()
            .filter(|edge| edge.kind == kind)
            .map(|edge| edge.target.as_str())
            .collect()
    }

    #[test]
    fn kinds_follow_extension_table() {
        assert_eq!(FileKind::from_path(Path::new("/a/b.tsx")), FileKind::SourceLike);
        assert_eq!(FileKind::from_path(Path::new("/a/B.MD")), FileKind::MarkupLike);
        assert_eq!(FileKind::from_path(Path::new("/a/c.rs")), FileKind::Generic);
        assert_eq!(FileKind::from_path(Path::new("/a/Makefile")), FileKind::Generic);
    }

    #[test]
    fn source_detector_emits_imports_and_top_level_functions() {
        let files = index(&["/p/main.ts", "/p/util.ts", "/p/api/index.js"]);
        let contents = r#"
import { helper } from './util';
import type { Shape } from "./util";
import {
  a,
  b,
} from './api';
import React from 'react';
const lazy = () => import('./util');
export function start(config) {
  function nested() {}
}
export default async function boot() {}
const handler = async (req) => req;
"#;

        let detection =
            FileKind::SourceLike.detect(Path::new("/p/main.ts"), Some(contents), &files);

        let imports = edge_targets(&detection, EdgeKind::Import);
        assert!(imports.contains(&"/p/util.ts"));
        assert!(imports.contains(&"/p/api/index.js"));
        assert!(!imports.iter().any(|target| target.contains("react")));

        let functions = detection
            .nodes
            .iter()
            .filter(|node| node.node_type == NodeType::FunctionDeclaration)
            .map(|node| node.id.as_str())
            .collect::<Vec<_>>();
        assert!(functions.contains(&"/p/main.ts::start"));
        assert!(functions.contains(&"/p/main.ts::boot"));
        assert!(functions.contains(&"/p/main.ts::handler"));
        assert!(functions.contains(&"/p/main.ts::lazy"));
        assert!(!functions.iter().any(|id| id.ends_with("::nested")));

        let function = detection
            .nodes
            .iter()
            .find(|node| node.id == "/p/main.ts::start")
            .unwrap();
        assert_eq!(function.parent.as_deref(), Some("/p/main.ts"));
        assert_eq!(function.label, "start()");
        assert_eq!(edge_targets(&detection, EdgeKind::Contains).len(), functions.len());
    }

    #[test]
    fn markup_detector_resolves_wiki_and_markdown_links() {
        let files = index(&[
            "/notes/index.md",
            "/notes/Project Plan.md",
            "/notes/guide/setup.md",
            "/notes/img/diagram.svg",
        ]);
        let contents = "See [[project plan|the plan]] and [[Setup#install]].\n\
             [guide](guide/setup.md#step-2) ![d](img/diagram.svg) \
             [web](https://example.com) [top](#top) [[Nowhere]] [x](./Project%20Plan)";

        let detection =
            FileKind::MarkupLike.detect(Path::new("/notes/index.md"), Some(contents), &files);

        assert_eq!(detection.nodes.len(), 1);
        assert_eq!(detection.nodes[0].node_type, NodeType::MarkupFile);

        let links = edge_targets(&detection, EdgeKind::Link);
        assert_eq!(
            links,
            vec![
                "/notes/Project Plan.md",
                "/notes/guide/setup.md",
                "/notes/guide/setup.md",
                "/notes/img/diagram.svg",
                "/notes/Project Plan.md",
            ]
        );
    }

    #[test]
    fn missing_contents_yield_only_the_file_node() {
        let files = index(&["/p/main.ts"]);
        let detection = FileKind::SourceLike.detect(Path::new("/p/main.ts"), None, &files);
        assert_eq!(detection.nodes.len(), 1);
        assert!(detection.edges.is_empty());
    }

    #[test]
    fn generic_files_get_one_other_node() {
        let files = index(&["/p/Cargo.toml"]);
        let detection =
            FileKind::Generic.detect(Path::new("/p/Cargo.toml"), Some("[package]"), &files);
        assert_eq!(detection.nodes.len(), 1);
        assert_eq!(detection.nodes[0].node_type, NodeType::Other);
        assert_eq!(detection.nodes[0].label, "Cargo.toml");
    }
}
