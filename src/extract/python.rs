//! Python skeletons using tree-sitter
//!
//! Classes keep their header, docstring and a recursively skeletonized body.
//! Functions keep a one-line signature, the docstring, an effects comment
//! (returned, raised and called expressions) and a `...` placeholder.
//! Imports are collected as dependencies but not re-emitted.

use super::{ExtractError, Skeleton};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use tree_sitter::{Node, Parser};

/// First token of the diagnostic skeleton written for unparseable files
pub const PARSE_FAILURE_PREFIX: &str = "# ERROR: failed to parse";

const INDENT: &str = "    ";
const MAX_RETURNS: usize = 3;
const MAX_RAISES: usize = 3;
const MAX_CALLS: usize = 5;

/// Builds skeletons for Python source files
pub struct PythonSkeletonizer {
    parser: Parser,
}

impl PythonSkeletonizer {
    /// Create a new Python skeletonizer
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .context("Failed to set Python language")?;

        Ok(Self { parser })
    }

    /// Skeletonize Python source, failing on any syntax error
    pub fn skeletonize(&mut self, source: &str) -> Result<Skeleton, ExtractError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or(ExtractError::NoTree)?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(first_error(root));
        }
        if let Some(err) = legacy_statement(root) {
            return Err(err);
        }

        let mut walker = Walker {
            source,
            lines: Vec::new(),
            dependencies: BTreeSet::new(),
        };
        walker.visit_children(root);

        Ok(Skeleton {
            text: walker.lines.join("\n"),
            dependencies: walker.dependencies,
        })
    }
}

/// Locate the first error or missing node in document order
fn first_error(root: Node) -> ExtractError {
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        let pos = node.start_position();
        if node.is_missing() {
            return ExtractError::Missing {
                expected: node.kind().to_string(),
                line: pos.row + 1,
                column: pos.column + 1,
            };
        }
        if node.is_error() {
            return ExtractError::Syntax {
                line: pos.row + 1,
                column: pos.column + 1,
            };
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node
            .children(&mut cursor)
            .filter(|c| c.has_error())
            .collect();
        stack.extend(children.into_iter().rev());
    }

    let pos = root.start_position();
    ExtractError::Syntax {
        line: pos.row + 1,
        column: pos.column + 1,
    }
}

/// Python 2 `print`/`exec` statements, which the grammar accepts but
/// Python 3 rejects
fn legacy_statement(root: Node) -> Option<ExtractError> {
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "print_statement" | "exec_statement") {
            let pos = node.start_position();
            return Some(ExtractError::Syntax {
                line: pos.row + 1,
                column: pos.column + 1,
            });
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    None
}

struct Walker<'a> {
    source: &'a str,
    lines: Vec<String>,
    dependencies: BTreeSet<String>,
}

impl<'a> Walker<'a> {
    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Visit descendants in document order.
    ///
    /// Plain expressions can nest arbitrarily deep, so only definitions
    /// recurse; everything else is walked with an explicit stack.
    fn visit_children(&mut self, node: Node) {
        let mut stack = named_children_rev(node);

        while let Some(node) = stack.pop() {
            match node.kind() {
                "import_statement" => self.visit_import(node),
                "import_from_statement" => self.visit_import_from(node),
                "future_import_statement" => {
                    self.dependencies.insert("__future__".to_string());
                }
                "class_definition" => self.visit_class(node),
                "function_definition" => self.visit_function(node),
                _ => stack.extend(named_children_rev(node)),
            }
        }
    }

    /// `import a.b, c as d`
    fn visit_import(&mut self, node: Node) {
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            if let Some(module) = imported_name(name) {
                self.dependencies.insert(compact(self.text(module)));
            }
        }
    }

    /// `from ..pkg import a, b as c`
    ///
    /// Records the module itself plus `module.name` for every imported name,
    /// since the name may be a submodule rather than a symbol.
    fn visit_import_from(&mut self, node: Node) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };
        let module = compact(self.text(module_node));
        self.dependencies.insert(module.clone());

        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            if let Some(imported) = imported_name(name) {
                let imported = compact(self.text(imported));
                let submodule = if module.ends_with('.') {
                    format!("{}{}", module, imported)
                } else {
                    format!("{}.{}", module, imported)
                };
                self.dependencies.insert(submodule);
            }
        }
    }

    fn visit_class(&mut self, node: Node) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or("_");

        let type_params = self.type_parameters(node);

        self.lines.push(format!("class {}{}:", name, type_params));
        if let Some(doc) = self.docstring(node) {
            self.push_docstring(&doc);
        }

        if let Some(body) = node.child_by_field_name("body") {
            let outer = std::mem::take(&mut self.lines);
            self.visit_children(body);
            let inner = std::mem::replace(&mut self.lines, outer);

            for line in inner {
                if line.is_empty() {
                    self.lines.push(line);
                } else {
                    self.lines.push(format!("{}{}", INDENT, line));
                }
            }
        }

        self.lines.push(String::new());
    }

    fn visit_function(&mut self, node: Node) {
        let is_async = {
            let mut cursor = node.walk();
            let found = node.children(&mut cursor).any(|c| c.kind() == "async");
            found
        };

        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or("_");
        let type_params = self.type_parameters(node);
        let params = node
            .child_by_field_name("parameters")
            .map(|n| compact_params(self.text(n)))
            .unwrap_or_else(|| "()".to_string());
        let returns = node
            .child_by_field_name("return_type")
            .map(|n| format!(" -> {}", normalize_ws(self.text(n))))
            .unwrap_or_default();

        let prefix = if is_async { "async " } else { "" };
        self.lines
            .push(format!("{}def {}{}{}{}:", prefix, name, type_params, params, returns));

        if let Some(doc) = self.docstring(node) {
            self.push_docstring(&doc);
        }

        let effects = self.effects(node);
        if !effects.is_empty() {
            self.lines.push(format!("{}# {}", INDENT, effects));
        }

        self.lines.push(format!("{}...", INDENT));
        self.lines.push(String::new());
    }

    /// `[T, U: int]` of a generic class or function, or empty
    fn type_parameters(&self, node: Node) -> String {
        node.child_by_field_name("type_parameters")
            .map(|n| compact_params(self.text(n)))
            .unwrap_or_default()
    }

    fn push_docstring(&mut self, doc: &str) {
        let quoted = format!("\"\"\"{}\"\"\"", doc);
        for line in quoted.lines() {
            if line.is_empty() {
                self.lines.push(String::new());
            } else {
                self.lines.push(format!("{}{}", INDENT, line));
            }
        }
    }

    /// Docstring of a class or function: a lone string as first statement
    fn docstring(&self, node: Node) -> Option<String> {
        let body = node.child_by_field_name("body")?;

        let mut cursor = body.walk();
        let first = body
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment")?;
        if first.kind() != "expression_statement" || first.named_child_count() != 1 {
            return None;
        }

        let string = first.named_child(0)?;
        if string.kind() != "string" {
            return None;
        }

        let doc = clean_docstring(strip_quotes(self.text(string)));
        if doc.is_empty() {
            None
        } else {
            Some(doc)
        }
    }

    /// Summarize returns, raises and calls found anywhere in the function
    fn effects(&self, function: Node) -> String {
        let mut returns = Vec::new();
        let mut raises = Vec::new();
        let mut calls = Vec::new();

        let mut stack = vec![function];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "return_statement" => {
                    if let Some(value) = first_expression(node) {
                        push_unique(&mut returns, normalize_ws(self.text(value)));
                    }
                }
                "raise_statement" => {
                    if let Some(exc) = first_expression(node) {
                        push_unique(&mut raises, normalize_ws(self.text(exc)));
                    }
                }
                "call" => {
                    if let Some(callee) = node.child_by_field_name("function") {
                        push_unique(&mut calls, normalize_ws(self.text(callee)));
                    }
                }
                _ => {}
            }

            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        let mut parts = Vec::new();
        if !returns.is_empty() {
            parts.push(format!("RETURNS: {}", joined(&returns, MAX_RETURNS)));
        }
        if !raises.is_empty() {
            parts.push(format!("RAISES: {}", joined(&raises, MAX_RAISES)));
        }
        if !calls.is_empty() {
            parts.push(format!("CALLS: {}", joined(&calls, MAX_CALLS)));
        }

        parts.join(" | ")
    }
}

fn named_children_rev(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let mut children: Vec<Node> = node.named_children(&mut cursor).collect();
    children.reverse();
    children
}

/// The module node behind a plain or aliased import name
fn imported_name(node: Node) -> Option<Node> {
    match node.kind() {
        "aliased_import" => node.child_by_field_name("name"),
        _ => Some(node),
    }
}

fn first_expression(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment");
    found
}

fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn joined(items: &[String], limit: usize) -> String {
    items
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" | ")
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse a (possibly multi-line) parameter list onto one line
fn compact_params(text: &str) -> String {
    normalize_ws(text)
        .replace("( ", "(")
        .replace(" )", ")")
        .replace(",)", ")")
}

fn strip_quotes(literal: &str) -> &str {
    let body = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= quote.len() * 2 && body.starts_with(quote) && body.ends_with(quote) {
            return &body[quote.len()..body.len() - quote.len()];
        }
    }
    body
}

/// Strip the common indentation of continuation lines and blank edges
fn clean_docstring(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let Some((first, rest)) = lines.split_first() else {
        return String::new();
    };

    let margin = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned = vec![first.trim().to_string()];
    for line in rest {
        cleaned.push(line.get(margin..).unwrap_or("").trim_end().to_string());
    }

    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }

    cleaned.join("\n")
}
