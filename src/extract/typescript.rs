//! Line-based skeletons for TypeScript and JavaScript
//!
//! Imports and comments are kept verbatim. Declarations that open a block
//! are cut to `signature { ... }`, except classes and namespaces, whose
//! method signatures are kept inside the braces.

use super::lines::{
    block_opener, compile_regex, elide_block, finish, indentation, open_block, push_blank,
    BlockTracker, Frame,
};
use super::Skeleton;
use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    compile_regex(r#"^\s*import\s+(?:type\s+)?(?:[\w*${}\s,]+?\s+from\s+)?['"]([^'"]+)['"]"#)
});
static EXPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    compile_regex(
        r#"^\s*export\s+(?:type\s+)?(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s+from\s+['"]([^'"]+)['"]"#,
    )
});
static FROM_CLAUSE: Lazy<Regex> =
    Lazy::new(|| compile_regex(r#"\bfrom\s+['"]([^'"]+)['"]"#));
static REQUIRE: Lazy<Regex> =
    Lazy::new(|| compile_regex(r#"\b(?:require|import)\s*\(\s*['"]([^'"]+)['"]\s*\)"#));
static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    compile_regex(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:async\s+)?(function\*?|class|interface|type|enum|namespace|module|const|let|var)(?:\s|\(|$)",
    )
});
static MEMBER: Lazy<Regex> = Lazy::new(|| {
    compile_regex(
        r"^\s*(?:(?:public|private|protected|static|readonly|abstract|override|async|get|set)\s+)*\*?(#?[A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\(",
    )
});

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "with", "return", "function",
];

fn is_container(keyword: &str) -> bool {
    matches!(keyword, "class" | "namespace" | "module")
}

/// Skeletonize TypeScript or JavaScript source
pub(crate) fn skeletonize(content: &str) -> Skeleton {
    let mut skeleton = Skeleton::default();
    let mut out = Vec::new();
    let mut tracker = BlockTracker::default();
    let mut pending_import = false;

    for line in content.lines() {
        let trimmed = line.trim();

        // Lazy requires inside bodies are still dependencies
        for caps in REQUIRE.captures_iter(line) {
            skeleton.dependencies.insert(caps[1].to_string());
        }

        let visible = !tracker.in_body();
        if tracker.comment_line(trimmed) {
            if visible {
                out.push(line.to_string());
            }
            continue;
        }

        if !visible {
            tracker.advance(line, None, &mut out);
            continue;
        }

        if pending_import {
            out.push(line.to_string());
            if let Some(caps) = FROM_CLAUSE.captures(line) {
                skeleton.dependencies.insert(caps[1].to_string());
                pending_import = false;
            } else if trimmed.ends_with(';') {
                pending_import = false;
            }
            continue;
        }

        if trimmed.is_empty() {
            if !tracker.in_container() {
                push_blank(&mut out);
            }
            continue;
        }

        if trimmed.starts_with("//") {
            out.push(line.to_string());
            continue;
        }

        if let Some(caps) = IMPORT.captures(line).or_else(|| EXPORT_FROM.captures(line)) {
            skeleton.dependencies.insert(caps[1].to_string());
            out.push(line.to_string());
            continue;
        }

        // `import {` or `export {` spanning several lines
        let open_list = trimmed.ends_with('{') || trimmed.ends_with(',');
        if trimmed.starts_with("import ")
            || trimmed.starts_with("import{")
            || (open_list && (trimmed.starts_with("export {") || trimmed.starts_with("export type {")))
        {
            out.push(line.to_string());
            pending_import = !trimmed.ends_with(';');
            continue;
        }

        if let Some(caps) = DECLARATION.captures(line) {
            let keyword = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            match block_opener(line) {
                Some(idx) if is_container(keyword) => {
                    out.push(open_block(line, idx));
                    let frame = Frame::Container {
                        indent: indentation(line).to_string(),
                    };
                    tracker.advance(line, Some(frame), &mut out);
                }
                Some(idx) => {
                    out.push(elide_block(line, idx));
                    tracker.advance(line, Some(Frame::Body), &mut out);
                }
                None => {
                    out.push(line.to_string());
                    tracker.advance(line, None, &mut out);
                }
            }
            continue;
        }

        if tracker.in_container() {
            let member = MEMBER
                .captures(line)
                .filter(|caps| !CONTROL_KEYWORDS.contains(&&caps[1]));
            if member.is_some() {
                match block_opener(line) {
                    Some(idx) => {
                        out.push(elide_block(line, idx));
                        tracker.advance(line, Some(Frame::Body), &mut out);
                    }
                    None => {
                        out.push(line.to_string());
                        tracker.advance(line, None, &mut out);
                    }
                }
                continue;
            }
        }

        tracker.advance(line, None, &mut out);
    }

    skeleton.text = finish(out);
    skeleton
}
