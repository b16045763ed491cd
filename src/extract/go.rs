//! Line-based skeletons for Go

use super::lines::{
    block_opener, compile_regex, elide_block, finish, push_blank, BlockTracker, Frame,
};
use super::Skeleton;
use once_cell::sync::Lazy;
use regex::Regex;

static PACKAGE: Lazy<Regex> = Lazy::new(|| compile_regex(r"^\s*package\s+\w+"));
static IMPORT: Lazy<Regex> =
    Lazy::new(|| compile_regex(r#"^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#));
static IMPORT_GROUP: Lazy<Regex> = Lazy::new(|| compile_regex(r"^\s*import\s*\(\s*$"));
static IMPORT_SPEC: Lazy<Regex> = Lazy::new(|| compile_regex(r#"^\s*(?:[\w.]+\s+)?"([^"]+)""#));
static DECLARATION: Lazy<Regex> = Lazy::new(|| compile_regex(r"^\s*(?:func|type|var|const)\b"));
static DECLARATION_GROUP: Lazy<Regex> =
    Lazy::new(|| compile_regex(r"^\s*(?:type|var|const)\s*\(\s*$"));

/// Parenthesized group being copied through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Import,
    Declaration,
}

/// Skeletonize Go source
pub(crate) fn skeletonize(content: &str) -> Skeleton {
    let mut skeleton = Skeleton::default();
    let mut out = Vec::new();
    let mut tracker = BlockTracker::default();
    let mut group: Option<Group> = None;

    for line in content.lines() {
        let trimmed = line.trim();

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

        if let Some(current) = group {
            out.push(line.to_string());
            if trimmed.starts_with(')') {
                group = None;
            } else if current == Group::Import {
                if let Some(caps) = IMPORT_SPEC.captures(line) {
                    skeleton.dependencies.insert(caps[1].to_string());
                }
            }
            continue;
        }

        if trimmed.is_empty() {
            push_blank(&mut out);
            continue;
        }

        if trimmed.starts_with("//") || PACKAGE.is_match(line) {
            out.push(line.to_string());
            continue;
        }

        if IMPORT_GROUP.is_match(line) {
            out.push(line.to_string());
            group = Some(Group::Import);
            continue;
        }

        if let Some(caps) = IMPORT.captures(line) {
            skeleton.dependencies.insert(caps[1].to_string());
            out.push(line.to_string());
            continue;
        }

        if DECLARATION_GROUP.is_match(line) {
            out.push(line.to_string());
            group = Some(Group::Declaration);
            continue;
        }

        if DECLARATION.is_match(line) {
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

        tracker.advance(line, None, &mut out);
    }

    skeleton.text = finish(out);
    skeleton
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_skeleton() {
        let code = r#"
package main

import (
    "fmt"
    "net/http"
)

// Greeter interface
type Greeter interface {
    Greet() string
}

func main() {
    fmt.Println("Hello")
}
"#;

        let skeleton = skeletonize(code);

        assert!(skeleton.dependencies.contains("fmt"));
        assert!(skeleton.dependencies.contains("net/http"));
        assert!(skeleton.text.contains("package main"));
        assert!(skeleton.text.contains("type Greeter interface { ... }"));
        assert!(skeleton.text.contains("func main() { ... }"));
        assert!(skeleton.text.contains("// Greeter interface"));
        assert!(!skeleton.text.contains("Println"));
    }

    #[test]
    fn test_aliases_groups_and_methods() {
        let code = r#"package server

import log "github.com/acme/app/internal/log"

const (
    DefaultPort = 8080
)

/* Server handles requests.
   It is safe for concurrent use. */
type Server struct {
    port int
}

func (s *Server) Start() error {
    if s.port == 0 {
        return nil
    }
    return nil
}
"#;

        let skeleton = skeletonize(code);

        assert_eq!(
            skeleton.dependencies.iter().collect::<Vec<_>>(),
            vec!["github.com/acme/app/internal/log"]
        );
        assert!(skeleton.text.contains("    DefaultPort = 8080\n)"));
        assert!(skeleton.text.contains("   It is safe for concurrent use. */"));
        assert!(skeleton.text.contains("type Server struct { ... }"));
        assert!(skeleton.text.contains("func (s *Server) Start() error { ... }"));
        assert!(!skeleton.text.contains("port int"));
    }
}
