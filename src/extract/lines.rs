//! Shared helpers for the line-based skeletonizers
//!
//! These scanners are deliberately approximate: braces are counted per line
//! outside of string literals and `//` comments, so nested braces inside
//! template strings or multi-line expressions can confuse them.

use regex::Regex;

/// Compile a regex literal known to be valid
pub(crate) fn compile_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid regex literal {pattern}: {err}"))
}

/// An open brace block
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    /// Block whose members are still emitted (class or namespace body)
    Container { indent: String },
    /// Elided block (function body, interface body, object literal, ...)
    Body,
}

/// Tracks open blocks and block comments across lines
#[derive(Debug, Default)]
pub(crate) struct BlockTracker {
    frames: Vec<Frame>,
    in_block_comment: bool,
}

impl BlockTracker {
    /// True when the current line sits inside an elided block
    pub fn in_body(&self) -> bool {
        self.frames.iter().any(|f| *f == Frame::Body)
    }

    /// True when the innermost open block is a container
    pub fn in_container(&self) -> bool {
        matches!(self.frames.last(), Some(Frame::Container { .. }))
    }

    /// Consume a line that belongs to a block comment.
    ///
    /// Returns true if the line started or continued a block comment.
    pub fn comment_line(&mut self, trimmed: &str) -> bool {
        if self.in_block_comment {
            if trimmed.contains("*/") {
                self.in_block_comment = false;
            }
            return true;
        }

        if trimmed.starts_with("/*") {
            self.in_block_comment = !trimmed.contains("*/");
            return true;
        }

        false
    }

    /// Apply the brace balance of `line`.
    ///
    /// When the line opens blocks, the first new frame is `opener` (or a body
    /// frame) and the rest are bodies. Closing a container emits its `}`.
    pub fn advance(&mut self, line: &str, opener: Option<Frame>, out: &mut Vec<String>) {
        let balance = brace_balance(line);

        if balance > 0 {
            self.frames.push(opener.unwrap_or(Frame::Body));
            for _ in 1..balance {
                self.frames.push(Frame::Body);
            }
        } else {
            for _ in 0..(-balance) {
                match self.frames.pop() {
                    Some(Frame::Container { indent }) => out.push(format!("{}}}", indent)),
                    Some(Frame::Body) => {}
                    None => break,
                }
            }
        }
    }
}

/// Byte offsets of `{` and `}` outside of strings and line comments
fn code_braces(line: &str) -> Vec<(usize, char)> {
    let mut braces = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev = '\0';

    for (idx, c) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '/' if prev == '/' => break,
            '{' | '}' => braces.push((idx, c)),
            _ => {}
        }
        prev = c;
    }

    braces
}

/// Opened minus closed braces on this line
pub(crate) fn brace_balance(line: &str) -> i32 {
    code_braces(line)
        .iter()
        .map(|(_, c)| if *c == '{' { 1 } else { -1 })
        .sum()
}

/// Offset of the outermost brace left open at the end of the line
pub(crate) fn block_opener(line: &str) -> Option<usize> {
    let mut open = Vec::new();
    for (idx, c) in code_braces(line) {
        if c == '{' {
            open.push(idx);
        } else {
            open.pop();
        }
    }
    open.first().copied()
}

/// `sig {` becomes `sig { ... }`, keeping the original indentation
pub(crate) fn elide_block(line: &str, opener: usize) -> String {
    format!("{} {{ ... }}", line[..opener].trim_end())
}

/// `sig {` becomes `sig {`, trimmed of anything after the brace
pub(crate) fn open_block(line: &str, opener: usize) -> String {
    format!("{} {{", line[..opener].trim_end())
}

/// Leading whitespace of a line
pub(crate) fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Append a blank separator, collapsing runs of blank lines
pub(crate) fn push_blank(out: &mut Vec<String>) {
    if out.last().is_some_and(|l| !l.is_empty()) {
        out.push(String::new());
    }
}

/// Join emitted lines, dropping a trailing separator
pub(crate) fn finish(mut out: Vec<String>) -> String {
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brace_balance_ignores_strings_and_comments() {
        assert_eq!(brace_balance("function f() {"), 1);
        assert_eq!(brace_balance("const s = '{';"), 0);
        assert_eq!(brace_balance("} else {"), 0);
        assert_eq!(brace_balance("x(); // }"), 0);
        assert_eq!(brace_balance("}"), -1);
    }

    #[test]
    fn test_block_opener_skips_balanced_braces() {
        let line = "function f(a: { x: number }) {";
        let idx = block_opener(line).unwrap();
        assert_eq!(elide_block(line, idx), "function f(a: { x: number }) { ... }");

        assert_eq!(block_opener("const o = { a: 1 };"), None);
    }

    #[test]
    fn test_container_close_is_emitted() {
        let mut tracker = BlockTracker::default();
        let mut out = Vec::new();

        tracker.advance(
            "  class A {",
            Some(Frame::Container {
                indent: "  ".to_string(),
            }),
            &mut out,
        );
        assert!(tracker.in_container());

        tracker.advance("    run() {", None, &mut out);
        assert!(tracker.in_body());

        tracker.advance("    }", None, &mut out);
        tracker.advance("  }", None, &mut out);
        assert_eq!(out, vec!["  }".to_string()]);
        assert!(!tracker.in_body());
    }
}
