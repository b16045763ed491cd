//! Dependency name resolution
//!
//! Maps a raw import name, as written in the importing file, to a
//! repository-relative file path. Resolution is a pure existence check on
//! the filesystem: the target file is never parsed.

use crate::extract::Language;
use std::path::{Path, PathBuf};

/// Suffixes tried for TypeScript / JavaScript imports, in order
const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Resolves raw dependency names against a repository root
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    root: PathBuf,
    /// Module path declared in `go.mod`, stripped from Go import paths
    go_module: Option<String>,
}

impl DependencyResolver {
    /// Create a resolver rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let go_module = read_go_module(&root);

        Self { root, go_module }
    }

    /// Resolve `raw_name` imported from `importing_file` (relative, `/`-separated).
    ///
    /// Leading dots are relative to the importing file's directory: one dot is
    /// the same directory, each extra dot one level up, never above the root.
    /// Names without leading dots are rooted at the repository root.
    pub fn resolve(&self, raw_name: &str, importing_file: &str) -> Option<String> {
        let raw_name = raw_name.trim();
        if raw_name.is_empty() {
            return None;
        }

        let language = Language::from_path(importing_file);
        let separator = match language {
            Language::Python => '.',
            _ => '/',
        };

        let dots = raw_name.chars().take_while(|c| *c == '.').count();
        let mut remainder = &raw_name[dots..];

        let mut base: Vec<&str> = Vec::new();
        if dots > 0 {
            base = parent_components(importing_file);
            for _ in 1..dots {
                base.pop();
            }
        } else if language == Language::Go {
            remainder = self.strip_go_module(remainder);
        }

        for segment in remainder.split(separator) {
            match segment {
                "" | "." => {}
                ".." => {
                    base.pop();
                }
                _ => base.push(segment),
            }
        }

        let base = base.join("/");
        let candidates = match language {
            Language::Python => {
                let mut candidates = Vec::new();
                if !base.is_empty() {
                    candidates.push(format!("{}.py", base));
                }
                candidates.push(join(&base, "__init__.py"));
                candidates
            }
            Language::TypeScript | Language::JavaScript => {
                let mut candidates = Vec::new();
                if !base.is_empty() {
                    candidates.push(base.clone());
                    for ext in SCRIPT_EXTENSIONS {
                        candidates.push(format!("{}.{}", base, ext));
                    }
                }
                for ext in SCRIPT_EXTENSIONS {
                    candidates.push(join(&base, &format!("index.{}", ext)));
                }
                candidates
            }
            Language::Go => {
                if base.is_empty() {
                    Vec::new()
                } else {
                    vec![format!("{}.go", base)]
                }
            }
            Language::Other => return None,
        };

        if let Some(found) = candidates
            .into_iter()
            .find(|candidate| self.root.join(candidate).is_file())
        {
            return Some(found);
        }

        if language == Language::Go {
            return self.first_go_file(&base);
        }

        None
    }

    /// Strip the `go.mod` module prefix from an import path
    fn strip_go_module<'n>(&self, name: &'n str) -> &'n str {
        let Some(module) = self.go_module.as_deref() else {
            return name;
        };

        if name == module {
            ""
        } else {
            name.strip_prefix(module)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(name)
        }
    }

    /// First non-test `.go` file in a package directory
    fn first_go_file(&self, dir: &str) -> Option<String> {
        let entries = std::fs::read_dir(self.root.join(dir)).ok()?;

        let mut files: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| name.ends_with(".go"))
            .collect();
        files.sort();

        let chosen = files
            .iter()
            .find(|name| !name.ends_with("_test.go"))
            .or_else(|| files.first())?;

        Some(join(dir, chosen))
    }
}

/// Directory components of a relative file path
fn parent_components(file: &str) -> Vec<&str> {
    let mut components: Vec<&str> = file
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();
    components.pop();
    components
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Read the module path from `go.mod`, if the repository has one
fn read_go_module(root: &Path) -> Option<String> {
    let content = std::fs::read_to_string(root.join("go.mod")).ok()?;

    content.lines().find_map(|line| {
        line.trim()
            .strip_prefix("module ")
            .map(|m| m.trim().trim_matches('"').to_string())
    })
}
