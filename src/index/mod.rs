//! Incremental indexing
//!
//! Walks the workspace, skips files whose fingerprint matches the stored
//! node, and for every changed file extracts a skeleton, resolves its
//! dependencies and commits node, dirty marks and edges in one transaction.

mod context;

pub use context::{build_context, get_node_context, DependencyContext, NodeContext};

use crate::extract::{content_hash, SkeletonExtractor};
use crate::repo::{IgnoreRules, Workspace};
use crate::resolve::DependencyResolver;
use crate::storage::Database;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Result of one indexing pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Files visited after ignore rules
    pub files_scanned: usize,
    /// Files whose fingerprint changed and were re-extracted
    pub files_reindexed: usize,
    /// Files skipped because their content is not UTF-8 text
    pub files_skipped: usize,
    /// Files that could not be read or stored
    pub files_failed: usize,
}

/// What happened to a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Reindexed,
    Unchanged,
    Skipped,
}

/// Runs indexing passes over a workspace
pub struct Indexer<'a> {
    workspace: &'a Workspace,
    db: &'a Database,
    extractor: SkeletonExtractor,
    resolver: DependencyResolver,
    rules: IgnoreRules,
}

impl<'a> Indexer<'a> {
    /// Create an indexer for `workspace`, writing to `db`
    pub fn new(workspace: &'a Workspace, db: &'a Database) -> Result<Self> {
        let extractor = SkeletonExtractor::new()?
            .with_raw_limit(workspace.config().max_raw_skeleton_bytes);
        let resolver = DependencyResolver::new(workspace.root());
        let rules = workspace.ignore_rules()?;

        Ok(Self {
            workspace,
            db,
            extractor,
            resolver,
            rules,
        })
    }

    /// Index every non-ignored file once.
    ///
    /// Per-file failures are logged and counted; they never abort the pass.
    pub fn run(&mut self) -> Result<IndexReport> {
        let mut report = IndexReport::default();

        for path in self.workspace.list_files(&self.rules) {
            report.files_scanned += 1;

            match self.index_file(&path) {
                Ok(FileOutcome::Reindexed) => report.files_reindexed += 1,
                Ok(FileOutcome::Unchanged) => {}
                Ok(FileOutcome::Skipped) => report.files_skipped += 1,
                Err(e) => {
                    tracing::warn!("Failed to index {}: {:#}", path, e);
                    report.files_failed += 1;
                }
            }
        }

        tracing::info!(
            "Indexed {} of {} files ({} skipped, {} failed)",
            report.files_reindexed,
            report.files_scanned,
            report.files_skipped,
            report.files_failed
        );

        Ok(report)
    }

    /// Index one root-relative file
    pub fn index_file(&mut self, path: &str) -> Result<FileOutcome> {
        let full_path = self.workspace.root().join(path);
        let bytes = std::fs::read(&full_path)
            .with_context(|| format!("Failed to read file: {:?}", full_path))?;

        let content = match std::str::from_utf8(&bytes) {
            Ok(content) => content,
            Err(_) => {
                tracing::debug!("Skipping non-text file {}", path);
                return Ok(FileOutcome::Skipped);
            }
        };

        let fingerprint = content_hash(&bytes);
        if self.db.get_fingerprint(path)?.as_deref() == Some(fingerprint.as_str()) {
            tracing::debug!("Unchanged: {}", path);
            return Ok(FileOutcome::Unchanged);
        }

        let skeleton = self.extractor.extract(path, content);

        let mut targets = BTreeSet::new();
        for name in &skeleton.dependencies {
            match self.resolver.resolve(name, path) {
                Some(target) => {
                    targets.insert(target);
                }
                None => tracing::debug!("Unresolved dependency {} in {}", name, path),
            }
        }
        let targets: Vec<String> = targets.into_iter().collect();

        self.db
            .commit_file(path, &fingerprint, &skeleton.text, &targets)?;

        tracing::info!("Indexed {} ({} dependencies)", path, targets.len());
        Ok(FileOutcome::Reindexed)
    }
}

/// Run one incremental indexing pass over the tree at `root`.
///
/// State lives in `<root>/.aic/graph.db` and is created on first use.
pub fn index<P: AsRef<Path>>(root: P) -> Result<IndexReport> {
    let workspace = Workspace::open(root)?;
    let db = workspace.open_database()?;

    Indexer::new(&workspace, &db)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PARSE_FAILURE_PREFIX;
    use crate::storage::NodeStatus;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn open(root: &Path) -> (Workspace, Database) {
        let workspace = Workspace::open(root).unwrap();
        let db = workspace.open_database().unwrap();
        (workspace, db)
    }

    fn pass(root: &Path) -> IndexReport {
        index(root).unwrap()
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "import b\n\ndef run():\n    return b.go()\n");
        write(dir.path(), "b.py", "def go():\n    return 1\n");

        let first = pass(dir.path());
        assert_eq!(first.files_reindexed, 2);
        assert_eq!(first.files_scanned, 2);

        let (_, db) = open(dir.path());
        let before = db.get_node("a.py").unwrap().unwrap();
        drop(db);

        let second = pass(dir.path());
        assert_eq!(second.files_reindexed, 0);
        assert_eq!(second.files_scanned, 2);

        let (_, db) = open(dir.path());
        let after = db.get_node("a.py").unwrap().unwrap();
        assert_eq!(after.skeleton, before.skeleton);
        assert_eq!(after.indexed_at, before.indexed_at);
        assert_eq!(after.status, NodeStatus::Clean);
        assert_eq!(db.get_stats().unwrap().edges, 1);
    }

    #[test]
    fn test_dependency_added_later_leaves_dependent_clean() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app.py", "import util\n");
        pass(dir.path());

        write(dir.path(), "util.py", "def helper():\n    pass\n");
        let report = pass(dir.path());
        assert_eq!(report.files_reindexed, 1);

        let (_, db) = open(dir.path());
        assert_eq!(db.get_node("app.py").unwrap().unwrap().status, NodeStatus::Clean);
        assert_eq!(db.get_node("util.py").unwrap().unwrap().status, NodeStatus::Clean);
        assert!(db.get_dirty_nodes().unwrap().is_empty());
    }

    #[test]
    fn test_only_changed_file_is_reindexed() {
        let dir = TempDir::new().unwrap();
        for name in ["a", "b", "c"] {
            write(dir.path(), &format!("{}.py", name), "def f():\n    pass\n");
        }
        pass(dir.path());

        write(dir.path(), "b.py", "def g():\n    pass\n");
        let report = pass(dir.path());
        assert_eq!(report.files_reindexed, 1);

        let (_, db) = open(dir.path());
        assert!(db.get_node("b.py").unwrap().unwrap().skeleton.contains("def g():"));
    }

    #[test]
    fn test_dirty_propagation_and_reset() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "import b\n");
        write(dir.path(), "b.py", "def go():\n    pass\n");
        pass(dir.path());

        write(dir.path(), "b.py", "def go(fast=False):\n    pass\n");
        pass(dir.path());

        let (_, db) = open(dir.path());
        assert_eq!(db.get_node("a.py").unwrap().unwrap().status, NodeStatus::Dirty);
        assert_eq!(db.get_node("b.py").unwrap().unwrap().status, NodeStatus::Clean);
        drop(db);

        write(dir.path(), "a.py", "import b\nimport os\n");
        pass(dir.path());

        let (_, db) = open(dir.path());
        assert_eq!(db.get_node("a.py").unwrap().unwrap().status, NodeStatus::Clean);
        assert!(db.get_dirty_nodes().unwrap().is_empty());
    }

    #[test]
    fn test_edges_are_replaced_on_reindex() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "import b\nimport c\n");
        write(dir.path(), "b.py", "");
        write(dir.path(), "c.py", "");
        write(dir.path(), "d.py", "");
        pass(dir.path());

        let (_, db) = open(dir.path());
        assert_eq!(
            db.get_direct_dependencies("a.py").unwrap(),
            vec!["b.py".to_string(), "c.py".to_string()]
        );
        drop(db);

        write(dir.path(), "a.py", "import d\n");
        pass(dir.path());

        let (_, db) = open(dir.path());
        assert_eq!(db.get_direct_dependencies("a.py").unwrap(), vec!["d.py".to_string()]);
    }

    #[test]
    fn test_relative_from_import_creates_single_edge() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg1/__init__.py", "");
        write(dir.path(), "pkg1/mod1.py", "from ..pkg2 import mod2\n");
        write(dir.path(), "pkg2/mod2.py", "def helper():\n    pass\n");
        pass(dir.path());

        let (_, db) = open(dir.path());
        assert_eq!(
            db.get_direct_dependencies("pkg1/mod1.py").unwrap(),
            vec!["pkg2/mod2.py".to_string()]
        );
        assert_eq!(db.get_stats().unwrap().edges, 1);
    }

    #[test]
    fn test_unparseable_file_does_not_abort() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "broken.py", "import ok\ndef broken(:\n    pass\n");
        write(dir.path(), "ok.py", "def fine():\n    pass\n");

        let report = pass(dir.path());
        assert_eq!(report.files_reindexed, 2);
        assert_eq!(report.files_failed, 0);

        let (_, db) = open(dir.path());
        let broken = db.get_node("broken.py").unwrap().unwrap();
        assert!(broken.skeleton.starts_with(PARSE_FAILURE_PREFIX));
        assert!(broken.skeleton.contains("broken.py"));
        assert!(db.get_direct_dependencies("broken.py").unwrap().is_empty());
        assert!(db.get_node("ok.py").unwrap().is_some());
    }

    #[test]
    fn test_deeply_nested_expression_is_indexed() {
        let dir = TempDir::new().unwrap();
        let terms = vec!["1"; 20_000].join(" + ");
        write(dir.path(), "gen.py", &format!("TOTAL = {}\n\ndef total():\n    return TOTAL\n", terms));
        write(dir.path(), "ok.py", "def fine():\n    pass\n");

        let report = pass(dir.path());
        assert_eq!(report.files_reindexed, 2);

        let (_, db) = open(dir.path());
        assert!(db.get_node("gen.py").unwrap().unwrap().skeleton.contains("def total():"));
        assert!(db.get_node("ok.py").unwrap().is_some());
    }

    #[test]
    fn test_binary_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo.png"), [0x89u8, 0x50, 0x4e, 0x47, 0xff, 0xfe]).unwrap();
        write(dir.path(), "main.go", "package main\n");

        let report = pass(dir.path());
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.files_reindexed, 1);

        let (_, db) = open(dir.path());
        assert!(db.get_node("logo.png").unwrap().is_none());
    }

    #[test]
    fn test_ignored_paths_are_not_indexed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "node_modules/dep/index.js", "module.exports = 1;\n");
        write(dir.path(), "generated/api.ts", "export const x = 1;\n");
        write(dir.path(), ".aicignore", "generated/\n");
        write(dir.path(), "app.ts", "import './generated/api';\n");

        let report = pass(dir.path());
        assert_eq!(report.files_scanned, 2);

        let (_, db) = open(dir.path());
        assert!(db.get_node("app.ts").unwrap().is_some());
        assert!(db.get_node("generated/api.ts").unwrap().is_none());
        assert!(db.get_node("node_modules/dep/index.js").unwrap().is_none());
    }

    #[test]
    fn test_large_unsupported_file_is_truncated() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "data.txt", &"x".repeat(200 * 1024));
        pass(dir.path());

        let (_, db) = open(dir.path());
        let node = db.get_node("data.txt").unwrap().unwrap();
        assert!(node
            .skeleton
            .starts_with("# Content truncated (size: 204800 bytes)\n"));
        assert!(node.skeleton.len() < 110 * 1024);
    }

    #[test]
    fn test_mixed_languages_are_linked() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.ts", "import { util } from './ts';\n");
        write(dir.path(), "ts/index.ts", "export function util(): void {\n}\n");
        write(dir.path(), "main.go", "package main\n\nimport \"go\"\n");
        write(dir.path(), "go/utils.go", "package utils\n\nfunc Help() {\n}\n");
        pass(dir.path());

        let (_, db) = open(dir.path());
        assert_eq!(
            db.get_direct_dependencies("main.ts").unwrap(),
            vec!["ts/index.ts".to_string()]
        );
        assert_eq!(
            db.get_direct_dependencies("main.go").unwrap(),
            vec!["go/utils.go".to_string()]
        );
        assert_eq!(
            db.get_node("ts/index.ts").unwrap().unwrap().skeleton,
            "export function util(): void { ... }"
        );
    }
}
