//! SQLite storage layer for the skeleton graph
//!
//! This module handles persistent storage of:
//! - Nodes: one per indexed file, with fingerprint, skeleton and status
//! - Edges: resolved dependencies from a source file to a target file
//!
//! Every per-file update made by the indexer goes through [`Database::commit_file`],
//! which applies the node, its dirty propagation and its edges in one transaction.

mod schema;

pub use schema::SCHEMA;

use crate::extract::Language;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Staleness flag of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    /// Skeleton was produced after every known dependency change
    Clean,
    /// A direct dependency was reindexed since this skeleton was produced
    Dirty,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Clean => "CLEAN",
            NodeStatus::Dirty => "DIRTY",
        }
    }

    fn from_db(value: &str) -> Self {
        match value {
            "DIRTY" => NodeStatus::Dirty,
            _ => NodeStatus::Clean,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An indexed file
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    /// SHA-256 of the content the skeleton was built from
    pub fingerprint: String,
    pub skeleton: String,
    pub language: Language,
    pub status: NodeStatus,
    pub indexed_at: String,
}

/// Graph statistics
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub dirty_nodes: usize,
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", path.as_ref()))?;

        // Readers keep working while an index run writes
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL journal")?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Initialize connection settings and the database schema
    fn initialize(&self) -> Result<()> {
        self.conn
            .busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set busy timeout")?;
        self.conn
            .pragma_update(None, "foreign_keys", true)
            .context("Failed to enable foreign keys")?;
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(())
    }

    // ==================== Writes ====================

    /// Create or replace a node, resetting its status to CLEAN
    pub fn upsert_node(&self, path: &str, fingerprint: &str, skeleton: &str) -> Result<()> {
        upsert_node(&self.conn, path, fingerprint, skeleton)
    }

    /// Mark every direct dependent of `path` DIRTY.
    ///
    /// One hop only: dependents of dependents are left alone. Returns the
    /// number of nodes marked.
    pub fn mark_dependents_dirty(&self, path: &str) -> Result<usize> {
        mark_dependents_dirty(&self.conn, path)
    }

    /// Replace all outgoing edges of `source` with `targets`.
    ///
    /// `source` must already have a node.
    pub fn replace_edges(&self, source: &str, targets: &[String]) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        replace_edges(&tx, source, targets)?;
        tx.commit().context("Failed to commit edges")?;
        Ok(())
    }

    /// Store a reindexed file: upsert its node, mark its dependents dirty and
    /// replace its edges, atomically.
    ///
    /// Dependents are only marked when the node already existed: a file seen
    /// for the first time has not changed under anything that imports it.
    pub fn commit_file(
        &self,
        path: &str,
        fingerprint: &str,
        skeleton: &str,
        targets: &[String],
    ) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let existed = node_exists(&tx, path)?;
        upsert_node(&tx, path, fingerprint, skeleton)?;
        if existed {
            mark_dependents_dirty(&tx, path)?;
        }
        replace_edges(&tx, path, targets)?;

        tx.commit()
            .with_context(|| format!("Failed to commit {}", path))?;
        Ok(())
    }

    // ==================== Reads ====================

    /// Get a node by path
    pub fn get_node(&self, path: &str) -> Result<Option<Node>> {
        let node = self
            .conn
            .query_row(
                r#"
                SELECT path, fingerprint, skeleton, language, status, indexed_at
                FROM nodes WHERE path = ?1
                "#,
                params![path],
                |row| {
                    let language: String = row.get(3)?;
                    let status: String = row.get(4)?;
                    Ok(Node {
                        path: row.get(0)?,
                        fingerprint: row.get(1)?,
                        skeleton: row.get(2)?,
                        language: Language::from_name(&language),
                        status: NodeStatus::from_db(&status),
                        indexed_at: row.get(5)?,
                    })
                },
            )
            .optional()
            .context("Failed to get node")?;

        Ok(node)
    }

    /// Get the stored fingerprint of a node
    pub fn get_fingerprint(&self, path: &str) -> Result<Option<String>> {
        let fingerprint = self
            .conn
            .query_row(
                "SELECT fingerprint FROM nodes WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to get fingerprint")?;

        Ok(fingerprint)
    }

    /// Files `path` depends on
    pub fn get_direct_dependencies(&self, path: &str) -> Result<Vec<String>> {
        self.query_paths(
            "SELECT target FROM edges WHERE source = ?1 ORDER BY target",
            path,
        )
        .context("Failed to get dependencies")
    }

    /// Files that depend on `path`
    pub fn get_direct_dependents(&self, path: &str) -> Result<Vec<String>> {
        self.query_paths(
            "SELECT source FROM edges WHERE target = ?1 ORDER BY source",
            path,
        )
        .context("Failed to get dependents")
    }

    /// Files that depend on `path` through any chain of edges.
    ///
    /// Cycles terminate because the recursive union discards seen rows.
    pub fn get_transitive_dependents(&self, path: &str) -> Result<Vec<String>> {
        self.query_paths(
            r#"
            WITH RECURSIVE upstream(path) AS (
                SELECT source FROM edges WHERE target = ?1
                UNION
                SELECT edges.source FROM edges
                JOIN upstream ON edges.target = upstream.path
            )
            SELECT path FROM upstream WHERE path != ?1 ORDER BY path
            "#,
            path,
        )
        .context("Failed to get transitive dependents")
    }

    /// Paths of all DIRTY nodes
    pub fn get_dirty_nodes(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM nodes WHERE status = 'DIRTY' ORDER BY path")?;

        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(row?);
        }

        Ok(paths)
    }

    fn query_paths(&self, sql: &str, path: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![path], |row| row.get(0))?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(row?);
        }

        Ok(paths)
    }

    // ==================== Statistics ====================

    /// Get graph statistics
    pub fn get_stats(&self) -> Result<GraphStats> {
        let nodes: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;

        let edges: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;

        let dirty_nodes: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE status = 'DIRTY'",
            [],
            |row| row.get(0),
        )?;

        Ok(GraphStats {
            nodes: nodes as usize,
            edges: edges as usize,
            dirty_nodes: dirty_nodes as usize,
        })
    }
}

// Statement helpers shared by single writes and `commit_file`

fn node_exists(conn: &Connection, path: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM nodes WHERE path = ?1", params![path], |_| Ok(()))
        .optional()
        .with_context(|| format!("Failed to look up node {}", path))?;

    Ok(found.is_some())
}

fn upsert_node(conn: &Connection, path: &str, fingerprint: &str, skeleton: &str) -> Result<()> {
    let language = Language::from_path(path);

    conn.execute(
        r#"
        INSERT INTO nodes (path, fingerprint, skeleton, language, status, indexed_at)
        VALUES (?1, ?2, ?3, ?4, 'CLEAN', datetime('now'))
        ON CONFLICT(path) DO UPDATE SET
            fingerprint = excluded.fingerprint,
            skeleton = excluded.skeleton,
            language = excluded.language,
            status = 'CLEAN',
            indexed_at = excluded.indexed_at
        "#,
        params![path, fingerprint, skeleton, language.as_str()],
    )
    .with_context(|| format!("Failed to upsert node {}", path))?;

    Ok(())
}

fn mark_dependents_dirty(conn: &Connection, path: &str) -> Result<usize> {
    let count = conn
        .execute(
            r#"
            UPDATE nodes SET status = 'DIRTY'
            WHERE path != ?1
              AND path IN (SELECT source FROM edges WHERE target = ?1)
            "#,
            params![path],
        )
        .with_context(|| format!("Failed to mark dependents of {} dirty", path))?;

    Ok(count)
}

fn replace_edges(conn: &Connection, source: &str, targets: &[String]) -> Result<()> {
    conn.execute("DELETE FROM edges WHERE source = ?1", params![source])
        .with_context(|| format!("Failed to clear edges of {}", source))?;

    let mut stmt = conn.prepare("INSERT OR IGNORE INTO edges (source, target) VALUES (?1, ?2)")?;
    for target in targets {
        stmt.execute(params![source, target])
            .with_context(|| format!("Failed to insert edge {} -> {}", source, target))?;
    }

    Ok(())
}
