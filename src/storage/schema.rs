//! Database schema definition

/// SQL schema for the skeleton graph database
pub const SCHEMA: &str = r#"
-- One node per indexed file
CREATE TABLE IF NOT EXISTS nodes (
    path TEXT PRIMARY KEY,
    fingerprint TEXT NOT NULL,
    skeleton TEXT NOT NULL,
    language TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'CLEAN' CHECK (status IN ('CLEAN', 'DIRTY')),
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_status ON nodes(status);

-- Resolved dependency edges (source imports target)
CREATE TABLE IF NOT EXISTS edges (
    source TEXT NOT NULL,
    target TEXT NOT NULL,
    PRIMARY KEY (source, target),
    FOREIGN KEY (source) REFERENCES nodes(path) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
"#;

