//! Context assembly for a single node

use crate::storage::{Database, NodeStatus};
use anyhow::Result;
use serde::Serialize;

/// A node's skeleton together with its direct dependencies
#[derive(Debug, Clone, Serialize)]
pub struct NodeContext {
    pub path: String,
    pub status: NodeStatus,
    pub skeleton: String,
    pub dependencies: Vec<DependencyContext>,
}

/// Skeleton of one direct dependency
#[derive(Debug, Clone, Serialize)]
pub struct DependencyContext {
    pub path: String,
    pub skeleton: String,
}

impl NodeContext {
    /// Render the human-readable report
    pub fn render(&self) -> String {
        let mut output = vec![format!("# Context for {}", self.path)];
        if self.status == NodeStatus::Dirty {
            output.push(
                "# Status: DIRTY (a direct dependency was reindexed after this skeleton)"
                    .to_string(),
            );
        }
        output.push(self.skeleton.clone());
        output.push(String::new());

        if !self.dependencies.is_empty() {
            output.push("## Dependencies".to_string());
            for dep in &self.dependencies {
                output.push(format!("### {}", dep.path));
                output.push(dep.skeleton.clone());
                output.push(String::new());
            }
        }

        output.join("\n")
    }
}

/// Look up `path` and the skeletons of its direct dependencies.
///
/// Returns `None` if the path was never indexed. Edges whose target has no
/// node are left out.
pub fn build_context(db: &Database, path: &str) -> Result<Option<NodeContext>> {
    let Some(node) = db.get_node(path)? else {
        return Ok(None);
    };

    let mut dependencies = Vec::new();
    for dep in db.get_direct_dependencies(path)? {
        if let Some(dep_node) = db.get_node(&dep)? {
            dependencies.push(DependencyContext {
                path: dep_node.path,
                skeleton: dep_node.skeleton,
            });
        }
    }

    Ok(Some(NodeContext {
        path: node.path,
        status: node.status,
        skeleton: node.skeleton,
        dependencies,
    }))
}

/// Human-readable context report for `path`.
///
/// An unindexed path yields a `# Error:` line rather than an error.
pub fn get_node_context(db: &Database, path: &str) -> Result<String> {
    Ok(match build_context(db, path)? {
        Some(context) => context.render(),
        None => format!("# Error: {} not indexed.", path),
    })
}
