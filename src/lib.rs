//! aic - Incremental skeleton indexer
//!
//! This library indexes a source tree into a persisted dependency graph of
//! file skeletons (signatures, docstrings and effects without bodies), so a
//! file's context can be assembled without re-reading the whole repository.

pub mod cli;
pub mod extract;
pub mod index;
pub mod repo;
pub mod resolve;
pub mod storage;

/// Re-export commonly used types
pub use extract::{content_hash, Language, Skeleton, SkeletonExtractor};
pub use index::{get_node_context, index, IndexReport, Indexer};
pub use repo::Workspace;
pub use resolve::DependencyResolver;
pub use storage::{Database, Node, NodeStatus};

/// Application-wide error type
pub use anyhow::Result;
