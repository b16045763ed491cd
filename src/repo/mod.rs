//! Workspace layout and file discovery
//!
//! This module handles the repository being indexed:
//! - Locating the root and the `.aic` state directory
//! - Loading configuration and ignore rules
//! - Walking the tree for indexable files

mod config;

pub use config::{parse_ignore_file, AicConfig, IgnoreRules};

use crate::storage::Database;
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Name of the project-local state directory
pub const AIC_DIR: &str = ".aic";

/// File name of the graph database inside [`AIC_DIR`]
pub const DATABASE_FILE: &str = "graph.db";

/// A source tree being indexed
pub struct Workspace {
    /// Canonical path to the workspace root
    root: PathBuf,
    /// Workspace configuration
    config: AicConfig,
}

impl Workspace {
    /// Open the workspace rooted at the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let root = path
            .canonicalize()
            .with_context(|| format!("Failed to resolve workspace root {:?}", path))?;

        if !root.is_dir() {
            anyhow::bail!("Workspace root {:?} is not a directory", root);
        }

        let config = AicConfig::load_or_default(&root)?;

        Ok(Self { root, config })
    }

    /// Get the workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the workspace configuration
    pub fn config(&self) -> &AicConfig {
        &self.config
    }

    /// Get the path to the .aic directory
    pub fn aic_dir(&self) -> PathBuf {
        self.root.join(AIC_DIR)
    }

    /// Initialize the .aic directory if it doesn't exist
    pub fn init_aic_dir(&self) -> Result<PathBuf> {
        let aic_dir = self.aic_dir();
        if !aic_dir.exists() {
            std::fs::create_dir_all(&aic_dir)
                .with_context(|| format!("Failed to create {:?}", aic_dir))?;
        }
        Ok(aic_dir)
    }

    /// Whether the workspace has been initialized
    pub fn is_initialized(&self) -> bool {
        self.database_path().exists()
    }

    /// Path of the graph database
    pub fn database_path(&self) -> PathBuf {
        self.aic_dir().join(DATABASE_FILE)
    }

    /// Open (creating if needed) the graph database
    pub fn open_database(&self) -> Result<Database> {
        self.init_aic_dir()?;
        Database::open(self.database_path())
    }

    /// Compile ignore rules from configuration and ignore files
    pub fn ignore_rules(&self) -> Result<IgnoreRules> {
        self.config.ignore_rules(&self.root)
    }

    /// List all files not excluded by `rules`, as sorted root-relative paths.
    ///
    /// Ignored directories are pruned without being descended into. Entries
    /// that cannot be read are logged and skipped.
    pub fn list_files(&self, rules: &IgnoreRules) -> Vec<String> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                match self.relative_path(e.path()) {
                    Some(rel) => !rules.is_ignored(&rel),
                    None => false,
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match self.relative_path(entry.path()) {
                Some(rel) => files.push(rel),
                None => tracing::debug!("Skipping non-UTF-8 path {:?}", entry.path()),
            }
        }

        files
    }

    /// Convert a path under the root to its `/`-separated relative form
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;

        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    /// Normalize a user-supplied file path to the form stored in the graph.
    ///
    /// Absolute paths under the root are made relative; `./` prefixes and
    /// backslashes are removed.
    pub fn normalize_path(&self, input: &str) -> String {
        let candidate = Path::new(input);
        if candidate.is_absolute() {
            let absolute = candidate
                .canonicalize()
                .unwrap_or_else(|_| candidate.to_path_buf());
            if let Some(rel) = self.relative_path(&absolute) {
                return rel;
            }
        }

        input
            .replace('\\', "/")
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .collect::<Vec<_>>()
            .join("/")
    }
}
