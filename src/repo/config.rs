//! Workspace configuration and ignore rules

use super::AIC_DIR;
use crate::extract::MAX_RAW_SKELETON_BYTES;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration stored in `.aic/config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AicConfig {
    /// Patterns to ignore (gitignore-style globs)
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Project-local files whose lines extend the ignore patterns
    #[serde(default = "default_ignore_files")]
    pub ignore_files: Vec<String>,

    /// Ceiling for verbatim skeletons of unsupported files
    #[serde(default = "default_max_raw_skeleton_bytes")]
    pub max_raw_skeleton_bytes: usize,
}

fn default_ignore_patterns() -> Vec<String> {
    [
        // Version control
        ".git",
        ".hg",
        ".svn",
        // Dependency managers and interpreter caches
        "node_modules",
        "__pycache__",
        ".venv",
        "venv",
        ".tox",
        ".mypy_cache",
        ".pytest_cache",
        "*.pyc",
        // Build output
        "target",
        "build",
        "dist",
        ".DS_Store",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_ignore_files() -> Vec<String> {
    vec![".gitignore".to_string(), ".aicignore".to_string()]
}

fn default_max_raw_skeleton_bytes() -> usize {
    MAX_RAW_SKELETON_BYTES
}

impl Default for AicConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns(),
            ignore_files: default_ignore_files(),
            max_raw_skeleton_bytes: default_max_raw_skeleton_bytes(),
        }
    }
}

impl AicConfig {
    /// Load configuration from the workspace or return defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(AIC_DIR).join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            let config: AicConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the workspace
    pub fn save(&self, root: &Path) -> Result<()> {
        let aic_dir = root.join(AIC_DIR);
        std::fs::create_dir_all(&aic_dir)
            .with_context(|| format!("Failed to create {:?}", aic_dir))?;

        let config_path = aic_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Compile the configured patterns plus those read from the ignore files
    pub fn ignore_rules(&self, root: &Path) -> Result<IgnoreRules> {
        let mut patterns = self.ignore_patterns.clone();

        for file in &self.ignore_files {
            let path = root.join(file);
            if !path.is_file() {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read ignore file: {:?}", path))?;
            patterns.extend(parse_ignore_file(&content));
        }

        IgnoreRules::new(&patterns)
    }
}

/// Patterns from an ignore file, one per line.
///
/// Blank lines and `#` comments are skipped. Negations (`!pattern`) are not
/// supported and are dropped.
pub fn parse_ignore_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            if line.starts_with('!') {
                tracing::debug!("Ignoring unsupported negated pattern {}", line);
                false
            } else {
                true
            }
        })
        .map(|line| line.strip_suffix('/').unwrap_or(line).to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Compiled ignore patterns.
///
/// A pattern without `/` matches a file or directory name at any depth. A
/// pattern containing `/` matches the root-relative path; a leading `/` only
/// anchors it. The `.aic` state directory is always ignored.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    names: GlobSet,
    paths: GlobSet,
}

impl IgnoreRules {
    /// Compile a set of patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut names = GlobSetBuilder::new();
        let mut paths = GlobSetBuilder::new();

        names.add(Glob::new(AIC_DIR).context("Failed to compile state directory pattern")?);

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            let pattern = pattern.strip_suffix('/').unwrap_or(pattern);
            if pattern.is_empty() {
                continue;
            }

            let (set, glob) = match pattern.strip_prefix('/') {
                Some(anchored) => (&mut paths, anchored),
                None if pattern.contains('/') => (&mut paths, pattern),
                None => (&mut names, pattern),
            };

            // Invalid lines are skipped, as git does
            match compile_glob(glob) {
                Ok(glob) => {
                    set.add(glob);
                }
                Err(e) => tracing::warn!("Skipping ignore pattern {}: {:#}", pattern, e),
            }
        }

        Ok(Self {
            names: names.build().context("Failed to build ignore patterns")?,
            paths: paths.build().context("Failed to build ignore patterns")?,
        })
    }

    /// Check if a root-relative, `/`-separated path should be ignored
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        let name = rel_path.rsplit('/').next().unwrap_or(rel_path);
        self.names.is_match(name) || self.paths.is_match(rel_path)
    }

    /// Check if the path or any of its parent directories is ignored
    pub fn excludes(&self, rel_path: &str) -> bool {
        rel_path
            .match_indices('/')
            .map(|(idx, _)| &rel_path[..idx])
            .chain(std::iter::once(rel_path))
            .any(|prefix| self.is_ignored(prefix))
    }
}

fn compile_glob(pattern: &str) -> Result<Glob> {
    globset::GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("Invalid ignore pattern: {}", pattern))
}
