//! Command implementations

use super::OutputFormat;
use crate::index::{build_context, get_node_context, IndexReport};
use crate::repo::Workspace;
use crate::storage::{Database, GraphStats};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Graph summary printed by `aic status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub root: PathBuf,
    pub stats: GraphStats,
    pub dirty: Vec<String>,
}

/// Initialize aic in a workspace
pub fn init(path: &Path, force: bool) -> Result<()> {
    let workspace = Workspace::open(path)?;

    if workspace.is_initialized() {
        if !force {
            anyhow::bail!("aic already initialized. Use --force to re-initialize.");
        }
        remove_database(&workspace)?;
    }

    let aic_dir = workspace.init_aic_dir()?;
    let _db = workspace.open_database()?;
    workspace.config().save(workspace.root())?;

    println!("✓ Initialized aic in {:?}", workspace.root());
    println!("  Database: {:?}", workspace.database_path());
    println!("  Config: {:?}", aic_dir.join("config.toml"));

    Ok(())
}

/// Delete the graph database and its WAL side files
fn remove_database(workspace: &Workspace) -> Result<()> {
    let db_path = workspace.database_path();

    for suffix in ["", "-wal", "-shm"] {
        let mut file = db_path.clone().into_os_string();
        file.push(suffix);
        let file = PathBuf::from(file);
        if file.exists() {
            std::fs::remove_file(&file)
                .with_context(|| format!("Failed to remove {:?}", file))?;
        }
    }

    Ok(())
}

/// Open the graph of an already indexed workspace
fn open_indexed(path: &Path) -> Result<(Workspace, Database)> {
    let workspace = Workspace::open(path)?;

    if !workspace.is_initialized() {
        anyhow::bail!("aic not initialized. Run 'aic init' or 'aic index' first.");
    }

    let db = workspace.open_database()?;
    Ok((workspace, db))
}

/// Print a file's context report
pub fn context(path: &Path, file: &str, format: OutputFormat) -> Result<()> {
    let (workspace, db) = open_indexed(path)?;
    let file = workspace.normalize_path(file);

    match format {
        OutputFormat::Text => println!("{}", get_node_context(&db, &file)?),
        OutputFormat::Json => match build_context(&db, &file)? {
            Some(context) => print_json(&context)?,
            None => print_json(&serde_json::json!({
                "path": file,
                "error": "not indexed",
            }))?,
        },
    }

    Ok(())
}

/// Collect graph statistics and dirty nodes
pub fn status(path: &Path) -> Result<StatusReport> {
    let (workspace, db) = open_indexed(path)?;

    Ok(StatusReport {
        root: workspace.root().to_path_buf(),
        stats: db.get_stats()?,
        dirty: db.get_dirty_nodes()?,
    })
}

/// Files depending on `file`, directly or through any chain of edges
pub fn dependents(path: &Path, file: &str, transitive: bool) -> Result<Vec<String>> {
    let (workspace, db) = open_indexed(path)?;
    let file = workspace.normalize_path(file);

    if transitive {
        db.get_transitive_dependents(&file)
    } else {
        db.get_direct_dependents(&file)
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

pub fn print_index_report(report: &IndexReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Text => println!(
            "✓ Reindexed {} file(s) ({} scanned, {} skipped, {} failed)",
            report.files_reindexed, report.files_scanned, report.files_skipped, report.files_failed
        ),
    }
    Ok(())
}

pub fn print_status(report: &StatusReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    println!("aic Status");
    println!("==========\n");

    println!("Workspace: {:?}", report.root);
    println!("Nodes: {}", report.stats.nodes);
    println!("Edges: {}", report.stats.edges);
    println!("Dirty nodes: {}", report.stats.dirty_nodes);

    if report.dirty.is_empty() {
        println!("\n✓ All nodes clean");
        return Ok(());
    }

    println!("\nDirty:");
    for path in &report.dirty {
        println!("  {}", path);
    }

    Ok(())
}

pub fn print_paths(file: &str, paths: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&paths)?,
        OutputFormat::Text if paths.is_empty() => println!("No files depend on {}", file),
        OutputFormat::Text => {
            for path in paths {
                println!("{}", path);
            }
        }
    }
    Ok(())
}
