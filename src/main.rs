//! aic - Incremental skeleton indexer
//!
//! Keeps a dependency graph of file skeletons under `.aic/` up to date and
//! prints a file's context (its skeleton plus its dependencies' skeletons).

use aic::cli::{
    context, dependents, init, print_index_report, print_paths, print_status, status, Cli,
    Commands, OutputFormat,
};
use aic::index::{index, Indexer};
use aic::repo::Workspace;
use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Setup logging on stderr so stdout stays machine-readable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Get workspace path
    let root = Path::new(&cli.path);

    // Execute command
    match cli.command {
        Commands::Init(args) => {
            init(root, args.force)?;

            if !args.no_index {
                let report = index(root)?;
                print_index_report(&report, cli.format)?;
            }
        }

        Commands::Index => {
            let report = index(root)?;
            print_index_report(&report, cli.format)?;
        }

        Commands::Context(args) => {
            context(root, &args.file, cli.format)?;
        }

        Commands::Status => {
            let report = status(root)?;
            print_status(&report, cli.format)?;
        }

        Commands::Dependents(args) => {
            let paths = dependents(root, &args.file, args.transitive)?;
            print_paths(&args.file, &paths, cli.format)?;
        }

        Commands::Watch(args) => {
            run_watch(root, args.debounce, cli.format)?;
        }
    }

    Ok(())
}

/// Run in watch mode
fn run_watch(path: &Path, debounce_ms: u64, format: OutputFormat) -> Result<()> {
    use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
    use std::sync::mpsc::{channel, RecvTimeoutError};
    use std::time::Duration;

    let workspace = Workspace::open(path)?;
    let db = workspace.open_database()?;
    let rules = workspace.ignore_rules()?;
    let mut indexer = Indexer::new(&workspace, &db)?;

    print_index_report(&indexer.run()?, format)?;

    eprintln!("Watching for changes in {:?}...", workspace.root());
    eprintln!("Press Ctrl+C to stop.\n");

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    watcher.watch(workspace.root(), RecursiveMode::Recursive)?;

    let debounce = Duration::from_millis(debounce_ms);

    // Only changes outside ignored directories (including `.aic`) count
    let relevant = |event: &notify::Event| {
        event.paths.iter().any(|p| {
            workspace
                .relative_path(p)
                .is_some_and(|rel| !rules.excludes(&rel))
        })
    };

    loop {
        match rx.recv() {
            Ok(Ok(event)) if relevant(&event) => {}
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => {
                tracing::warn!("Watch error: {}", e);
                continue;
            }
            Err(_) => break,
        }

        // Let a burst of writes settle before indexing once
        loop {
            match rx.recv_timeout(debounce) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }
        }

        match indexer.run() {
            Ok(report) => print_index_report(&report, format)?,
            Err(e) => tracing::error!("Index error: {:#}", e),
        }
    }

    Ok(())
}
