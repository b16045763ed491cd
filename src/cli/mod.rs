//! CLI interface using clap
//!
//! Provides the command-line interface for aic

mod commands;

pub use commands::*;

use clap::{Parser, Subcommand};

/// aic - Incremental skeleton indexer for source trees
#[derive(Parser, Debug)]
#[command(name = "aic")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the workspace root (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".", env = "AIC_ROOT")]
    pub path: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(short = 'o', long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize aic in a workspace
    Init(InitArgs),

    /// Index changed files and update the dependency graph
    Index,

    /// Show a file's skeleton and the skeletons of its dependencies
    Context(ContextArgs),

    /// Show graph statistics and dirty nodes
    Status,

    /// List files that depend on a file
    Dependents(DependentsArgs),

    /// Watch for changes and index automatically
    Watch(WatchArgs),
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Arguments for init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force re-initialization, discarding the existing graph
    #[arg(short, long)]
    pub force: bool,

    /// Skip the initial index
    #[arg(long)]
    pub no_index: bool,
}

/// Arguments for context command
#[derive(Parser, Debug)]
pub struct ContextArgs {
    /// File path, relative to the workspace root
    pub file: String,
}

/// Arguments for dependents command
#[derive(Parser, Debug)]
pub struct DependentsArgs {
    /// File path, relative to the workspace root
    pub file: String,

    /// Follow edges upstream through any number of hops
    #[arg(short, long)]
    pub transitive: bool,
}

/// Arguments for watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Quiet period in milliseconds before indexing a burst of changes
    #[arg(short, long, default_value = "500")]
    pub debounce: u64,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["aic", "--path", "/tmp/repo", "index"]);
        assert!(matches!(cli.command, Commands::Index));
        assert_eq!(cli.path, "/tmp/repo");
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_dependents_command() {
        let cli = Cli::parse_from(["aic", "dependents", "pkg/a.py", "--transitive", "-o", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);

        if let Commands::Dependents(args) = cli.command {
            assert_eq!(args.file, "pkg/a.py");
            assert!(args.transitive);
        } else {
            panic!("expected dependents command");
        }
    }

    #[test]
    fn test_init_command() {
        let cli = Cli::parse_from(["aic", "init", "--force"]);
        if let Commands::Init(args) = cli.command {
            assert!(args.force);
            assert!(!args.no_index);
        }
    }
}
