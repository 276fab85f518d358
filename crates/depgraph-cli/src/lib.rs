//! Command-line interface for depgraph.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use depgraph_core::config::DepGraphConfig;
use depgraph_core::error::DepGraphError;
use depgraph_core::logging::init_logging;

mod commands;
mod output;
mod progress;
mod prompt;

pub use commands::*;
pub use output::*;
pub use progress::*;

/// Exit code for an unresolved dependency conflict
pub const EXIT_CONFLICT: i32 = 2;

/// Exit code for any other fatal error
pub const EXIT_FAILURE: i32 = 1;

/// CLI arguments parser
#[derive(Debug, Parser)]
#[command(name = "depgraph", author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Pinned requirements file
    #[arg(short, long, value_name = "FILE", default_value = "requirements.txt")]
    pub requirements: PathBuf,

    /// Target Python version, prompted for when absent
    #[arg(short, long, value_name = "VERSION")]
    pub target: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Build the dependency graph, then check Python compatibility
    Check {
        /// Also write the graph as Graphviz DOT
        #[arg(long, value_name = "FILE")]
        dot: Option<PathBuf>,
    },

    /// Build the dependency graph only
    Graph {
        /// Also write the graph as Graphviz DOT
        #[arg(long, value_name = "FILE")]
        dot: Option<PathBuf>,

        /// Print the resolution metrics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check Python compatibility and suggest upgrades
    Compat,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Check { dot: None }
    }
}

/// Run the CLI application
pub async fn run(cli: Cli) -> Result<()> {
    let config = DepGraphConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging, cli.verbose);

    let target = cli.target.or_else(|| config.target_runtime.clone());
    let command = cli.command.unwrap_or_default();
    debug!("Running {:?} on {}", command, cli.requirements.display());

    match command {
        Commands::Check { dot } => {
            commands::execute_check(&config, &cli.requirements, dot.as_deref(), target).await?;
        }
        Commands::Graph { dot, json } => {
            commands::execute_graph(&config, &cli.requirements, dot.as_deref(), json).await?;
        }
        Commands::Compat => {
            commands::execute_compat(&config, &cli.requirements, target).await?;
        }
    }

    Ok(())
}

/// Process exit code for a failed run
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<DepGraphError>() {
        Some(e) if e.is_conflict() => EXIT_CONFLICT,
        _ => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_default_command_is_check() {
        let cli = Cli::try_parse_from(["depgraph"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.command.unwrap_or_default(), Commands::Check { dot: None });
        assert_eq!(cli.requirements, PathBuf::from("requirements.txt"));
    }

    #[test]
    fn test_parse_graph_command() {
        let cli = Cli::try_parse_from([
            "depgraph",
            "--requirements",
            "pins.txt",
            "--target",
            "3.12",
            "graph",
            "--dot",
            "out.dot",
        ])
        .unwrap();
        assert_eq!(cli.target.as_deref(), Some("3.12"));
        assert_eq!(
            cli.command,
            Some(Commands::Graph {
                dot: Some(PathBuf::from("out.dot")),
                json: false,
            })
        );
    }

    #[test]
    fn test_exit_codes() {
        let conflict: anyhow::Error = DepGraphError::conflict("c", "b", ">=5.0").into();
        assert_eq!(exit_code(&conflict), EXIT_CONFLICT);

        let wrapped = Err::<(), _>(DepGraphError::conflict("c", "b", ">=5.0"))
            .context("resolution failed")
            .unwrap_err();
        assert_eq!(exit_code(&wrapped), EXIT_CONFLICT);

        let io: anyhow::Error = DepGraphError::config("bad").into();
        assert_eq!(exit_code(&io), EXIT_FAILURE);
        assert_eq!(exit_code(&anyhow::anyhow!("plain")), EXIT_FAILURE);
    }
}
