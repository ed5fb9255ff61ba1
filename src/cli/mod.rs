//! CLI module
//!
//! Command-line parsing for the `deep-research-server` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Deep research server
///
/// Streams chat replies and multi-agent research reports over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "deep-research-server",
    version,
    about = "Lead/sub-agent deep research server",
    long_about = "Breaks research queries into focused tasks, runs web-searching subagents\n\
                  concurrently and streams the synthesized report as incremental markdown.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a config.",
    after_help = "EXAMPLES:\n    \
                  deep-research-server init                      # Scaffold research.toml\n    \
                  deep-research-server                           # Start the server\n    \
                  deep-research-server --config my.toml serve    # Use a custom config file\n    \
                  deep-research-server research \"EV batteries\"   # Print a report to stdout"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "research.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server
    Serve,

    /// Scaffold research.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure (ollama, openai, or both)
        #[arg(long, default_value = "ollama", value_parser = ["ollama", "openai", "both"])]
        provider: String,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "8000")]
        port: u16,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file, including environment variables
        #[arg(long)]
        validate: bool,
    },

    /// Research a query and print the report as markdown
    Research {
        /// The research query
        query: String,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
