//! content-resolver command-line interface
//!
//! - `configs`: load a configs directory and resolve a label selection
//! - `root-log`: extract build dependencies from a mock root log

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod configs;
pub mod root_log;

/// Resolve label-filtered package content configurations
#[derive(Parser)]
#[command(name = "content-resolver")]
#[command(about = "Resolve label-filtered package content configurations")]
#[command(version)]
pub struct Cli {
    /// Print debug information
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a configs directory and print the configs for a label selection
    Configs {
        /// Directory with YAML configuration files
        configs: Option<PathBuf>,

        /// Settings file (YAML); command-line options override it
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Comma-separated labels to filter by (no filtering if omitted)
        #[arg(short, long)]
        labels: Option<String>,

        /// Allowed architecture (repeatable)
        #[arg(short, long = "arch")]
        arches: Vec<String>,

        /// Fail on any invalid document instead of skipping it
        #[arg(long)]
        strict: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract direct build dependencies from a mock root.log
    RootLog {
        /// Path to the root.log file
        file: PathBuf,

        /// Source package the log belongs to
        #[arg(long, requires_all = ["view", "arch"])]
        srpm: Option<String>,

        /// View id for the relation document
        #[arg(long, requires = "srpm")]
        view: Option<String>,

        /// Architecture for the relation document
        #[arg(long, requires = "srpm")]
        arch: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Pretty-printed JSON
    Json,
}
