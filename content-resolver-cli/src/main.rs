//! content-resolver - label-filtered package content configurations
//!
//! Loads a directory of repository, environment, workload and view
//! definitions, resolves the configs for a label selection, and extracts
//! build dependencies from mock root logs.

use clap::Parser;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::configs::ConfigsOptions;
use commands::root_log::RelationTarget;
use commands::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "content_resolver=debug,convenient_content=debug,convenient_rootlog=debug"
    } else {
        "content_resolver=info,convenient_content=info,convenient_rootlog=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Configs {
            configs,
            settings,
            labels,
            arches,
            strict,
            format,
            output,
        } => commands::configs::execute(&ConfigsOptions {
            configs,
            settings,
            labels,
            arches,
            strict,
            format,
            output,
        }),
        Commands::RootLog {
            file,
            srpm,
            view,
            arch,
            format,
        } => {
            let relation = match (srpm.as_deref(), view.as_deref(), arch.as_deref()) {
                (Some(srpm), Some(view), Some(arch)) => Some(RelationTarget { srpm, view, arch }),
                _ => None,
            };
            commands::root_log::execute(&file, relation, format)
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {e}");
        process::exit(1);
    }
}
