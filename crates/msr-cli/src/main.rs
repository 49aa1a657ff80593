//! msr entry point.
//!
//! Thin: loads `.env.local`, sets up tracing and dispatches to `commands`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "msr")]
#[command(about = "Messaging subsystem reconciler developer CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print the operations replayed at boot, in order
    Plan {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Boot an in-memory deployment and apply an operation script to it
    Apply {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// JSON array of operations
        #[arg(long)]
        script: String,

        /// Run the whole script as one transaction
        #[arg(long, default_value_t = false)]
        composite: bool,

        /// Reload afterwards if any change was deferred
        #[arg(long, default_value_t = false)]
        reload: bool,
    },

    /// Boot an in-memory deployment and export its model as JSON
    Export {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Destination file
        #[arg(long)]
        out: String,
    },
}

fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::ConfigHash { paths } => commands::config_hash(&paths),
        Commands::Plan { config_paths } => commands::apply::plan(&config_paths),
        Commands::Apply {
            config_paths,
            script,
            composite,
            reload,
        } => commands::apply::apply(&config_paths, &script, composite, reload),
        Commands::Export { config_paths, out } => commands::export::export(&config_paths, &out),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
