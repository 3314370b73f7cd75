//! quire CLI - minimal static site generator.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Minimal static site generator for Markdown posts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Site source directory
    #[arg(short = 'C', long = "source", default_value = ".", global = true)]
    source: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold posts/ and pages/ in the source directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Regenerate the whole site into _site/
    Build {
        /// Fail on undefined template variables
        #[arg(long)]
        strict: bool,
    },

    /// Preview the built site
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.source, yes)?;
        }
        Commands::Build { strict } => {
            commands::build::run(cli.source, strict)?;
        }
        Commands::Serve { port } => {
            commands::serve::run(cli.source, port).await?;
        }
    }

    Ok(())
}
