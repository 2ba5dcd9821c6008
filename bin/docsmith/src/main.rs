//! Docsmith CLI
//!
//! Documentation site generator for Markdown content.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Docsmith.
#[derive(Parser)]
#[command(
    name = "docsmith",
    version,
    about = "A documentation site generator with client-side search"
)]
struct Cli {
    /// Path to configuration file [default: docsmith.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build the site
    Build {
        /// Output directory (overrides build.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate configuration, navigation and content without writing output
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    docsmith::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { output } => {
            docsmith::cmd::build::run(cli.config.as_deref(), output.as_deref())?;
        }
        Commands::Check { strict } => {
            docsmith::cmd::check::run(cli.config.as_deref(), strict)?;
        }
    }

    Ok(())
}
