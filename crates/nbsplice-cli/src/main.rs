//! nbsplice CLI - build documentation pages with executed notebook blocks.

mod build;
mod config;
mod html;
mod notebook;
mod page;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nbsplice_core::ExecutionMode;

use crate::config::BuildConfig;

#[derive(Parser)]
#[command(name = "nbsplice")]
#[command(about = "Build documentation pages with executed notebook blocks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: <source dir>/nbsplice.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every Markdown page in a directory to HTML
    Build {
        /// Source directory
        src: String,

        /// Output directory
        out: String,

        /// Default HoloViews backends (comma separated)
        #[arg(long)]
        backends: Option<String>,

        /// Path to the `jupyter` executable
        #[arg(long)]
        jupyter: Option<PathBuf>,

        /// Per-cell timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Execute notebooks even if they carry outputs
        #[arg(long)]
        force: bool,
    },

    /// Print the notebooks a page's directives would execute, without running them
    Notebook {
        /// Path to the page (.md file)
        page: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Helper to format nbsplice-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<nbsplice_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Build {
            src,
            out,
            backends,
            jupyter,
            timeout,
            force,
        } => {
            let mut config =
                BuildConfig::load(std::path::Path::new(&src), cli.config.as_deref())?;
            if let Some(backends) = backends {
                config.holoviews_backends =
                    Some(backends.split(',').map(|b| b.trim().to_string()).collect());
            }
            if jupyter.is_some() {
                config.jupyter = jupyter;
            }
            if timeout.is_some() {
                config.execution_timeout = timeout;
            }
            if force {
                config.execution_mode = Some(ExecutionMode::Force);
            }

            let summary = build::execute(&src, &out, &config).map_err(format_error)?;
            if summary.failed > 0 {
                tracing::warn!("{} directive(s) rendered as errors", summary.failed);
            }
        }

        Commands::Notebook { page } => {
            let srcdir = std::path::Path::new(&page)
                .parent()
                .unwrap_or(std::path::Path::new("."))
                .to_path_buf();
            let config = BuildConfig::load(&srcdir, cli.config.as_deref())?;
            notebook::execute(&page, &config).map_err(format_error)?;
        }
    }

    Ok(())
}
