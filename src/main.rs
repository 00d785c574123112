// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Repoviz CLI - draw repository diagrams in the terminal

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand};
use repoviz::commands::{self, Context};
use repoviz::config;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repoviz")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "REPOVIZ_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Diagram backend URL override
    #[arg(long, env = "REPOVIZ_BACKEND_URL", global = true)]
    backend: Option<String>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive TUI
    View {
        /// Reopen the stored diagram instead of starting at the input screen
        #[arg(long)]
        resume: bool,
    },

    /// Generate a diagram for a repository
    Generate {
        /// Repository URL
        url: String,

        /// Follow processing status until it finishes
        #[arg(long)]
        wait: bool,

        /// Do not store the result in the session
        #[arg(long)]
        ephemeral: bool,
    },

    /// Show the processing status of a repository
    Status {
        /// Repository URL (defaults to the stored repository)
        url: Option<String>,

        /// Poll until processing completes or fails
        #[arg(long)]
        watch: bool,
    },

    /// Ask a follow-up question about the stored diagram
    Ask {
        /// Question text
        question: String,
    },

    /// Render a local diagram description
    Render {
        /// Description file (stdin when absent or `-`)
        file: Option<PathBuf>,

        /// Exit with an error if the diagram cannot be drawn
        #[arg(long)]
        check: bool,
    },

    /// Print the stored diagram
    Show {
        /// Print the description instead of drawing it
        #[arg(long)]
        raw: bool,
    },

    /// Get or set configuration
    Config {
        /// Configuration key
        key: String,

        /// Value to set (omit to read)
        value: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        shell: clap_complete::Shell,
    },
}

fn log_filter(verbose: u8, quiet: bool) -> EnvFilter {
    let level = match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Log to stderr, or to a file while the TUI owns the screen
fn init_logging(cli: &Cli, log_dir: Option<&Path>) -> Result<()> {
    let filter = log_filter(cli.verbose, cli.quiet);
    match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
            let path = dir.join("repoviz.log");
            let file = File::options()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(!cli.no_color)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_path);
    let mut settings = config::load(&config_path)?;
    if let Some(url) = &cli.backend {
        settings.set("backend_url", url)?;
    }

    let log_dir = matches!(cli.command, Commands::View { .. }).then_some(settings.session_dir.as_path());
    init_logging(&cli, log_dir)?;

    let ctx = Context {
        settings,
        config_path,
        color: !cli.no_color,
    };

    match cli.command {
        Commands::View { resume } => commands::view::run(&ctx, resume).await,
        Commands::Generate {
            url,
            wait,
            ephemeral,
        } => commands::generate::run(&ctx, &url, wait, ephemeral).await,
        Commands::Status { url, watch } => commands::status::run(&ctx, url, watch).await,
        Commands::Ask { question } => commands::ask::run(&ctx, &question).await,
        Commands::Render { file, check } => commands::render::run(&ctx, file, check),
        Commands::Show { raw } => commands::show::run(&ctx, raw),
        Commands::Config { key, value } => commands::config::run(&ctx, &key, value),
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command())
        }
    }
}
