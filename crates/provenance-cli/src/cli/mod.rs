//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::{Context as _, Result};
use args::{Cli, Commands};
use clap::Parser;
use provenance::Config;
use tracing_subscriber::EnvFilter;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Load configuration
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    // Create context for commands
    let ctx = commands::Context {
        config,
        output_format: cli.output.unwrap_or_default(),
    };

    // Dispatch to appropriate command
    match cli.command {
        Commands::Ca(args) => commands::ca::execute(&ctx, args),
        Commands::Challenge(args) => commands::challenge::execute(&ctx, &args),
        Commands::Enroll(args) => commands::enroll::execute(&ctx, args).await,
        Commands::Status(args) => commands::status::execute(&ctx, args.identity).await,
        Commands::Activate(args) => commands::manage::activate(&ctx, args.identity, true).await,
        Commands::Deactivate(args) => commands::manage::activate(&ctx, args.identity, false).await,
        Commands::Revoke(args) => commands::manage::revoke(&ctx, args.identity).await,
        Commands::Verify(args) => commands::verify::execute(&ctx, args).await,
    }
}

/// Log to stderr, filtered by `RUST_LOG` or else by `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
