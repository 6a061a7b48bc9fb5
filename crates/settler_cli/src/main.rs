//! Settler CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Template error

use std::process::ExitCode;

use clap::Parser;
use settler_templates::TemplateError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, CliError, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose {
        "settler_cli=debug,settler_templates=debug"
    } else if cli.quiet {
        "warn"
    } else {
        "settler_cli=info,settler_templates=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Render(args) => commands::render::execute(args).await,
        Commands::Placeholders(args) => commands::placeholders::execute(args).await,
        Commands::Check(args) => commands::check::execute(args).await,
        Commands::Apply(args) => commands::apply::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(cli_error) = e.chain().find_map(|cause| cause.downcast_ref::<CliError>()) {
        return match cli_error {
            CliError::ValidationFailed(_) => ExitCodes::VALIDATION_FAILURE,
            CliError::NoOutputPath(_) => ExitCodes::INVALID_ARGS,
        };
    }

    let template_error = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<TemplateError>());

    match template_error {
        Some(err) if err.is_validation_error() => ExitCodes::VALIDATION_FAILURE,
        Some(err) if err.is_template_error() => ExitCodes::TEMPLATE_ERROR,
        Some(TemplateError::UnsupportedFormat(_)) => ExitCodes::INVALID_ARGS,
        _ => ExitCodes::GENERAL_ERROR,
    }
}
