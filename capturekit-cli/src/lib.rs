//! CaptureKit command line
//!
//! Commands:
//! - `capturekit [capture]`: run one capture session
//! - `capturekit init [--force]`: write the sample configuration
//! - `capturekit sort [--descending]`: back up and sort the categories
//! - `capturekit check`: list the configured categories
//!
//! Exit codes:
//! - 0: Success, skipped capture, or no configuration yet
//! - 1: Error
//! - 2: Capture aborted

pub mod cli;
pub mod commands;
pub mod logging;
pub mod prompts;

pub use cli::{CaptureArgs, Cli, Commands};
pub use commands::{CommandContext, EXIT_ABORTED, EXIT_ERROR, EXIT_OK};

use capturekit_config::SettingsLoader;
use colored::Colorize;

/// Load settings, set up logging and dispatch the command
pub async fn run(cli: Cli) -> i32 {
    let settings = match SettingsLoader::for_root(&cli.root).load(&cli.overrides()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            return EXIT_ERROR;
        }
    };
    logging::init_tracing(settings.debug, cli.verbose);

    let ctx = CommandContext::new(&cli.root, settings);
    let result = match &cli.command {
        None => commands::run_capture(&ctx, &CaptureArgs::default()).await,
        Some(Commands::Capture(args)) => commands::run_capture(&ctx, args).await,
        Some(Commands::Init { force }) => commands::run_init(&ctx, *force).await,
        Some(Commands::Sort { .. }) => commands::run_sort(&ctx).await,
        Some(Commands::Check) => commands::run_check(&ctx).await,
    };

    result.unwrap_or_else(|e| {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        EXIT_ERROR
    })
}
