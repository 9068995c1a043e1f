//! DriveDupe - Google Drive duplicate finder
//!
//! Lists files through the Drive API, groups them by the content checksum
//! Drive reports, selects redundant copies with configurable rules, and
//! moves them to the Drive trash. Removals can be saved as plans and
//! applied later.

pub mod actions;
pub mod cli;
pub mod commands;
pub mod config;
pub mod drive;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod plan;
pub mod progress;
pub mod prompt;
pub mod signal;

use std::io;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands};
use crate::commands::RunContext;
use crate::config::Config;
use crate::drive::{DriveClient, StoredToken, TokenStore};
use crate::error::ExitCode;
use crate::prompt::{prompt_confirm, TerminalResolver};

/// Build an authorized Drive client from the configuration.
///
/// A configured `access_token` wins over the token file.
///
/// # Errors
///
/// Returns an error if no token is available or the HTTP client cannot be built.
pub fn connect(config: &Config) -> Result<DriveClient> {
    let tokens = match &config.access_token {
        Some(token) => {
            log::debug!("Using access token from configuration");
            TokenStore::in_memory(StoredToken::bearer(token.clone()))?
        }
        None => {
            let path = config
                .token_file()
                .context("No token file configured; pass --token or set DRIVEDUPE_TOKEN_PATH")?;
            TokenStore::load(&path)?
        }
    }
    .with_default_token_uri(&config.token_uri);

    Ok(DriveClient::new(config.client_config(), tokens)?)
}

/// Run the command line application.
///
/// # Errors
///
/// Returns the error that aborted the command. Partial removal failures are
/// reported through the exit code instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    if cli.no_color {
        yansi::disable();
    }
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref());
    config.merge_cli(&cli);

    let handler = signal::install_handler()?;
    let ctx = RunContext::new(cli.quiet).with_shutdown_flag(handler.flag());

    let mut confirm = |question: &str| prompt_confirm(question, Some(false));
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Commands::Scan(args) => {
            let client = connect(&config)?;
            commands::run_scan(&client, args, &config, &ctx, &mut confirm, &mut out)
        }
        Commands::Pairwise(args) => {
            let client = connect(&config)?;
            let mut resolver = TerminalResolver::new(io::stdin().lock(), io::stderr());
            commands::run_pairwise(&client, args, &ctx, &mut resolver, &mut out)
        }
        Commands::Apply(args) => {
            let client = connect(&config)?;
            commands::run_apply(&client, args, &ctx, &mut confirm, &mut out)
        }
    }
}
