//! GOTRS CLI - Command-line interface for the GOTRS ticketing API
//!
//! This is the main entry point for the `gotrs` binary, providing commands
//! for checking server health, sending requests and transferring files.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use gotrs_core::http::Method;
use gotrs_core::HttpClient;
use logging::{redaction, timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    control::set_override(cli.use_color());

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}", error::format_error(&e, control::SHOULD_COLORIZE.should_colorize()));

            if e.should_show_help() {
                eprintln!("\nFor more information, try '--help'");
            }

            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip(cli), fields(command = ?cli.command))]
async fn run(cli: Cli) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    if let Commands::Completions(args) = cli.command {
        return handlers::handle_completions(args);
    }

    let mut config = Config::load_with_file(cli.config.as_deref())?;
    config.apply_env()?;
    config.apply_cli(&cli);

    if let Ok(mut rendered) = serde_json::to_value(&config) {
        redaction::redact_json_value(&mut rendered);
        tracing::debug!(config = %rendered, "Effective configuration");
    }

    let client = HttpClient::new(config.client_config()?, config.authenticator())?;
    let mut output = OutputWriter::new(cli.output, cli.use_color(), cli.quiet);

    tracing::info!(
        base_url = %client.config().base_url,
        auth = %client.auth().auth_type(),
        "Executing command"
    );

    let result = match cli.command {
        Commands::Ping => handlers::handle_ping(&client, &mut output).await,
        Commands::Get(args) => {
            handlers::handle_query(Method::GET, args, &config, &client, &mut output).await
        }
        Commands::Delete(args) => {
            handlers::handle_query(Method::DELETE, args, &config, &client, &mut output).await
        }
        Commands::Post(args) => {
            handlers::handle_body(Method::POST, args, &config, &client, &mut output).await
        }
        Commands::Put(args) => {
            handlers::handle_body(Method::PUT, args, &config, &client, &mut output).await
        }
        Commands::Patch(args) => {
            handlers::handle_body(Method::PATCH, args, &config, &client, &mut output).await
        }
        Commands::Upload(args) => handlers::handle_upload(args, &config, &client, &mut output).await,
        Commands::Download(args) => {
            handlers::handle_download(args, &config, &client, &mut output).await
        }
        Commands::Completions(_) => Ok(()),
    };

    client.close();
    result
}

/// Initialize the logging system
fn init_logging(cli: &Cli) -> Result<()> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_env();
    logging_config.ansi = cli.use_color();

    if cli.quiet {
        logging_config.level = "error".to_string();
    }

    logging::init_logging(logging_config)
}
