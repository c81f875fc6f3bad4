pub mod cli;
pub mod tracing;

use crate::builder::ResponseBuilder;
use crate::domain::status;
use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, parse_code, parse_object};
use std::io::Write;

/// Application entry point. Initializes tracing, builds the configured
/// `ResponseBuilder` and prints the requested envelope as JSON on stdout.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing::init_tracing();

    let mut stdout = std::io::stdout().lock();

    let envelope = match &cli.command {
        Command::Codes => {
            for descriptor in status::all() {
                writeln!(stdout, "{}", serde_json::to_string(descriptor)?)?;
            }
            return Ok(());
        }
        Command::Make { code, args } => {
            let args = parse_object("args", args.as_deref())?;
            response_builder(&cli)?.make(parse_code(code), &args)?
        }
        Command::Forward { message, args } => {
            let message = parse_object("message", Some(message))?;
            let args = parse_object("args", args.as_deref())?;
            response_builder(&cli)?.forward(&message, &args)?
        }
    };

    writeln!(stdout, "{}", serde_json::to_string(&envelope)?)?;
    Ok(())
}

fn response_builder(cli: &Cli) -> anyhow::Result<ResponseBuilder> {
    let config = cli.builder_config()?;
    ::tracing::info!("Loaded settings");
    ResponseBuilder::new(config).context("Failed to initialize response builder")
}
