// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! act-as - bot personas from the terminal
//!
//! Entry point for the act-as CLI application.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;

use act_as::api::{BotService, ErrorResponse};
use act_as::bots::BotRegistry;
use act_as::cli::{Cli, Commands, OutputFormat, ReplyArgs};
use act_as::config::Settings;
use act_as::error::Result;
use act_as::inference::Predictor;
use act_as::llm::factory::ProviderFactory;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` shows prompts and responses, `-vv` adds every token.
    // `RUST_LOG` still takes precedence.
    let directive = match cli.verbose {
        0 => None,
        1 => Some("act_as=debug"),
        _ => Some("act_as=trace"),
    };
    if let Some(directive) = directive {
        if let Ok(parsed) = directive.parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let format = cli.format;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let response = ErrorResponse::from_error(&e);
            match format {
                OutputFormat::Json => {
                    let body = serde_json::to_string(&response)
                        .unwrap_or_else(|_| format!("{{\"message\":{:?}}}", response.message));
                    eprintln!("{}", body);
                }
                OutputFormat::Text => eprintln!("Error: {}", response.message),
            }
            if response.is_client_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    let registry = Arc::new(BotRegistry::from_settings(&settings));

    match cli.command {
        Commands::List => {
            let names = registry.names()?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
                OutputFormat::Text => names.iter().for_each(|name| println!("{}", name)),
            }
        }
        Commands::Show(args) => {
            let bot = registry.fetch(&args.name)?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(bot)?),
                OutputFormat::Text => print!("{}", serde_yaml::to_string(bot)?),
            }
        }
        Commands::Reply(args) => {
            let service = service(registry, &settings, true)?;
            let reply = service.reply(&args.name, args.params()).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reply)?),
                OutputFormat::Text => println!("{}", reply.reply),
            }
        }
        Commands::Stream(args) => {
            // Tokens already go to stdout, so skip the stderr echo
            let service = service(registry, &settings, false)?;
            stream(&service, &args, cli.format).await?;
        }
    }

    Ok(())
}

/// Settings file, then environment, then command-line flags
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => {
            let mut settings = Settings::load_from(path)?;
            settings.apply_env(|key| std::env::var(key).ok())?;
            settings
        }
        None => Settings::load()?,
    };

    if let Some(dir) = &cli.bots_dir {
        settings.bots.path = dir.clone();
    }
    if let Some(model) = &cli.model {
        settings.llm.default_model = model.clone();
    }

    tracing::debug!(
        bots = %settings.bots.path.display(),
        model = %settings.llm.default_model,
        "settings loaded"
    );
    Ok(settings)
}

fn service(registry: Arc<BotRegistry>, settings: &Settings, echo: bool) -> Result<BotService> {
    let provider = ProviderFactory::create(settings)?;
    let predictor = Predictor::from_settings(provider, settings).with_echo(echo);
    Ok(BotService::new(registry, predictor))
}

async fn stream(service: &BotService, args: &ReplyArgs, format: OutputFormat) -> Result<()> {
    let mut tokens = service.stream_reply(&args.name, args.params()).await?;
    let mut stdout = io::stdout();

    while let Some(token) = tokens.next().await {
        let token = token?;
        match format {
            OutputFormat::Json => writeln!(stdout, "{}", serde_json::to_string(&token)?)?,
            OutputFormat::Text => write!(stdout, "{}", token)?,
        }
        stdout.flush()?;
    }

    if matches!(format, OutputFormat::Text) {
        writeln!(stdout)?;
    }
    Ok(())
}
