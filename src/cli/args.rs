// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::bots::{RequestParameters, PRIMARY_INPUT};

/// act-as - talk to configurable bot personas
#[derive(Parser, Debug)]
#[command(name = "act-as")]
#[command(version, about = "Serve configurable bot personas against an LLM")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file path (defaults to ~/.act-as/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding bot YAML files
    #[arg(long, global = true)]
    pub bots_dir: Option<PathBuf>,

    /// Model to use instead of the configured default
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available bots
    #[command(alias = "ls")]
    List,

    /// Show a bot definition
    Show(ShowArgs),

    /// Get a complete reply from a bot
    Reply(ReplyArgs),

    /// Stream a reply from a bot token by token
    Stream(ReplyArgs),
}

/// Arguments for the show subcommand
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Bot name (file name without extension)
    pub name: String,
}

/// Arguments for the reply and stream subcommands
#[derive(clap::Args, Debug)]
pub struct ReplyArgs {
    /// Bot name (file name without extension)
    pub name: String,

    /// Primary input passed as the `message` parameter
    #[arg(short = 'M', long)]
    pub message: Option<String>,

    /// Extra template parameters as key=value
    #[arg(short, long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,
}

impl ReplyArgs {
    /// Collect template parameters; `--message` wins over `-p message=...`
    pub fn params(&self) -> RequestParameters {
        let mut params: RequestParameters = self.params.iter().cloned().collect();
        if let Some(message) = &self.message {
            params.insert(PRIMARY_INPUT.to_string(), message.clone());
        }
        params
    }
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Output format options
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Text,

    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_list() {
        let cli = Cli::parse_from(["act-as", "list"]);
        assert!(matches!(cli.command, Commands::List));
        assert_eq!(cli.verbose, 0);
        assert!(matches!(cli.format, OutputFormat::Text));
    }

    #[test]
    fn test_cli_list_alias() {
        let cli = Cli::parse_from(["act-as", "ls"]);
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_cli_show() {
        let cli = Cli::parse_from(["act-as", "show", "calculator"]);
        match cli.command {
            Commands::Show(args) => assert_eq!(args.name, "calculator"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_reply_with_params() {
        let cli = Cli::parse_from([
            "act-as", "reply", "translate", "-M", "Hello", "-p", "to=French",
        ]);
        let Commands::Reply(args) = cli.command else {
            panic!("expected reply");
        };
        let params = args.params();
        assert_eq!(params.get("message").map(String::as_str), Some("Hello"));
        assert_eq!(params.get("to").map(String::as_str), Some("French"));
    }

    #[test]
    fn test_message_flag_overrides_param() {
        let cli = Cli::parse_from([
            "act-as", "stream", "echo", "-p", "message=old", "--message", "new",
        ]);
        let Commands::Stream(args) = cli.command else {
            panic!("expected stream");
        };
        assert_eq!(args.params()["message"], "new");
    }

    #[test]
    fn test_param_value_may_contain_equals() {
        assert_eq!(
            parse_key_val("expr=1+1=2").unwrap(),
            ("expr".to_string(), "1+1=2".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "act-as",
            "-vv",
            "--bots-dir",
            "/srv/bots",
            "--model",
            "gpt-4o",
            "--format",
            "json",
            "list",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.bots_dir, Some(PathBuf::from("/srv/bots")));
        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
