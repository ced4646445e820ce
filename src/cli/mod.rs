pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::client::ClientError;
use crate::config;

#[derive(Parser)]
#[command(name = "hub")]
#[command(about = "PhD Hub operator CLI")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "Audit and repair denormalised like counters")]
    Likes {
        #[command(subcommand)]
        cmd: commands::likes::LikesCommands,
    },

    #[command(about = "Mint session and webhook tokens")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Drive the feed against a running server")]
    Feed {
        #[command(subcommand)]
        cmd: commands::feed::FeedCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Stable code for a failed command, when its cause carries one
pub fn error_code(err: &anyhow::Error) -> Option<&str> {
    match err.downcast_ref::<ClientError>() {
        Some(ClientError::Api { code, .. }) => Some(code.as_str()),
        Some(ClientError::Transport(_)) => Some("TRANSPORT_ERROR"),
        Some(ClientError::Decode(_)) => Some("DECODE_ERROR"),
        None => None,
    }
}

/// Print a failed command's error so `--json` callers still get JSON
pub fn report_error(output_format: &OutputFormat, err: &anyhow::Error, verbose: bool) -> anyhow::Result<()> {
    let message = if verbose { format!("{:?}", err) } else { err.to_string() };
    utils::output_error(output_format, &message, error_code(err))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = config::config();

    match cli.command {
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::Likes { cmd } => commands::likes::handle(cmd, config, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, config, output_format).await,
        Commands::Feed { cmd } => commands::feed::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_commands() {
        let cli = Cli::try_parse_from(["hub", "--json", "likes", "repair", "--dry-run"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Likes {
                cmd: commands::likes::LikesCommands::Repair { dry_run: true }
            }
        ));

        let cli = Cli::try_parse_from(["hub", "token", "mint", "user_1", "--hours", "2"]).unwrap();
        assert!(matches!(cli.command, Commands::Token { .. }));
    }

    #[test]
    fn api_failures_keep_their_code() {
        let err = anyhow::Error::from(ClientError::Api {
            status: 404,
            code: "NOT_FOUND".into(),
            message: "Post not found".into(),
        });
        assert_eq!(error_code(&err), Some("NOT_FOUND"));
        assert!(report_error(&OutputFormat::Json, &err, false).is_ok());

        let other = anyhow::anyhow!("DATABASE_URL is not set");
        assert_eq!(error_code(&other), None);
    }

    #[test]
    fn feed_requires_valid_ids() {
        assert!(Cli::try_parse_from(["hub", "feed", "show", "not-a-uuid"]).is_err());
    }
}
