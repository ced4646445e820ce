use chrono::{Duration, Utc};
use clap::Subcommand;
use serde_json::json;

use crate::auth::{generate_jwt, issue_session_token};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::identity::webhook::WebhookClaims;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Mint a session token for a user id (development and testing)")]
    Mint {
        #[arg(help = "Identity-provider user id")]
        user_id: String,
        #[arg(long, help = "Lifetime in hours (defaults to SESSION_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },

    #[command(about = "Mint a bearer token for calling the identity webhook")]
    Webhook {
        #[arg(long, default_value = "hub-cli", help = "Issuer recorded in the token")]
        issuer: String,
        #[arg(long, default_value_t = 5, help = "Lifetime in minutes")]
        minutes: i64,
    },
}

pub async fn handle(cmd: TokenCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Mint { user_id, hours } => {
            let hours = hours.unwrap_or(config.security.session_expiry_hours);
            let token = issue_session_token(&user_id, &config.security.session_secret, hours)?;
            print_token(&output_format, &token, json!({ "user_id": user_id, "expires_in_hours": hours }))
        }
        TokenCommands::Webhook { issuer, minutes } => {
            let claims = WebhookClaims {
                iss: Some(issuer),
                exp: (Utc::now() + Duration::minutes(minutes)).timestamp(),
            };
            let token = generate_jwt(&claims, &config.security.webhook_secret)?;
            print_token(&output_format, &token, json!({ "expires_in_minutes": minutes }))
        }
    }
}

fn print_token(output_format: &OutputFormat, token: &str, details: serde_json::Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut data = details;
            data["token"] = json!(token);
            output_success(output_format, "Token minted", Some(data))
        }
        // Bare token so it can be captured by the shell
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn minting_needs_a_secret() {
        let mut config = AppConfig::development();
        let mint = || TokenCommands::Mint {
            user_id: "user_u".into(),
            hours: Some(1),
        };
        assert!(handle(mint(), &config, OutputFormat::Json).await.is_ok());

        config.security.session_secret.clear();
        assert!(handle(mint(), &config, OutputFormat::Text).await.is_err());
    }
}
