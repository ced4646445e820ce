use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;

/// Apply pending schema migrations to DATABASE_URL
pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database).await?;
    let result = DatabaseManager::migrate(&pool).await;
    DatabaseManager::close(&pool).await;
    result?;

    output_success(&output_format, "Migrations applied", Some(json!({ "migrated": true })))
}
