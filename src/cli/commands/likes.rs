use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_collection, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, LikeStore, PgStore};

#[derive(Subcommand)]
pub enum LikesCommands {
    #[command(about = "List posts whose like_count disagrees with their like rows")]
    Audit,

    #[command(about = "Reset drifted like counters to the number of like rows")]
    Repair {
        #[arg(long, help = "Only report what would change")]
        dry_run: bool,
    },
}

pub async fn handle(cmd: LikesCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database).await?;
    let store = PgStore::new(pool.clone());

    let result = run(&store, cmd, &output_format).await;
    DatabaseManager::close(&pool).await;
    result
}

async fn run(store: &dyn LikeStore, cmd: LikesCommands, output_format: &OutputFormat) -> anyhow::Result<()> {
    match cmd {
        LikesCommands::Audit => {
            let drift = store.like_count_drift().await?;
            if drift.is_empty() {
                return output_success(output_format, "All like counters match", Some(json!({ "drift": [] })));
            }
            output_collection(output_format, "drift", &drift, |d| {
                format!("{}  recorded={}  actual={}", d.post_id, d.recorded, d.actual)
            })
        }
        LikesCommands::Repair { dry_run: true } => {
            let drift = store.like_count_drift().await?;
            output_success(
                output_format,
                &format!("{} post(s) would be repaired", drift.len()),
                Some(json!({ "would_repair": drift.len() })),
            )
        }
        LikesCommands::Repair { dry_run: false } => {
            let repaired = store.repair_like_counts().await?;
            tracing::info!("Repaired like_count on {} post(s)", repaired);
            output_success(
                output_format,
                &format!("Repaired {} post(s)", repaired),
                Some(json!({ "repaired": repaired })),
            )
        }
    }
}
