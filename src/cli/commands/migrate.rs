use anyhow::Context;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::config;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let database = &config::config().database;

    let pool = DatabaseManager::connect(database)
        .await
        .context("failed to connect to DATABASE_URL")?;
    DatabaseManager::migrate(&pool).await.context("migration failed")?;
    pool.close().await;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "migrated": true })),
        OutputFormat::Text => println!("Migrations applied"),
    }
    Ok(())
}
