use std::{fs, path::PathBuf};

use tracing::info;

use super::PoolType;
use crate::error::Error;

const MIGRATION_FILES: [&str; 2] = ["subscription.sql", "system_message.sql"];

pub fn migration_path(dir: &str, file: &str) -> PathBuf {
    let mut buf = PathBuf::new();

    for chunk in [dir, "migration", "postgresql", file] {
        buf.push(chunk);
    }

    buf
}

/// Applies the schema files on startup. Statements are idempotent
/// (`CREATE TABLE IF NOT EXISTS`), so reruns are safe.
pub async fn run(pool: &PoolType) -> Result<(), Error> {
    let dir = env!("CARGO_MANIFEST_DIR");

    for file in MIGRATION_FILES {
        let path = migration_path(dir, file);
        let data = fs::read_to_string(&path)?;
        sqlx::raw_sql(data.as_str()).execute(pool).await?;
        info!("schema applied: {}", file);
    }

    Ok(())
}
