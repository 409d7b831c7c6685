use color_eyre::eyre::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Opens the pool a single run works with. Callers own it and close it when done.
pub async fn connect_db(config: &DbConfig) -> Result<PgPool> {
    let options = config.connect_options()?;
    info!(host = options.get_host(), "Connecting to db");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;
    info!("Connected");
    Ok(db_pool)
}
