//! Storage gateway for the department portal.
//!
//! Owns the connection pool, the schema (applied by [`migrate`]), the row types
//! and one query module per entity. Query functions take any
//! [`GenericClient`](deadpool_postgres::GenericClient) so the same call works on
//! a pooled connection or inside a transaction.

pub mod error;
pub mod queries;
pub mod types;

pub use deadpool_postgres::{self, GenericClient};
pub use tokio_postgres;

pub use error::{Error, is_check_violation, is_foreign_key_violation, is_unique_violation};

use deadpool_postgres::{Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;

const SCHEMA: &str = include_str!("../../../schema.sql");

#[tracing::instrument(skip(database_url), err)]
pub fn connect(database_url: &str, max_size: usize) -> Result<Pool, Error> {
    let mut database_config = deadpool_postgres::Config::new();
    database_config.url = Some(database_url.to_string());
    database_config.pool = Some(PoolConfig::new(max_size));
    let pool = database_config.create_pool(Some(Runtime::Tokio1), NoTls)?;

    Ok(pool)
}

/// Applies `schema.sql`. Safe to run on every start-up.
#[tracing::instrument(skip(pool), err)]
pub async fn migrate(pool: &Pool) -> Result<(), Error> {
    let client = pool.get().await?;
    client.batch_execute(SCHEMA).await?;
    tracing::info!("schema is up to date");

    Ok(())
}
