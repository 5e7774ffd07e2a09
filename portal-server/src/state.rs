use std::sync::Arc;

use database::deadpool_postgres::Pool;

use crate::config::Config;

pub struct AppState {
    pub pool: Pool,
    pub config: Config,
}

impl AppState {
    pub fn new(pool: Pool, config: Config) -> Arc<Self> {
        Arc::new(Self { pool, config })
    }
}
