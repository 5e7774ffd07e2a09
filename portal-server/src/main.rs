use anyhow::Result;
use portal_server::{AppState, Config, auth::session};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_timer(fmt::time::ChronoLocal::rfc_3339())
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(LevelFilter::INFO.into())
                        .from_env_lossy(),
                ),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let pool = database::connect(&config.database_url, config.pool_max_size)?;
    database::migrate(&pool).await?;

    let state = AppState::new(pool, config);
    tokio::spawn(session::sweep_expired(state.clone()));

    portal_server::serve(state).await
}
