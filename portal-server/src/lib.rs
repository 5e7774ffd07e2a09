//! HTTP backend of the department portal.
//!
//! The router is built by [`app`] around a shared [`AppState`]. Handlers live
//! in `routes`, grouped by resource, and delegate anything transactional to
//! the component modules ([`booking`], [`assignment`], [`event`]).

pub mod assignment;
pub mod auth;
pub mod booking;
pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod routes;
pub mod state;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
};
use tokio::{
    net::TcpListener,
    signal::{
        ctrl_c,
        unix::{SignalKind, signal},
    },
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::Config;
pub use state::AppState;

fn cors(config: &Config) -> CorsLayer {
    let origins = config
        .cors_origins()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(origin, %error, "ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

pub fn app(state: Arc<AppState>) -> Router {
    routes::router()
        .layer(cors(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `state` until Ctrl-C or SIGTERM, then drains in-flight requests.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let address = format!("0.0.0.0:{}", state.config.port);
    let listener = TcpListener::bind(&address).await?;
    tracing::info!("server listening on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = ctrl_c().await {
            tracing::error!(%error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }

        tracing::info!("received Ctrl+C, shutting down");
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
