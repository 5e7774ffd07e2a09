mod academics;
mod assignment;
mod auth;
mod equipment;
mod event;
mod faculty;
mod lab;
mod meeting;
mod user;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::state::AppState;

async fn ping() -> &'static str {
    "pong"
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(ping))
        .merge(auth::router())
        .merge(user::router())
        .merge(faculty::router())
        .merge(academics::router())
        .merge(lab::router())
        .merge(equipment::router())
        .merge(meeting::router())
        .merge(assignment::router())
        .merge(event::router())
}
