use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use database::{
    deadpool_postgres, is_check_violation, is_foreign_key_violation, is_unique_violation,
    tokio_postgres,
};
use serde_json::json;
use uuid::Uuid;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("failed to get a pooled connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<timeslot::Error> for AppError {
    fn from(error: timeslot::Error) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message.clone()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
            AppError::Postgres(error) if is_unique_violation(error) => (
                StatusCode::CONFLICT,
                String::from("resource already exists"),
            ),
            AppError::Postgres(error) if is_foreign_key_violation(error) => (
                StatusCode::BAD_REQUEST,
                String::from("referenced resource does not exist"),
            ),
            AppError::Postgres(error) if is_check_violation(error) => (
                StatusCode::BAD_REQUEST,
                String::from("value out of range"),
            ),
            AppError::Postgres(_) | AppError::Pool(_) | AppError::Internal(_) => {
                let correlation_id = Uuid::new_v4();
                tracing::error!(%correlation_id, error = ?self, "request failed");

                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "internal server error",
                        "correlationId": correlation_id,
                    })),
                )
                    .into_response();
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let (status, body) = render(AppError::bad_request("time slot unavailable")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "time slot unavailable" }));

        let (status, body) = render(AppError::NotFound("event")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "event not found" }));

        let (status, _) = render(AppError::Unauthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) = render(AppError::Internal(anyhow::anyhow!("disk on fire"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
        assert!(body["correlationId"].as_str().is_some());
        assert!(!body.to_string().contains("disk"));
    }
}
