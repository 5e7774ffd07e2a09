use std::{sync::Arc, time::Duration};

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use database::queries;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::AppState;

pub const COOKIE_NAME: &str = "SESSION";

/// 256 random bits, hex encoded.
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn cookie(token: String, expires_at: DateTime<Utc>, secure: bool) -> anyhow::Result<Cookie<'static>> {
    let expires = OffsetDateTime::from_unix_timestamp(expires_at.timestamp())?;

    Ok(Cookie::build((COOKIE_NAME, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .secure(secure)
        .expires(expires)
        .build())
}

/// The value handed to [`CookieJar::remove`](axum_extra::extract::CookieJar::remove)
/// so the browser drops the session cookie.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(COOKIE_NAME).path("/").build()
}

/// Periodically deletes sessions that have expired.
#[tracing::instrument(skip(state))]
pub async fn sweep_expired(state: Arc<AppState>) {
    let period = Duration::from_secs(state.config.session_sweep_interval_secs.max(1));
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        let removed = match state.pool.get().await {
            Ok(client) => queries::session::delete_expired(&client, Utc::now()).await,
            Err(error) => {
                tracing::warn!(%error, "session sweep could not get a connection");
                continue;
            }
        };
        match removed {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "removed expired sessions"),
            Err(error) => tracing::warn!(%error, "session sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn tokens_are_long_and_url_safe() {
        let token = generate_token();

        assert_eq!(token.len(), 64);
        assert!(token.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn cookie_carries_the_session_policy() {
        let expires_at = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();
        let rendered = cookie("abc".to_string(), expires_at, true).unwrap().to_string();

        assert!(rendered.starts_with("SESSION=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Expires=Mon, 01 Sep 2025 12:00:00 GMT"));
    }

    #[test]
    fn insecure_cookie_for_plain_http() {
        let rendered = cookie("abc".to_string(), Utc::now(), false).unwrap().to_string();
        assert!(!rendered.contains("Secure"));
    }
}
