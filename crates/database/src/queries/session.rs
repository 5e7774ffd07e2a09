use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use tokio_postgres::{Error, Row};
use uuid::Uuid;

/// A session row joined to its user and role.
#[derive(Debug, Clone)]
pub struct SessionOwner {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role_id: i32,
    pub role_name: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionOwner {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            role_id: row.try_get("role_id")?,
            role_name: row.try_get("role_name")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

pub async fn insert(
    client: &impl GenericClient,
    token: &str,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
) -> Result<(), Error> {
    let stmt = client
        .prepare_cached("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .await?;
    client.execute(&stmt, &[&token, &user_id, &expires_at]).await?;

    Ok(())
}

pub async fn get_owner(
    client: &impl GenericClient,
    token: &str,
) -> Result<Option<SessionOwner>, Error> {
    let stmt = client
        .prepare_cached(
            "SELECT s.user_id, s.expires_at, u.name, u.email, \
                    r.id AS role_id, r.name AS role_name \
             FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             JOIN roles r ON r.id = u.role_id \
             WHERE s.token = $1",
        )
        .await?;
    client
        .query_opt(&stmt, &[&token])
        .await?
        .as_ref()
        .map(SessionOwner::from_row)
        .transpose()
}

pub async fn delete(client: &impl GenericClient, token: &str) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached("DELETE FROM sessions WHERE token = $1")
        .await?;
    client.execute(&stmt, &[&token]).await
}

/// Removes every session whose `expires_at` is at or before `now`.
pub async fn delete_expired(client: &impl GenericClient, now: DateTime<Utc>) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached("DELETE FROM sessions WHERE expires_at <= $1")
        .await?;
    client.execute(&stmt, &[&now]).await
}
