use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use serde::Serialize;
use tokio_postgres::{Error, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl EventRegistration {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            event_id: row.try_get("event_id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            registered_at: row.try_get("registered_at")?,
        })
    }
}

#[derive(Debug)]
pub struct Registrant<'a> {
    pub user_id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
}

pub async fn exists(client: &impl GenericClient, event_id: Uuid, user_id: Uuid) -> Result<bool, Error> {
    let stmt = client
        .prepare_cached(
            "SELECT EXISTS (SELECT 1 FROM event_registrations WHERE event_id = $1 AND user_id = $2)",
        )
        .await?;
    client.query_one(&stmt, &[&event_id, &user_id]).await?.try_get(0)
}

pub async fn insert(
    client: &impl GenericClient,
    event_id: Uuid,
    registrant: &Registrant<'_>,
) -> Result<EventRegistration, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO event_registrations (event_id, user_id, name, email, phone) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .await?;
    let row = client
        .query_one(
            &stmt,
            &[
                &event_id,
                &registrant.user_id,
                &registrant.name,
                &registrant.email,
                &registrant.phone,
            ],
        )
        .await?;

    EventRegistration::from_row(&row)
}

pub async fn list_for_event(
    client: &impl GenericClient,
    event_id: Uuid,
) -> Result<Vec<EventRegistration>, Error> {
    let stmt = client
        .prepare_cached(
            "SELECT * FROM event_registrations WHERE event_id = $1 ORDER BY registered_at",
        )
        .await?;
    client
        .query(&stmt, &[&event_id])
        .await?
        .iter()
        .map(EventRegistration::from_row)
        .collect()
}
