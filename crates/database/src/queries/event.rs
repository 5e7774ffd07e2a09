use chrono::{DateTime, NaiveDate, Utc};
use deadpool_postgres::GenericClient;
use postgres_types::Json;
use serde::{Deserialize, Serialize};
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::EventStatus;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub status: EventStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub venue: String,
    pub organizer_role_id: Option<i32>,
    pub organizer_role: Option<String>,
    pub registration_required: bool,
    pub max_participants: Option<i32>,
    pub registered_count: i32,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            event_type: row.try_get("event_type")?,
            status: row.try_get("status")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            venue: row.try_get("venue")?,
            organizer_role_id: row.try_get("organizer_role_id")?,
            organizer_role: row.try_get("organizer_role")?,
            registration_required: row.try_get("registration_required")?,
            max_participants: row.try_get("max_participants")?,
            registered_count: row.try_get("registered_count")?,
            registration_deadline: row.try_get("registration_deadline")?,
            tags: row.try_get::<_, Json<Vec<String>>>("tags")?.0,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub status: Option<EventStatus>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub venue: String,
    pub organizer_role: Option<String>,
    #[serde(default = "registration_required_default")]
    pub registration_required: bool,
    pub max_participants: Option<i32>,
    pub registration_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn registration_required_default() -> bool {
    true
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

const SELECT: &str = "SELECT e.*, r.name AS organizer_role \
                      FROM events e LEFT JOIN roles r ON r.id = e.organizer_role_id";

pub async fn list(client: &impl GenericClient, filter: &EventFilter) -> Result<Vec<Event>, Error> {
    let stmt = client
        .prepare_cached(&format!(
            "{SELECT} \
             WHERE ($1::event_status IS NULL OR e.status = $1) \
               AND ($2::text IS NULL OR lower(e.event_type) = lower($2)) \
             ORDER BY e.start_date, e.title"
        ))
        .await?;
    client
        .query(&stmt, &[&filter.status, &filter.event_type])
        .await?
        .iter()
        .map(Event::from_row)
        .collect()
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<Event>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE e.id = $1"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Event::from_row)
        .transpose()
}

/// Reads the event and holds its row lock until the transaction ends.
pub async fn lock(client: &impl GenericClient, id: Uuid) -> Result<Option<Event>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE e.id = $1 FOR UPDATE OF e"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Event::from_row)
        .transpose()
}

pub async fn insert(
    client: &impl GenericClient,
    fields: &EventFields,
    organizer_role_id: Option<i32>,
) -> Result<Uuid, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO events (title, description, event_type, status, start_date, end_date, \
             venue, organizer_role_id, registration_required, max_participants, \
             registration_deadline, tags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
        )
        .await?;
    let status = fields.status.unwrap_or(EventStatus::Upcoming);
    let row = client
        .query_one(
            &stmt,
            &[
                &fields.title,
                &fields.description,
                &fields.event_type,
                &status,
                &fields.start_date,
                &fields.end_date,
                &fields.venue,
                &organizer_role_id,
                &fields.registration_required,
                &fields.max_participants,
                &fields.registration_deadline,
                &Json(&fields.tags),
            ],
        )
        .await?;

    row.try_get(0)
}

/// Rewrites the editable columns. The registration counter is left alone.
pub async fn update(
    client: &impl GenericClient,
    id: Uuid,
    fields: &EventFields,
    status: EventStatus,
    organizer_role_id: Option<i32>,
) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE events SET title = $2, description = $3, event_type = $4, status = $5, \
             start_date = $6, end_date = $7, venue = $8, organizer_role_id = $9, \
             registration_required = $10, max_participants = $11, \
             registration_deadline = $12, tags = $13 \
             WHERE id = $1",
        )
        .await?;
    client
        .execute(
            &stmt,
            &[
                &id,
                &fields.title,
                &fields.description,
                &fields.event_type,
                &status,
                &fields.start_date,
                &fields.end_date,
                &fields.venue,
                &organizer_role_id,
                &fields.registration_required,
                &fields.max_participants,
                &fields.registration_deadline,
                &Json(&fields.tags),
            ],
        )
        .await
}

pub async fn delete(client: &impl GenericClient, id: Uuid) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached("DELETE FROM events WHERE id = $1")
        .await?;
    client.execute(&stmt, &[&id]).await
}

/// Bumps the counter unless the event is already full. Returns `false` when
/// no seat was left.
pub async fn increment_registered(client: &impl GenericClient, id: Uuid) -> Result<bool, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE events SET registered_count = registered_count + 1 \
             WHERE id = $1 \
               AND (max_participants IS NULL OR registered_count < max_participants)",
        )
        .await?;
    Ok(client.execute(&stmt, &[&id]).await? == 1)
}
