use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use deadpool_postgres::GenericClient;
use serde::{Deserialize, Serialize};
use timeslot::TimeOfDay;
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::{DayOfWeek, LabBookingStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabBooking {
    pub id: Uuid,
    pub lab_id: Uuid,
    pub lab_name: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub time_slot_id: Uuid,
    pub day: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub date: NaiveDate,
    pub purpose: Option<String>,
    pub status: LabBookingStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LabBooking {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            lab_id: row.try_get("lab_id")?,
            lab_name: row.try_get("lab_name")?,
            user_id: row.try_get("user_id")?,
            user_name: row.try_get("user_name")?,
            time_slot_id: row.try_get("time_slot_id")?,
            day: row.try_get("day")?,
            start_time: row.try_get::<_, NaiveTime>("start_time")?.into(),
            end_time: row.try_get::<_, NaiveTime>("end_time")?.into(),
            date: row.try_get("date")?,
            purpose: row.try_get("purpose")?,
            status: row.try_get("status")?,
            rejection_reason: row.try_get("rejection_reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabBookingFilter {
    pub lab_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<LabBookingStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

const SELECT: &str = "SELECT b.id, b.lab_id, l.name AS lab_name, b.user_id, u.name AS user_name, \
                      b.time_slot_id, s.day, s.start_time, s.end_time, b.date, b.purpose, \
                      b.status, b.rejection_reason, b.created_at, b.updated_at \
                      FROM lab_bookings b \
                      JOIN labs l ON l.id = b.lab_id \
                      JOIN users u ON u.id = b.user_id \
                      JOIN lab_time_slots s ON s.id = b.time_slot_id";

/// Whether a pending or approved booking already holds `(time_slot_id, date)`.
pub async fn slot_taken(
    client: &impl GenericClient,
    time_slot_id: Uuid,
    date: NaiveDate,
) -> Result<bool, Error> {
    let stmt = client
        .prepare_cached(
            "SELECT 1 FROM lab_bookings \
             WHERE time_slot_id = $1 AND date = $2 AND status IN ('pending', 'approved')",
        )
        .await?;
    Ok(client
        .query_opt(&stmt, &[&time_slot_id, &date])
        .await?
        .is_some())
}

/// Slot ids of a lab held by a pending or approved booking on `date`.
pub async fn taken_slot_ids(
    client: &impl GenericClient,
    lab_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<Uuid>, Error> {
    let stmt = client
        .prepare_cached(
            "SELECT time_slot_id FROM lab_bookings \
             WHERE lab_id = $1 AND date = $2 AND status IN ('pending', 'approved')",
        )
        .await?;
    client
        .query(&stmt, &[&lab_id, &date])
        .await?
        .iter()
        .map(|row| row.try_get(0))
        .collect()
}

pub async fn insert(
    client: &impl GenericClient,
    lab_id: Uuid,
    user_id: Uuid,
    time_slot_id: Uuid,
    date: NaiveDate,
    purpose: Option<&str>,
) -> Result<Uuid, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO lab_bookings (lab_id, user_id, time_slot_id, date, purpose, status) \
             VALUES ($1, $2, $3, $4, $5, 'pending') RETURNING id",
        )
        .await?;
    let row = client
        .query_one(&stmt, &[&lab_id, &user_id, &time_slot_id, &date, &purpose])
        .await?;

    row.try_get(0)
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<LabBooking>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE b.id = $1"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(LabBooking::from_row)
        .transpose()
}

/// Current status of a booking, row-locked until the transaction ends.
pub async fn lock_status(
    client: &impl GenericClient,
    id: Uuid,
) -> Result<Option<LabBookingStatus>, Error> {
    let stmt = client
        .prepare_cached("SELECT status FROM lab_bookings WHERE id = $1 FOR UPDATE")
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .map(|row| row.try_get(0))
        .transpose()
}

pub async fn set_status(
    client: &impl GenericClient,
    id: Uuid,
    status: LabBookingStatus,
    rejection_reason: Option<&str>,
) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE lab_bookings SET status = $2, rejection_reason = $3, updated_at = now() \
             WHERE id = $1",
        )
        .await?;
    client
        .execute(&stmt, &[&id, &status, &rejection_reason])
        .await
}

pub async fn list(
    client: &impl GenericClient,
    filter: &LabBookingFilter,
) -> Result<Vec<LabBooking>, Error> {
    let stmt = client
        .prepare_cached(&format!(
            "{SELECT} \
             WHERE ($1::uuid IS NULL OR b.lab_id = $1) \
               AND ($2::uuid IS NULL OR b.user_id = $2) \
               AND ($3::lab_booking_status IS NULL OR b.status = $3) \
               AND ($4::date IS NULL OR b.date >= $4) \
               AND ($5::date IS NULL OR b.date <= $5) \
             ORDER BY b.date DESC, b.created_at DESC"
        ))
        .await?;
    client
        .query(
            &stmt,
            &[
                &filter.lab_id,
                &filter.user_id,
                &filter.status,
                &filter.date_from,
                &filter.date_to,
            ],
        )
        .await?
        .iter()
        .map(LabBooking::from_row)
        .collect()
}
