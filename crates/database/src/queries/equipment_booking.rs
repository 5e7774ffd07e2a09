use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use serde::{Deserialize, Serialize};
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::EquipmentBookingStatus;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentBooking {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub equipment_name: String,
    pub user_id: Uuid,
    /// Snapshot taken when the booking was made.
    pub user_name: String,
    /// Snapshot taken when the booking was made.
    pub user_role: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub purpose: Option<String>,
    pub status: EquipmentBookingStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EquipmentBooking {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            equipment_id: row.try_get("equipment_id")?,
            equipment_name: row.try_get("equipment_name")?,
            user_id: row.try_get("user_id")?,
            user_name: row.try_get("user_name")?,
            user_role: row.try_get("user_role")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            purpose: row.try_get("purpose")?,
            status: row.try_get("status")?,
            rejection_reason: row.try_get("rejection_reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug)]
pub struct NewEquipmentBooking<'a> {
    pub equipment_id: Uuid,
    pub user_id: Uuid,
    pub user_name: &'a str,
    pub user_role: &'a str,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub purpose: Option<&'a str>,
    pub status: EquipmentBookingStatus,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentBookingFilter {
    pub equipment_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<EquipmentBookingStatus>,
}

const SELECT: &str = "SELECT b.id, b.equipment_id, e.name AS equipment_name, b.user_id, \
                      b.user_name, b.user_role, b.start_time, b.end_time, b.purpose, b.status, \
                      b.rejection_reason, b.created_at, b.updated_at \
                      FROM equipment_bookings b \
                      JOIN equipment e ON e.id = b.equipment_id";

pub async fn insert(
    client: &impl GenericClient,
    booking: &NewEquipmentBooking<'_>,
) -> Result<Uuid, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO equipment_bookings (equipment_id, user_id, user_name, user_role, \
             start_time, end_time, purpose, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .await?;
    let row = client
        .query_one(
            &stmt,
            &[
                &booking.equipment_id,
                &booking.user_id,
                &booking.user_name,
                &booking.user_role,
                &booking.start_time,
                &booking.end_time,
                &booking.purpose,
                &booking.status,
            ],
        )
        .await?;

    row.try_get(0)
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<EquipmentBooking>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE b.id = $1"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(EquipmentBooking::from_row)
        .transpose()
}

/// Reads a booking and row-locks it until the transaction ends.
pub async fn lock(client: &impl GenericClient, id: Uuid) -> Result<Option<EquipmentBooking>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE b.id = $1 FOR UPDATE OF b"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(EquipmentBooking::from_row)
        .transpose()
}

pub async fn set_status(
    client: &impl GenericClient,
    id: Uuid,
    status: EquipmentBookingStatus,
    rejection_reason: Option<&str>,
) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE equipment_bookings SET status = $2, \
             rejection_reason = COALESCE($3, rejection_reason), updated_at = now() \
             WHERE id = $1",
        )
        .await?;
    client
        .execute(&stmt, &[&id, &status, &rejection_reason])
        .await
}

pub async fn list(
    client: &impl GenericClient,
    filter: &EquipmentBookingFilter,
) -> Result<Vec<EquipmentBooking>, Error> {
    let stmt = client
        .prepare_cached(&format!(
            "{SELECT} \
             WHERE ($1::uuid IS NULL OR b.equipment_id = $1) \
               AND ($2::uuid IS NULL OR b.user_id = $2) \
               AND ($3::equipment_booking_status IS NULL OR b.status = $3) \
             ORDER BY b.start_time DESC, b.created_at DESC"
        ))
        .await?;
    client
        .query(&stmt, &[&filter.equipment_id, &filter.user_id, &filter.status])
        .await?
        .iter()
        .map(EquipmentBooking::from_row)
        .collect()
}
