use chrono::{DateTime, Utc};
use database::{
    deadpool_postgres::Pool,
    queries::{
        self,
        equipment::{Equipment, EquipmentFields},
        equipment_booking::{EquipmentBooking, EquipmentBookingFilter, NewEquipmentBooking},
    },
    types::{EquipmentBookingStatus, Permission},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Principal,
    error::{AppError, Result},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentBookingRequest {
    pub equipment_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentBookingReview {
    pub status: EquipmentBookingStatus,
    pub rejection_reason: Option<String>,
}

/// What a status change does to the equipment's `available` counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stock {
    Take,
    Return,
    Keep,
}

fn initial_status(equipment: &Equipment) -> EquipmentBookingStatus {
    if equipment.requires_approval {
        EquipmentBookingStatus::Pending
    } else {
        EquipmentBookingStatus::Approved
    }
}

fn transition(current: EquipmentBookingStatus, requested: EquipmentBookingStatus) -> Result<Stock> {
    use EquipmentBookingStatus::*;

    match (current, requested) {
        (Pending, Approved) => Ok(Stock::Take),
        (Pending, Rejected) => Ok(Stock::Keep),
        (Approved, Completed) => Ok(Stock::Return),
        (current, requested) => Err(AppError::bad_request(format!(
            "cannot move a {current} booking to {requested}"
        ))),
    }
}

/// `available` after changing the total from `current.quantity` to `quantity`.
fn shifted_available(current: &Equipment, quantity: i32) -> Result<i32> {
    if quantity < 0 {
        return Err(AppError::bad_request("quantity cannot be negative"));
    }

    let available = current.available + (quantity - current.quantity);
    if available < 0 {
        return Err(AppError::bad_request(format!(
            "{} units are booked out, quantity cannot drop to {quantity}",
            current.quantity - current.available
        )));
    }

    Ok(available)
}

fn unavailable() -> AppError {
    AppError::bad_request("equipment is not available")
}

#[tracing::instrument(skip(pool, principal), fields(user = %principal.id), err)]
pub async fn book(
    pool: &Pool,
    principal: &Principal,
    request: &EquipmentBookingRequest,
) -> Result<EquipmentBooking> {
    if request.start_time >= request.end_time {
        return Err(AppError::bad_request("start time must be before end time"));
    }

    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let Some(equipment) = queries::equipment::lock(&tx, request.equipment_id).await? else {
        return Err(AppError::bad_request("equipment does not exist"));
    };
    if equipment.available <= 0 {
        return Err(unavailable());
    }

    let status = initial_status(&equipment);
    if status == EquipmentBookingStatus::Approved
        && queries::equipment::take_unit(&tx, equipment.id).await?.is_none()
    {
        return Err(unavailable());
    }

    let id = queries::equipment_booking::insert(
        &tx,
        &NewEquipmentBooking {
            equipment_id: equipment.id,
            user_id: principal.id,
            user_name: &principal.name,
            user_role: &principal.role.name,
            start_time: request.start_time,
            end_time: request.end_time,
            purpose: request.purpose.as_deref(),
            status,
        },
    )
    .await?;
    let booking = queries::equipment_booking::get(&tx, id)
        .await?
        .ok_or(AppError::NotFound("equipment booking"))?;
    tx.commit().await?;

    tracing::info!(booking = %id, %status, "equipment booked");
    Ok(booking)
}

#[tracing::instrument(skip(pool), err)]
pub async fn review(
    pool: &Pool,
    id: Uuid,
    review: &EquipmentBookingReview,
) -> Result<EquipmentBooking> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let booking = queries::equipment_booking::lock(&tx, id)
        .await?
        .ok_or(AppError::NotFound("equipment booking"))?;
    match transition(booking.status, review.status)? {
        Stock::Take => {
            queries::equipment::lock(&tx, booking.equipment_id).await?;
            if queries::equipment::take_unit(&tx, booking.equipment_id)
                .await?
                .is_none()
            {
                return Err(unavailable());
            }
        }
        Stock::Return => {
            queries::equipment::return_unit(&tx, booking.equipment_id).await?;
        }
        Stock::Keep => {}
    }

    let reason = match review.status {
        EquipmentBookingStatus::Rejected => review.rejection_reason.as_deref(),
        _ => None,
    };
    queries::equipment_booking::set_status(&tx, id, review.status, reason).await?;
    let booking = queries::equipment_booking::get(&tx, id)
        .await?
        .ok_or(AppError::NotFound("equipment booking"))?;
    tx.commit().await?;

    Ok(booking)
}

pub async fn list_bookings(
    pool: &Pool,
    principal: &Principal,
    mut filter: EquipmentBookingFilter,
) -> Result<Vec<EquipmentBooking>> {
    if !principal.has(Permission::ViewEquipmentBookings) {
        filter.user_id = Some(principal.id);
    }

    let client = pool.get().await?;
    Ok(queries::equipment_booking::list(&client, &filter).await?)
}

pub async fn create(pool: &Pool, fields: &EquipmentFields) -> Result<Equipment> {
    if fields.quantity < 0 {
        return Err(AppError::bad_request("quantity cannot be negative"));
    }

    let client = pool.get().await?;
    let id = queries::equipment::insert(&client, fields).await?;

    queries::equipment::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("equipment"))
}

/// Rewrites an item; a quantity change moves `available` by the same amount.
#[tracing::instrument(skip(pool), err)]
pub async fn update(pool: &Pool, id: Uuid, fields: &EquipmentFields) -> Result<Equipment> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let current = queries::equipment::lock(&tx, id)
        .await?
        .ok_or(AppError::NotFound("equipment"))?;
    let available = shifted_available(&current, fields.quantity)?;

    queries::equipment::update(&tx, id, fields, available).await?;
    let equipment = queries::equipment::get(&tx, id)
        .await?
        .ok_or(AppError::NotFound("equipment"))?;
    tx.commit().await?;

    Ok(equipment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equipment(quantity: i32, available: i32, requires_approval: bool) -> Equipment {
        Equipment {
            id: Uuid::new_v4(),
            name: "Oscilloscope".to_string(),
            category_id: None,
            category: None,
            specs: None,
            quantity,
            available,
            requires_approval,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn approval_policy_picks_the_initial_status() {
        assert_eq!(
            initial_status(&equipment(1, 1, true)),
            EquipmentBookingStatus::Pending
        );
        assert_eq!(
            initial_status(&equipment(1, 1, false)),
            EquipmentBookingStatus::Approved
        );
    }

    #[test]
    fn transitions_move_stock() {
        use EquipmentBookingStatus::*;

        assert_eq!(transition(Pending, Approved).unwrap(), Stock::Take);
        assert_eq!(transition(Pending, Rejected).unwrap(), Stock::Keep);
        assert_eq!(transition(Approved, Completed).unwrap(), Stock::Return);
    }

    #[test]
    fn there_is_no_way_back() {
        use EquipmentBookingStatus::*;

        for (from, to) in [
            (Approved, Pending),
            (Approved, Rejected),
            (Rejected, Approved),
            (Completed, Approved),
            (Pending, Completed),
            (Pending, Pending),
        ] {
            assert!(transition(from, to).is_err(), "{from} -> {to}");
        }
    }

    #[test]
    fn quantity_changes_shift_availability() {
        let current = equipment(5, 2, true);

        assert_eq!(shifted_available(&current, 8).unwrap(), 5);
        assert_eq!(shifted_available(&current, 3).unwrap(), 0);
        assert!(shifted_available(&current, 2).is_err());
        assert!(shifted_available(&current, -1).is_err());
    }
}
