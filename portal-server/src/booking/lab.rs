use chrono::{DateTime, Datelike, NaiveDate, Utc};
use database::{
    deadpool_postgres::Pool,
    is_unique_violation,
    queries::{
        self,
        lab::TimeSlot,
        lab_booking::{LabBooking, LabBookingFilter},
    },
    types::{DayOfWeek, LabBookingStatus},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::Principal,
    error::{AppError, Result},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabBookingRequest {
    pub lab_id: Uuid,
    pub time_slot_id: Uuid,
    pub date: NaiveDate,
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabBookingReview {
    pub status: LabBookingStatus,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    #[serde(flatten)]
    pub slot: TimeSlot,
    pub available: bool,
}

fn check_slot_date(slot: &TimeSlot, lab_id: Uuid, date: NaiveDate, today: NaiveDate) -> Result<()> {
    if slot.lab_id != lab_id {
        return Err(AppError::bad_request("time slot does not belong to this lab"));
    }
    if date < today {
        return Err(AppError::bad_request("cannot book a date in the past"));
    }
    if DayOfWeek::from(date.weekday()) != slot.day {
        return Err(AppError::bad_request(format!(
            "{date} is not a {} slot date",
            slot.day
        )));
    }

    Ok(())
}

/// Validates a review and returns the reason to store with it.
fn check_review(current: LabBookingStatus, review: &LabBookingReview) -> Result<Option<&str>> {
    use LabBookingStatus::*;

    let reason = review
        .rejection_reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty());

    match (current, review.status) {
        (Pending, Approved) => Ok(None),
        (Pending | Approved, Rejected) => match reason {
            Some(reason) => Ok(Some(reason)),
            None => Err(AppError::bad_request("a rejection reason is required")),
        },
        (current, requested) => Err(AppError::bad_request(format!(
            "cannot move a {current} booking to {requested}"
        ))),
    }
}

#[tracing::instrument(skip(pool, principal), fields(user = %principal.id), err)]
pub async fn create(
    pool: &Pool,
    principal: &Principal,
    request: &LabBookingRequest,
    now: DateTime<Utc>,
) -> Result<LabBooking> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    if !queries::lab::exists(&tx, request.lab_id).await? {
        return Err(AppError::bad_request("lab does not exist"));
    }
    let Some(slot) = queries::lab::lock_time_slot(&tx, request.time_slot_id).await? else {
        return Err(AppError::bad_request("time slot does not exist"));
    };
    check_slot_date(&slot, request.lab_id, request.date, now.date_naive())?;

    let already_booked = || AppError::conflict("time slot is already booked for this date");
    if queries::lab_booking::slot_taken(&tx, slot.id, request.date).await? {
        return Err(already_booked());
    }

    let id = queries::lab_booking::insert(
        &tx,
        request.lab_id,
        principal.id,
        slot.id,
        request.date,
        request.purpose.as_deref(),
    )
    .await
    .map_err(|error| {
        if is_unique_violation(&error) {
            already_booked()
        } else {
            error.into()
        }
    })?;
    let booking = queries::lab_booking::get(&tx, id)
        .await?
        .ok_or(AppError::NotFound("lab booking"))?;
    tx.commit().await?;

    tracing::info!(booking = %id, "lab booking requested");
    Ok(booking)
}

#[tracing::instrument(skip(pool), err)]
pub async fn review(pool: &Pool, id: Uuid, review: &LabBookingReview) -> Result<LabBooking> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let current = queries::lab_booking::lock_status(&tx, id)
        .await?
        .ok_or(AppError::NotFound("lab booking"))?;
    let reason = check_review(current, review)?;

    queries::lab_booking::set_status(&tx, id, review.status, reason).await?;
    let booking = queries::lab_booking::get(&tx, id)
        .await?
        .ok_or(AppError::NotFound("lab booking"))?;
    tx.commit().await?;

    Ok(booking)
}

/// Bookings visible to `principal`: approvers see everything, everyone else
/// only their own.
pub async fn list(
    pool: &Pool,
    principal: &Principal,
    mut filter: LabBookingFilter,
) -> Result<Vec<LabBooking>> {
    if !principal.has(database::types::Permission::ApproveLabBooking) {
        filter.user_id = Some(principal.id);
    }

    let client = pool.get().await?;
    Ok(queries::lab_booking::list(&client, &filter).await?)
}

/// The lab's weekly slots for the weekday of `date`, each marked free or held.
pub async fn availability(pool: &Pool, lab_id: Uuid, date: NaiveDate) -> Result<Vec<SlotAvailability>> {
    let client = pool.get().await?;
    if !queries::lab::exists(&client, lab_id).await? {
        return Err(AppError::NotFound("lab"));
    }

    let slots = queries::lab::time_slots(&client, lab_id, Some(date.weekday().into())).await?;
    let taken = queries::lab_booking::taken_slot_ids(&client, lab_id, date).await?;

    Ok(slots
        .into_iter()
        .map(|slot| SlotAvailability {
            available: !taken.contains(&slot.id),
            slot,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use timeslot::TimeOfDay;

    use super::*;

    fn monday_slot(lab_id: Uuid) -> TimeSlot {
        TimeSlot {
            id: Uuid::new_v4(),
            lab_id,
            day: DayOfWeek::Monday,
            start_time: TimeOfDay::from_hm(9, 0).unwrap(),
            end_time: TimeOfDay::from_hm(11, 0).unwrap(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn review(status: LabBookingStatus, reason: Option<&str>) -> LabBookingReview {
        LabBookingReview {
            status,
            rejection_reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn slot_must_belong_to_the_lab() {
        let slot = monday_slot(Uuid::new_v4());
        let error = check_slot_date(&slot, Uuid::new_v4(), date("2025-09-08"), date("2025-09-01"));
        assert!(matches!(error, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn date_must_match_the_slot_weekday() {
        let lab_id = Uuid::new_v4();
        let slot = monday_slot(lab_id);
        let today = date("2025-09-01");

        assert!(check_slot_date(&slot, lab_id, date("2025-09-08"), today).is_ok());
        assert!(check_slot_date(&slot, lab_id, date("2025-09-01"), today).is_ok());
        assert!(check_slot_date(&slot, lab_id, date("2025-09-09"), today).is_err());
    }

    #[test]
    fn past_dates_are_refused() {
        let lab_id = Uuid::new_v4();
        let slot = monday_slot(lab_id);
        assert!(check_slot_date(&slot, lab_id, date("2025-08-25"), date("2025-09-01")).is_err());
    }

    #[test]
    fn pending_bookings_can_be_approved_or_rejected() {
        use LabBookingStatus::*;

        assert_eq!(check_review(Pending, &review(Approved, None)).unwrap(), None);
        assert_eq!(
            check_review(Pending, &review(Rejected, Some("  room closed "))).unwrap(),
            Some("room closed")
        );
    }

    #[test]
    fn rejection_needs_a_reason() {
        use LabBookingStatus::*;

        assert!(check_review(Pending, &review(Rejected, None)).is_err());
        assert!(check_review(Pending, &review(Rejected, Some("   "))).is_err());
    }

    #[test]
    fn approved_bookings_can_only_be_overridden_to_rejected() {
        use LabBookingStatus::*;

        assert!(check_review(Approved, &review(Rejected, Some("maintenance"))).is_ok());
        assert!(check_review(Approved, &review(Approved, None)).is_err());
        assert!(check_review(Approved, &review(Pending, None)).is_err());
        assert!(check_review(Rejected, &review(Approved, None)).is_err());
        assert!(check_review(Rejected, &review(Rejected, Some("again"))).is_err());
    }
}
