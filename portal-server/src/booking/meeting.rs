use chrono::{DateTime, NaiveDate, Utc};
use database::{
    GenericClient,
    deadpool_postgres::Pool,
    queries::{
        self,
        meeting::{Meeting, MeetingFields, MeetingFilter},
    },
    types::{MeetingStatus, MeetingType, RsvpStatus},
};
use serde::{Deserialize, Serialize};
use timeslot::{Interval, TimeOfDay};
use uuid::Uuid;

use crate::{
    auth::Principal,
    config::Config,
    error::{AppError, Result},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRequest {
    pub faculty_id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub meeting_type: Option<MeetingType>,
    pub notes: Option<String>,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingChanges {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<TimeOfDay>,
    pub end_time: Option<TimeOfDay>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub meeting_type: Option<MeetingType>,
    pub status: Option<MeetingStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rsvp {
    pub rsvp_status: RsvpStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub faculty_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<Interval>,
}

fn is_past(meeting: &Meeting, now: DateTime<Utc>) -> bool {
    let today = now.date_naive();
    meeting.date < today
        || (meeting.date == today && meeting.end_time <= TimeOfDay::from(now.time()))
}

fn check_date(date: NaiveDate, now: DateTime<Utc>) -> Result<()> {
    if date < now.date_naive() {
        return Err(AppError::bad_request("meeting date cannot be in the past"));
    }

    Ok(())
}

fn ensure_participant(meeting: &Meeting, principal: &Principal) -> Result<()> {
    if meeting.faculty_id == principal.id || meeting.student_id == principal.id {
        return Ok(());
    }

    Err(AppError::NotFound("meeting"))
}

fn ensure_free(busy: &[Interval], wanted: &Interval) -> Result<()> {
    if let Some(taken) = busy.iter().find(|taken| taken.overlaps(wanted)) {
        return Err(AppError::bad_request(format!(
            "time slot unavailable, faculty is busy {taken}"
        )));
    }

    Ok(())
}

fn apply(meeting: &Meeting, changes: &MeetingChanges) -> Result<MeetingFields> {
    Ok(MeetingFields {
        title: changes.title.clone().unwrap_or_else(|| meeting.title.clone()),
        date: changes.date.unwrap_or(meeting.date),
        interval: Interval::new(
            changes.start_time.unwrap_or(meeting.start_time),
            changes.end_time.unwrap_or(meeting.end_time),
        )?,
        location: changes.location.clone().or_else(|| meeting.location.clone()),
        meeting_type: changes.meeting_type.unwrap_or(meeting.meeting_type),
        status: changes.status.unwrap_or(meeting.status),
        notes: changes.notes.clone().or_else(|| meeting.notes.clone()),
    })
}

async fn visible_meeting(client: &impl GenericClient, id: Uuid, principal: &Principal) -> Result<Meeting> {
    let meeting = queries::meeting::get(client, id)
        .await?
        .ok_or(AppError::NotFound("meeting"))?;
    ensure_participant(&meeting, principal)?;

    Ok(meeting)
}

#[tracing::instrument(skip(pool, principal), fields(user = %principal.id), err)]
pub async fn create(
    pool: &Pool,
    principal: &Principal,
    request: &MeetingRequest,
    now: DateTime<Utc>,
) -> Result<Meeting> {
    if principal.id != request.faculty_id && principal.id != request.student_id {
        return Err(AppError::Forbidden(
            "only a participant can schedule a meeting".to_string(),
        ));
    }
    check_date(request.date, now)?;
    let interval = Interval::new(request.start_time, request.end_time)?;

    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    if queries::faculty::get(&tx, request.faculty_id).await?.is_none() {
        return Err(AppError::bad_request("faculty member does not exist"));
    }
    if queries::user::get(&tx, request.student_id).await?.is_none() {
        return Err(AppError::bad_request("student does not exist"));
    }

    queries::meeting::lock_faculty_day(&tx, request.faculty_id, request.date).await?;
    let busy = queries::meeting::busy_intervals(&tx, request.faculty_id, request.date, None).await?;
    ensure_free(&busy, &interval)?;

    let fields = MeetingFields {
        title: request.title.clone(),
        date: request.date,
        interval,
        location: request.location.clone(),
        meeting_type: request.meeting_type.unwrap_or(MeetingType::General),
        status: MeetingStatus::Scheduled,
        notes: request.notes.clone(),
    };
    let id = queries::meeting::insert(&tx, request.faculty_id, request.student_id, &fields).await?;
    let meeting = queries::meeting::get(&tx, id)
        .await?
        .ok_or(AppError::NotFound("meeting"))?;
    tx.commit().await?;

    tracing::info!(meeting = %id, "meeting scheduled");
    Ok(meeting)
}

#[tracing::instrument(skip(pool, principal), fields(user = %principal.id), err)]
pub async fn update(
    pool: &Pool,
    principal: &Principal,
    id: Uuid,
    changes: &MeetingChanges,
    now: DateTime<Utc>,
) -> Result<Meeting> {
    let mut client = pool.get().await?;
    let before = visible_meeting(&client, id, principal).await?;
    let tx = client.transaction().await?;

    // days are always locked in date order
    let target_date = changes.date.unwrap_or(before.date);
    let mut days = [before.date, target_date];
    days.sort();
    queries::meeting::lock_faculty_day(&tx, before.faculty_id, days[0]).await?;
    if days[0] != days[1] {
        queries::meeting::lock_faculty_day(&tx, before.faculty_id, days[1]).await?;
    }

    let meeting = visible_meeting(&tx, id, principal).await?;
    if is_past(&meeting, now) {
        return Err(AppError::bad_request("cannot change a meeting that is over"));
    }

    let fields = apply(&meeting, changes)?;
    if fields.date != meeting.date {
        check_date(fields.date, now)?;
    }
    if fields.status != MeetingStatus::Cancelled {
        let busy =
            queries::meeting::busy_intervals(&tx, meeting.faculty_id, fields.date, Some(id)).await?;
        ensure_free(&busy, &fields.interval)?;
    }

    queries::meeting::update(&tx, id, &fields).await?;
    let meeting = queries::meeting::get(&tx, id)
        .await?
        .ok_or(AppError::NotFound("meeting"))?;
    tx.commit().await?;

    Ok(meeting)
}

pub async fn get(pool: &Pool, principal: &Principal, id: Uuid) -> Result<Meeting> {
    let client = pool.get().await?;
    visible_meeting(&client, id, principal).await
}

pub async fn list(pool: &Pool, principal: &Principal, filter: &MeetingFilter) -> Result<Vec<Meeting>> {
    let client = pool.get().await?;
    Ok(queries::meeting::list_for_participant(&client, principal.id, filter).await?)
}

pub async fn rsvp(pool: &Pool, principal: &Principal, id: Uuid, rsvp: &Rsvp) -> Result<Meeting> {
    let client = pool.get().await?;
    visible_meeting(&client, id, principal).await?;
    queries::meeting::set_rsvp(&client, id, rsvp.rsvp_status).await?;

    visible_meeting(&client, id, principal).await
}

pub async fn delete(pool: &Pool, principal: &Principal, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    visible_meeting(&client, id, principal).await?;
    queries::meeting::delete(&client, id).await?;

    Ok(())
}

/// Free slots of the working day for a faculty member on `date`.
pub async fn availability(
    pool: &Pool,
    config: &Config,
    faculty_id: Uuid,
    date: NaiveDate,
) -> Result<Availability> {
    let client = pool.get().await?;
    if queries::faculty::get(&client, faculty_id).await?.is_none() {
        return Err(AppError::NotFound("faculty member"));
    }

    let busy = queries::meeting::busy_intervals(&client, faculty_id, date, None).await?;
    let slots = timeslot::free_slots(config.working_day()?, config.meeting_slot_minutes, &busy)?;

    Ok(Availability {
        faculty_id,
        date,
        slots,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn iv(start: &str, end: &str) -> Interval {
        Interval::new(t(start), t(end)).unwrap()
    }

    fn meeting(date: &str, start: &str, end: &str) -> Meeting {
        Meeting {
            id: Uuid::new_v4(),
            faculty_id: Uuid::new_v4(),
            faculty_name: "Dr. Rahman".to_string(),
            student_id: Uuid::new_v4(),
            student_name: "Nadia".to_string(),
            title: "Thesis check-in".to_string(),
            date: date.parse().unwrap(),
            start_time: t(start),
            end_time: t(end),
            location: Some("Room 402".to_string()),
            meeting_type: MeetingType::Thesis,
            status: MeetingStatus::Scheduled,
            rsvp_status: RsvpStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn overlapping_request_is_refused() {
        let busy = [iv("10:00", "11:00")];

        let error = ensure_free(&busy, &iv("10:30", "11:30")).unwrap_err();
        assert!(error.to_string().contains("time slot unavailable"));
    }

    #[test]
    fn back_to_back_meetings_are_fine() {
        let busy = [iv("10:00", "11:00")];

        assert!(ensure_free(&busy, &iv("11:00", "11:30")).is_ok());
        assert!(ensure_free(&busy, &iv("09:00", "10:00")).is_ok());
    }

    #[test]
    fn meeting_is_past_once_it_ends_today() {
        let m = meeting("2025-09-01", "10:00", "11:00");
        let at = |h, min| Utc.with_ymd_and_hms(2025, 9, 1, h, min, 0).unwrap();

        assert!(!is_past(&m, at(10, 30)));
        assert!(is_past(&m, at(11, 0)));
        assert!(is_past(&m, Utc.with_ymd_and_hms(2025, 9, 2, 8, 0, 0).unwrap()));
        assert!(!is_past(&m, Utc.with_ymd_and_hms(2025, 8, 31, 23, 0, 0).unwrap()));
    }

    #[test]
    fn today_is_still_bookable() {
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 16, 0, 0).unwrap();

        assert!(check_date("2025-09-01".parse().unwrap(), now).is_ok());
        assert!(check_date("2025-08-31".parse().unwrap(), now).is_err());
    }

    #[test]
    fn changes_fall_back_to_current_values() {
        let m = meeting("2025-09-01", "10:00", "11:00");
        let changes = MeetingChanges {
            end_time: Some(t("11:30")),
            status: Some(MeetingStatus::Confirmed),
            ..MeetingChanges::default()
        };

        let fields = apply(&m, &changes).unwrap();
        assert_eq!(fields.interval, iv("10:00", "11:30"));
        assert_eq!(fields.status, MeetingStatus::Confirmed);
        assert_eq!(fields.title, "Thesis check-in");
        assert_eq!(fields.location.as_deref(), Some("Room 402"));
    }

    #[test]
    fn changes_cannot_invert_the_interval() {
        let m = meeting("2025-09-01", "10:00", "11:00");
        let changes = MeetingChanges {
            start_time: Some(t("12:00")),
            ..MeetingChanges::default()
        };

        assert!(matches!(apply(&m, &changes), Err(AppError::BadRequest(_))));
    }
}
