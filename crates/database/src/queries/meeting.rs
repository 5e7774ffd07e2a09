use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use deadpool_postgres::GenericClient;
use serde::{Deserialize, Serialize};
use timeslot::{Interval, TimeOfDay};
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::{MeetingStatus, MeetingType, RsvpStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: Uuid,
    pub faculty_id: Uuid,
    pub faculty_name: String,
    pub student_id: Uuid,
    pub student_name: String,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub meeting_type: MeetingType,
    pub status: MeetingStatus,
    pub rsvp_status: RsvpStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            faculty_id: row.try_get("faculty_id")?,
            faculty_name: row.try_get("faculty_name")?,
            student_id: row.try_get("student_id")?,
            student_name: row.try_get("student_name")?,
            title: row.try_get("title")?,
            date: row.try_get("date")?,
            start_time: row.try_get::<_, NaiveTime>("start_time")?.into(),
            end_time: row.try_get::<_, NaiveTime>("end_time")?.into(),
            location: row.try_get("location")?,
            meeting_type: row.try_get("meeting_type")?,
            status: row.try_get("status")?,
            rsvp_status: row.try_get("rsvp_status")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    pub fn interval(&self) -> Interval {
        Interval {
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Column values written by both insert and update.
#[derive(Debug, Clone)]
pub struct MeetingFields {
    pub title: String,
    pub date: NaiveDate,
    pub interval: Interval,
    pub location: Option<String>,
    pub meeting_type: MeetingType,
    pub status: MeetingStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MeetingFilter {
    pub status: Option<MeetingStatus>,
    pub date: Option<NaiveDate>,
}

const SELECT: &str = "SELECT m.id, m.faculty_id, f.name AS faculty_name, m.student_id, \
                      s.name AS student_name, m.title, m.date, m.start_time, m.end_time, \
                      m.location, m.meeting_type, m.status, m.rsvp_status, m.notes, \
                      m.created_at, m.updated_at \
                      FROM meetings m \
                      JOIN users f ON f.id = m.faculty_id \
                      JOIN users s ON s.id = m.student_id";

/// Serialises every scheduling change for one faculty member on one day.
///
/// The advisory lock is released when the surrounding transaction ends.
pub async fn lock_faculty_day(
    client: &impl GenericClient,
    faculty_id: Uuid,
    date: NaiveDate,
) -> Result<(), Error> {
    let key = format!("meeting:{faculty_id}:{date}");
    let stmt = client
        .prepare_cached("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .await?;
    client.query_one(&stmt, &[&key]).await?;

    Ok(())
}

/// Time taken by non-cancelled meetings of a faculty member on `date`,
/// optionally ignoring one meeting.
pub async fn busy_intervals(
    client: &impl GenericClient,
    faculty_id: Uuid,
    date: NaiveDate,
    excluding: Option<Uuid>,
) -> Result<Vec<Interval>, Error> {
    let stmt = client
        .prepare_cached(
            "SELECT start_time, end_time FROM meetings \
             WHERE faculty_id = $1 AND date = $2 AND status <> 'cancelled' \
               AND ($3::uuid IS NULL OR id <> $3) \
             ORDER BY start_time",
        )
        .await?;
    client
        .query(&stmt, &[&faculty_id, &date, &excluding])
        .await?
        .iter()
        .map(|row| {
            Ok(Interval {
                start_time: row.try_get::<_, NaiveTime>(0)?.into(),
                end_time: row.try_get::<_, NaiveTime>(1)?.into(),
            })
        })
        .collect()
}

pub async fn insert(
    client: &impl GenericClient,
    faculty_id: Uuid,
    student_id: Uuid,
    fields: &MeetingFields,
) -> Result<Uuid, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO meetings (faculty_id, student_id, title, date, start_time, end_time, \
             location, meeting_type, status, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .await?;
    let row = client
        .query_one(
            &stmt,
            &[
                &faculty_id,
                &student_id,
                &fields.title,
                &fields.date,
                &NaiveTime::from(fields.interval.start_time),
                &NaiveTime::from(fields.interval.end_time),
                &fields.location,
                &fields.meeting_type,
                &fields.status,
                &fields.notes,
            ],
        )
        .await?;

    row.try_get(0)
}

pub async fn update(
    client: &impl GenericClient,
    id: Uuid,
    fields: &MeetingFields,
) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE meetings SET title = $2, date = $3, start_time = $4, end_time = $5, \
             location = $6, meeting_type = $7, status = $8, notes = $9, updated_at = now() \
             WHERE id = $1",
        )
        .await?;
    client
        .execute(
            &stmt,
            &[
                &id,
                &fields.title,
                &fields.date,
                &NaiveTime::from(fields.interval.start_time),
                &NaiveTime::from(fields.interval.end_time),
                &fields.location,
                &fields.meeting_type,
                &fields.status,
                &fields.notes,
            ],
        )
        .await
}

pub async fn set_rsvp(client: &impl GenericClient, id: Uuid, rsvp: RsvpStatus) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached("UPDATE meetings SET rsvp_status = $2, updated_at = now() WHERE id = $1")
        .await?;
    client.execute(&stmt, &[&id, &rsvp]).await
}

pub async fn delete(client: &impl GenericClient, id: Uuid) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached("DELETE FROM meetings WHERE id = $1")
        .await?;
    client.execute(&stmt, &[&id]).await
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<Meeting>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE m.id = $1"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Meeting::from_row)
        .transpose()
}

/// Meetings in which `user_id` takes part, as faculty or as student.
pub async fn list_for_participant(
    client: &impl GenericClient,
    user_id: Uuid,
    filter: &MeetingFilter,
) -> Result<Vec<Meeting>, Error> {
    let stmt = client
        .prepare_cached(&format!(
            "{SELECT} \
             WHERE (m.faculty_id = $1 OR m.student_id = $1) \
               AND ($2::meeting_status IS NULL OR m.status = $2) \
               AND ($3::date IS NULL OR m.date = $3) \
             ORDER BY m.date, m.start_time"
        ))
        .await?;
    client
        .query(&stmt, &[&user_id, &filter.status, &filter.date])
        .await?
        .iter()
        .map(Meeting::from_row)
        .collect()
}
