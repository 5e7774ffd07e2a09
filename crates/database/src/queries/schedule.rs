use chrono::NaiveTime;
use deadpool_postgres::GenericClient;
use serde::{Deserialize, Serialize};
use timeslot::TimeOfDay;
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::{ClassStatus, ClassType, DayOfWeek};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchedule {
    pub id: Uuid,
    pub course_code: String,
    #[serde(rename = "type")]
    pub class_type: ClassType,
    pub batch: String,
    pub semester: i32,
    pub day: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub room: String,
    pub instructor_id: Option<Uuid>,
    pub status: ClassStatus,
}

impl ClassSchedule {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            course_code: row.try_get("course_code")?,
            class_type: row.try_get("class_type")?,
            batch: row.try_get("batch")?,
            semester: row.try_get("semester")?,
            day: row.try_get("day")?,
            start_time: row.try_get::<_, NaiveTime>("start_time")?.into(),
            end_time: row.try_get::<_, NaiveTime>("end_time")?.into(),
            room: row.try_get("room")?,
            instructor_id: row.try_get("instructor_id")?,
            status: row.try_get("status")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClassSchedule {
    pub course_code: String,
    #[serde(rename = "type")]
    pub class_type: ClassType,
    pub batch: String,
    pub semester: i32,
    pub day: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub room: String,
    pub instructor_id: Option<Uuid>,
    pub status: Option<ClassStatus>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ScheduleFilter {
    pub batch: Option<String>,
    pub semester: Option<i32>,
    pub day: Option<DayOfWeek>,
}

pub async fn list(
    client: &impl GenericClient,
    filter: &ScheduleFilter,
) -> Result<Vec<ClassSchedule>, Error> {
    let stmt = client
        .prepare_cached(
            "SELECT * FROM class_schedules \
             WHERE ($1::text IS NULL OR batch = $1) \
               AND ($2::int4 IS NULL OR semester = $2) \
               AND ($3::day_of_week IS NULL OR day = $3) \
             ORDER BY day, start_time, course_code",
        )
        .await?;
    client
        .query(&stmt, &[&filter.batch, &filter.semester, &filter.day])
        .await?
        .iter()
        .map(ClassSchedule::from_row)
        .collect()
}

pub async fn insert(
    client: &impl GenericClient,
    schedule: &NewClassSchedule,
) -> Result<ClassSchedule, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO class_schedules (course_code, class_type, batch, semester, day, \
             start_time, end_time, room, instructor_id, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .await?;
    let status = schedule.status.unwrap_or(ClassStatus::Upcoming);
    let row = client
        .query_one(
            &stmt,
            &[
                &schedule.course_code,
                &schedule.class_type,
                &schedule.batch,
                &schedule.semester,
                &schedule.day,
                &NaiveTime::from(schedule.start_time),
                &NaiveTime::from(schedule.end_time),
                &schedule.room,
                &schedule.instructor_id,
                &status,
            ],
        )
        .await?;

    ClassSchedule::from_row(&row)
}
