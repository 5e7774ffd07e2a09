use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use postgres_types::Json;
use serde::{Deserialize, Serialize};
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::CourseDifficulty;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub credits: i32,
    pub difficulty: CourseDifficulty,
    pub prerequisites: Vec<String>,
    pub program_id: Uuid,
    pub semester: i32,
    pub year: i32,
    pub created_at: DateTime<Utc>,
}

impl Course {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            code: row.try_get("code")?,
            title: row.try_get("title")?,
            credits: row.try_get("credits")?,
            difficulty: row.try_get("difficulty")?,
            prerequisites: row.try_get::<_, Json<Vec<String>>>("prerequisites")?.0,
            program_id: row.try_get("program_id")?,
            semester: row.try_get("semester")?,
            year: row.try_get("year")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub code: String,
    pub title: String,
    pub credits: i32,
    pub difficulty: CourseDifficulty,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub program_id: Uuid,
    pub semester: i32,
    pub year: i32,
}

pub async fn list(
    client: &impl GenericClient,
    program_id: Option<Uuid>,
    semester: Option<i32>,
) -> Result<Vec<Course>, Error> {
    let stmt = client
        .prepare_cached(
            "SELECT * FROM courses \
             WHERE ($1::uuid IS NULL OR program_id = $1) \
               AND ($2::int4 IS NULL OR semester = $2) \
             ORDER BY year, semester, code",
        )
        .await?;
    client
        .query(&stmt, &[&program_id, &semester])
        .await?
        .iter()
        .map(Course::from_row)
        .collect()
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<Course>, Error> {
    let stmt = client
        .prepare_cached("SELECT * FROM courses WHERE id = $1")
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Course::from_row)
        .transpose()
}

pub async fn insert(client: &impl GenericClient, course: &NewCourse) -> Result<Course, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO courses (code, title, credits, difficulty, prerequisites, program_id, semester, year) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .await?;
    let row = client
        .query_one(
            &stmt,
            &[
                &course.code,
                &course.title,
                &course.credits,
                &course.difficulty,
                &Json(&course.prerequisites),
                &course.program_id,
                &course.semester,
                &course.year,
            ],
        )
        .await?;

    Course::from_row(&row)
}

pub async fn delete(client: &impl GenericClient, id: Uuid) -> Result<Option<Course>, Error> {
    let stmt = client
        .prepare_cached("DELETE FROM courses WHERE id = $1 RETURNING *")
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Course::from_row)
        .transpose()
}
