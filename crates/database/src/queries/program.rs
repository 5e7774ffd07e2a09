use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use postgres_types::Json;
use serde::{Deserialize, Serialize};
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::ProgramLevel;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: Uuid,
    pub title: String,
    pub level: ProgramLevel,
    pub duration: String,
    pub total_students: i32,
    pub total_courses: i32,
    pub total_credits: i32,
    pub specializations: Vec<String>,
    pub learning_objectives: Vec<String>,
    pub career_prospects: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Program {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            level: row.try_get("level")?,
            duration: row.try_get("duration")?,
            total_students: row.try_get("total_students")?,
            total_courses: row.try_get("total_courses")?,
            total_credits: row.try_get("total_credits")?,
            specializations: row.try_get::<_, Json<Vec<String>>>("specializations")?.0,
            learning_objectives: row
                .try_get::<_, Json<Vec<String>>>("learning_objectives")?
                .0,
            career_prospects: row.try_get::<_, Json<Vec<String>>>("career_prospects")?.0,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProgram {
    pub title: String,
    pub level: ProgramLevel,
    pub duration: String,
    #[serde(default)]
    pub total_students: i32,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub career_prospects: Vec<String>,
}

pub async fn list(client: &impl GenericClient) -> Result<Vec<Program>, Error> {
    let stmt = client
        .prepare_cached("SELECT * FROM programs ORDER BY level, title")
        .await?;
    client
        .query(&stmt, &[])
        .await?
        .iter()
        .map(Program::from_row)
        .collect()
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<Program>, Error> {
    let stmt = client
        .prepare_cached("SELECT * FROM programs WHERE id = $1")
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Program::from_row)
        .transpose()
}

pub async fn insert(client: &impl GenericClient, program: &NewProgram) -> Result<Program, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO programs (title, level, duration, total_students, \
             specializations, learning_objectives, career_prospects) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .await?;
    let row = client
        .query_one(
            &stmt,
            &[
                &program.title,
                &program.level,
                &program.duration,
                &program.total_students,
                &Json(&program.specializations),
                &Json(&program.learning_objectives),
                &Json(&program.career_prospects),
            ],
        )
        .await?;

    Program::from_row(&row)
}

/// Shifts the course and credit totals of a program. Returns the number of rows touched.
pub async fn adjust_totals(
    client: &impl GenericClient,
    id: Uuid,
    courses_delta: i32,
    credits_delta: i32,
) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE programs SET total_courses = total_courses + $2, \
             total_credits = total_credits + $3 WHERE id = $1",
        )
        .await?;
    client
        .execute(&stmt, &[&id, &courses_delta, &credits_delta])
        .await
}

/// Locks the program row for the rest of the transaction.
pub async fn lock(client: &impl GenericClient, id: Uuid) -> Result<bool, Error> {
    let stmt = client
        .prepare_cached("SELECT id FROM programs WHERE id = $1 FOR UPDATE")
        .await?;
    Ok(client.query_opt(&stmt, &[&id]).await?.is_some())
}
