use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use serde::Serialize;
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::{SubmissionStatus, SubmissionType};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub assignment_title: String,
    pub student_id: Uuid,
    pub student_name: String,
    pub content: String,
    pub submission_type: SubmissionType,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
}

impl Submission {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            assignment_id: row.try_get("assignment_id")?,
            assignment_title: row.try_get("assignment_title")?,
            student_id: row.try_get("student_id")?,
            student_name: row.try_get("student_name")?,
            content: row.try_get("content")?,
            submission_type: row.try_get("submission_type")?,
            submitted_at: row.try_get("submitted_at")?,
            status: row.try_get("status")?,
            grade: row.try_get("grade")?,
            feedback: row.try_get("feedback")?,
            graded_at: row.try_get("graded_at")?,
        })
    }
}

#[derive(Debug)]
pub struct SubmissionDraft<'a> {
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub content: &'a str,
    pub submission_type: SubmissionType,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
}

const SELECT: &str = "SELECT s.*, a.title AS assignment_title, u.name AS student_name \
                      FROM assignment_submissions s \
                      JOIN assignments a ON a.id = s.assignment_id \
                      JOIN users u ON u.id = s.student_id";

/// Inserts the submission, or overwrites the student's previous one for the
/// same assignment. The row id survives re-submission; any earlier grade is
/// cleared because the status is recomputed.
pub async fn upsert(client: &impl GenericClient, draft: &SubmissionDraft<'_>) -> Result<Uuid, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO assignment_submissions (assignment_id, student_id, content, \
             submission_type, submitted_at, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (assignment_id, student_id) DO UPDATE SET \
                content = EXCLUDED.content, \
                submission_type = EXCLUDED.submission_type, \
                submitted_at = EXCLUDED.submitted_at, \
                status = EXCLUDED.status, \
                grade = NULL, feedback = NULL, graded_at = NULL \
             RETURNING id",
        )
        .await?;
    let row = client
        .query_one(
            &stmt,
            &[
                &draft.assignment_id,
                &draft.student_id,
                &draft.content,
                &draft.submission_type,
                &draft.submitted_at,
                &draft.status,
            ],
        )
        .await?;

    row.try_get(0)
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<Submission>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE s.id = $1"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Submission::from_row)
        .transpose()
}

pub async fn lock(client: &impl GenericClient, id: Uuid) -> Result<Option<Submission>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE s.id = $1 FOR UPDATE OF s"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Submission::from_row)
        .transpose()
}

pub async fn list_for_assignment(
    client: &impl GenericClient,
    assignment_id: Uuid,
) -> Result<Vec<Submission>, Error> {
    let stmt = client
        .prepare_cached(&format!(
            "{SELECT} WHERE s.assignment_id = $1 ORDER BY s.submitted_at"
        ))
        .await?;
    client
        .query(&stmt, &[&assignment_id])
        .await?
        .iter()
        .map(Submission::from_row)
        .collect()
}

pub async fn list_for_student(
    client: &impl GenericClient,
    student_id: Uuid,
) -> Result<Vec<Submission>, Error> {
    let stmt = client
        .prepare_cached(&format!(
            "{SELECT} WHERE s.student_id = $1 ORDER BY s.submitted_at DESC"
        ))
        .await?;
    client
        .query(&stmt, &[&student_id])
        .await?
        .iter()
        .map(Submission::from_row)
        .collect()
}

pub async fn grade(
    client: &impl GenericClient,
    id: Uuid,
    grade: f64,
    feedback: Option<&str>,
    graded_at: DateTime<Utc>,
) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE assignment_submissions SET status = 'graded', grade = $2, feedback = $3, \
             graded_at = $4 WHERE id = $1",
        )
        .await?;
    client
        .execute(&stmt, &[&id, &grade, &feedback, &graded_at])
        .await
}
