use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use postgres_types::Json;
use serde::{Deserialize, Serialize};
use tokio_postgres::{Error, Row};
use uuid::Uuid;

use crate::types::{AssignmentStatus, Attachment, SubmissionType};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub title: String,
    pub course_code: String,
    pub course_title: String,
    pub deadline: DateTime<Utc>,
    pub description: String,
    pub attachments: Vec<Attachment>,
    pub submission_type: SubmissionType,
    pub status: AssignmentStatus,
    pub faculty_id: Uuid,
    pub faculty_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    fn from_row(row: &Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            course_code: row.try_get("course_code")?,
            course_title: row.try_get("course_title")?,
            deadline: row.try_get("deadline")?,
            description: row.try_get("description")?,
            attachments: row.try_get::<_, Json<Vec<Attachment>>>("attachments")?.0,
            submission_type: row.try_get("submission_type")?,
            status: row.try_get("status")?,
            faculty_id: row.try_get("faculty_id")?,
            faculty_name: row.try_get("faculty_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentFields {
    pub title: String,
    pub course_code: String,
    pub course_title: String,
    pub deadline: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub submission_type: SubmissionType,
    pub status: Option<AssignmentStatus>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentFilter {
    pub course_code: Option<String>,
    pub status: Option<AssignmentStatus>,
    pub faculty_id: Option<Uuid>,
}

const SELECT: &str = "SELECT a.*, u.name AS faculty_name \
                      FROM assignments a JOIN users u ON u.id = a.faculty_id";

pub async fn list(
    client: &impl GenericClient,
    filter: &AssignmentFilter,
) -> Result<Vec<Assignment>, Error> {
    let stmt = client
        .prepare_cached(&format!(
            "{SELECT} \
             WHERE ($1::text IS NULL OR a.course_code = $1) \
               AND ($2::assignment_status IS NULL OR a.status = $2) \
               AND ($3::uuid IS NULL OR a.faculty_id = $3) \
             ORDER BY a.deadline, a.title"
        ))
        .await?;
    client
        .query(
            &stmt,
            &[&filter.course_code, &filter.status, &filter.faculty_id],
        )
        .await?
        .iter()
        .map(Assignment::from_row)
        .collect()
}

pub async fn get(client: &impl GenericClient, id: Uuid) -> Result<Option<Assignment>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE a.id = $1"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Assignment::from_row)
        .transpose()
}

/// Reads an assignment and share-locks it so the deadline and status cannot
/// change underneath a submission.
pub async fn get_for_share(
    client: &impl GenericClient,
    id: Uuid,
) -> Result<Option<Assignment>, Error> {
    let stmt = client
        .prepare_cached(&format!("{SELECT} WHERE a.id = $1 FOR SHARE OF a"))
        .await?;
    client
        .query_opt(&stmt, &[&id])
        .await?
        .as_ref()
        .map(Assignment::from_row)
        .transpose()
}

pub async fn insert(
    client: &impl GenericClient,
    faculty_id: Uuid,
    fields: &AssignmentFields,
) -> Result<Uuid, Error> {
    let stmt = client
        .prepare_cached(
            "INSERT INTO assignments (title, course_code, course_title, deadline, description, \
             attachments, submission_type, status, faculty_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .await?;
    let status = fields.status.unwrap_or(AssignmentStatus::Active);
    let row = client
        .query_one(
            &stmt,
            &[
                &fields.title,
                &fields.course_code,
                &fields.course_title,
                &fields.deadline,
                &fields.description,
                &Json(&fields.attachments),
                &fields.submission_type,
                &status,
                &faculty_id,
            ],
        )
        .await?;

    row.try_get(0)
}

pub async fn update(
    client: &impl GenericClient,
    id: Uuid,
    fields: &AssignmentFields,
    status: AssignmentStatus,
) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached(
            "UPDATE assignments SET title = $2, course_code = $3, course_title = $4, \
             deadline = $5, description = $6, attachments = $7, submission_type = $8, \
             status = $9, updated_at = now() WHERE id = $1",
        )
        .await?;
    client
        .execute(
            &stmt,
            &[
                &id,
                &fields.title,
                &fields.course_code,
                &fields.course_title,
                &fields.deadline,
                &fields.description,
                &Json(&fields.attachments),
                &fields.submission_type,
                &status,
            ],
        )
        .await
}

pub async fn delete(client: &impl GenericClient, id: Uuid) -> Result<u64, Error> {
    let stmt = client
        .prepare_cached("DELETE FROM assignments WHERE id = $1")
        .await?;
    client.execute(&stmt, &[&id]).await
}
