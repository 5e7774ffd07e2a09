//! Assignment lifecycle: authoring, submission and grading.

use chrono::{DateTime, Utc};
use database::{
    GenericClient,
    deadpool_postgres::Pool,
    queries::{
        self,
        assignment::{Assignment, AssignmentFields, AssignmentFilter},
        submission::{Submission, SubmissionDraft},
    },
    types::{AssignmentStatus, SubmissionStatus, SubmissionType},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Principal,
    error::{AppError, Result},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub assignment_id: Uuid,
    pub content: String,
    pub submission_type: SubmissionType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradeRequest {
    pub grade: f64,
    pub feedback: Option<String>,
}

/// On-time up to and including the deadline.
fn submission_status(deadline: DateTime<Utc>, now: DateTime<Utc>) -> SubmissionStatus {
    if now > deadline {
        SubmissionStatus::Late
    } else {
        SubmissionStatus::Submitted
    }
}

fn check_submission(assignment: &Assignment, request: &SubmissionRequest) -> Result<()> {
    if assignment.status == AssignmentStatus::Draft {
        return Err(AppError::bad_request("assignment is not open for submissions"));
    }
    if assignment.submission_type != request.submission_type {
        return Err(AppError::bad_request(format!(
            "assignment expects a {} submission",
            assignment.submission_type
        )));
    }
    if request.content.trim().is_empty() {
        return Err(AppError::bad_request("submission content is empty"));
    }

    Ok(())
}

fn check_grade(grade: f64) -> Result<()> {
    if grade > 0.0 && grade <= 100.0 {
        return Ok(());
    }

    Err(AppError::bad_request("grade must be greater than 0 and at most 100"))
}

fn ensure_owner(assignment: &Assignment, principal: &Principal) -> Result<()> {
    if assignment.faculty_id == principal.id {
        return Ok(());
    }

    tracing::debug!(user = %principal.id, assignment = %assignment.id, "not the assignment owner");
    Err(AppError::Forbidden(
        "only the assignment's author can do this".to_string(),
    ))
}

async fn owned(client: &impl GenericClient, id: Uuid, principal: &Principal) -> Result<Assignment> {
    let assignment = queries::assignment::get(client, id)
        .await?
        .ok_or(AppError::NotFound("assignment"))?;
    ensure_owner(&assignment, principal)?;

    Ok(assignment)
}

pub async fn list(pool: &Pool, filter: &AssignmentFilter) -> Result<Vec<Assignment>> {
    let client = pool.get().await?;
    Ok(queries::assignment::list(&client, filter).await?)
}

pub async fn get(pool: &Pool, id: Uuid) -> Result<Assignment> {
    let client = pool.get().await?;
    queries::assignment::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("assignment"))
}

#[tracing::instrument(skip(pool, principal), fields(user = %principal.id), err)]
pub async fn create(
    pool: &Pool,
    principal: &Principal,
    fields: &AssignmentFields,
    now: DateTime<Utc>,
) -> Result<Assignment> {
    if fields.deadline <= now {
        return Err(AppError::bad_request("deadline must be in the future"));
    }

    let client = pool.get().await?;
    let id = queries::assignment::insert(&client, principal.id, fields).await?;

    queries::assignment::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("assignment"))
}

#[tracing::instrument(skip(pool, principal), fields(user = %principal.id), err)]
pub async fn update(
    pool: &Pool,
    principal: &Principal,
    id: Uuid,
    fields: &AssignmentFields,
) -> Result<Assignment> {
    let client = pool.get().await?;
    let current = owned(&client, id, principal).await?;

    let status = fields.status.unwrap_or(current.status);
    queries::assignment::update(&client, id, fields, status).await?;

    queries::assignment::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("assignment"))
}

pub async fn delete(pool: &Pool, principal: &Principal, id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    owned(&client, id, principal).await?;
    queries::assignment::delete(&client, id).await?;

    Ok(())
}

pub async fn submissions(pool: &Pool, principal: &Principal, id: Uuid) -> Result<Vec<Submission>> {
    let client = pool.get().await?;
    owned(&client, id, principal).await?;

    Ok(queries::submission::list_for_assignment(&client, id).await?)
}

pub async fn my_submissions(pool: &Pool, principal: &Principal) -> Result<Vec<Submission>> {
    let client = pool.get().await?;
    Ok(queries::submission::list_for_student(&client, principal.id).await?)
}

/// Stores the principal's submission, replacing any earlier one.
#[tracing::instrument(skip(pool, principal), fields(user = %principal.id), err)]
pub async fn submit(
    pool: &Pool,
    principal: &Principal,
    request: &SubmissionRequest,
    now: DateTime<Utc>,
) -> Result<Submission> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let assignment = queries::assignment::get_for_share(&tx, request.assignment_id)
        .await?
        .ok_or(AppError::NotFound("assignment"))?;
    check_submission(&assignment, request)?;

    let status = submission_status(assignment.deadline, now);
    let id = queries::submission::upsert(
        &tx,
        &SubmissionDraft {
            assignment_id: assignment.id,
            student_id: principal.id,
            content: &request.content,
            submission_type: request.submission_type,
            submitted_at: now,
            status,
        },
    )
    .await?;
    let submission = queries::submission::get(&tx, id)
        .await?
        .ok_or(AppError::NotFound("submission"))?;
    tx.commit().await?;

    tracing::info!(submission = %id, %status, "assignment submitted");
    Ok(submission)
}

#[tracing::instrument(skip(pool, principal), fields(user = %principal.id), err)]
pub async fn grade(
    pool: &Pool,
    principal: &Principal,
    submission_id: Uuid,
    request: &GradeRequest,
    now: DateTime<Utc>,
) -> Result<Submission> {
    check_grade(request.grade)?;

    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let submission = queries::submission::lock(&tx, submission_id)
        .await?
        .ok_or(AppError::NotFound("submission"))?;
    owned(&tx, submission.assignment_id, principal).await?;

    queries::submission::grade(
        &tx,
        submission_id,
        request.grade,
        request.feedback.as_deref(),
        now,
    )
    .await?;
    let submission = queries::submission::get(&tx, submission_id)
        .await?
        .ok_or(AppError::NotFound("submission"))?;
    tx.commit().await?;

    Ok(submission)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn assignment(status: AssignmentStatus, submission_type: SubmissionType) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            title: "Lab 3".to_string(),
            course_code: "CSE-220".to_string(),
            course_title: "Data Structures".to_string(),
            deadline: Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap(),
            description: "Implement a treap".to_string(),
            attachments: Vec::new(),
            submission_type,
            status,
            faculty_id: Uuid::new_v4(),
            faculty_name: "Dr. Rahman".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(submission_type: SubmissionType, content: &str) -> SubmissionRequest {
        SubmissionRequest {
            assignment_id: Uuid::new_v4(),
            content: content.to_string(),
            submission_type,
        }
    }

    #[test]
    fn deadline_second_is_still_on_time() {
        let deadline = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap();

        assert_eq!(submission_status(deadline, deadline), SubmissionStatus::Submitted);
        assert_eq!(
            submission_status(deadline, deadline + chrono::Duration::seconds(1)),
            SubmissionStatus::Late
        );
    }

    #[test]
    fn drafts_do_not_take_submissions() {
        let draft = assignment(AssignmentStatus::Draft, SubmissionType::Link);
        assert!(check_submission(&draft, &request(SubmissionType::Link, "https://git.example/x")).is_err());
    }

    #[test]
    fn past_assignments_still_take_late_work() {
        let past = assignment(AssignmentStatus::Past, SubmissionType::Text);
        assert!(check_submission(&past, &request(SubmissionType::Text, "answer")).is_ok());
    }

    #[test]
    fn submission_type_must_match() {
        let active = assignment(AssignmentStatus::Active, SubmissionType::File);
        let error = check_submission(&active, &request(SubmissionType::Text, "answer")).unwrap_err();

        assert_eq!(error.to_string(), "assignment expects a file submission");
    }

    #[test]
    fn grade_range_excludes_zero() {
        assert!(check_grade(0.0).is_err());
        assert!(check_grade(-5.0).is_err());
        assert!(check_grade(100.5).is_err());
        assert!(check_grade(f64::NAN).is_err());
        assert!(check_grade(0.5).is_ok());
        assert!(check_grade(100.0).is_ok());
    }
}
