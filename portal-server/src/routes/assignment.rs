use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use database::{
    queries::{
        assignment::{Assignment, AssignmentFields, AssignmentFilter},
        submission::Submission,
    },
    types::Permission,
};
use uuid::Uuid;

use crate::{
    assignment::{self, GradeRequest, SubmissionRequest},
    auth::Principal,
    error::Result,
    extract::{Json, Path, Query},
    state::AppState,
};

async fn list(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Query(filter): Query<AssignmentFilter>,
) -> Result<Json<Vec<Assignment>>> {
    Ok(Json(assignment::list(&state.pool, &filter).await?))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Assignment>> {
    Ok(Json(assignment::get(&state.pool, id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(fields): Json<AssignmentFields>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::ManageAssignments)?;

    let assignment = assignment::create(&state.pool, &principal, &fields, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(fields): Json<AssignmentFields>,
) -> Result<Json<Assignment>> {
    principal.require(Permission::ManageAssignments)?;

    Ok(Json(
        assignment::update(&state.pool, &principal, id, &fields).await?,
    ))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    principal.require(Permission::ManageAssignments)?;

    assignment::delete(&state.pool, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submissions(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Submission>>> {
    principal.require(Permission::ManageAssignments)?;

    Ok(Json(
        assignment::submissions(&state.pool, &principal, id).await?,
    ))
}

async fn my_submissions(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<Submission>>> {
    Ok(Json(assignment::my_submissions(&state.pool, &principal).await?))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(request): Json<SubmissionRequest>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::SubmitAssignment)?;

    let submission = assignment::submit(&state.pool, &principal, &request, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

async fn grade(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(submission_id): Path<Uuid>,
    Json(request): Json<GradeRequest>,
) -> Result<Json<Submission>> {
    principal.require(Permission::ManageAssignments)?;

    Ok(Json(
        assignment::grade(&state.pool, &principal, submission_id, &request, Utc::now()).await?,
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/assignments", get(list).post(create))
        .route("/api/assignments/submit", post(submit))
        .route("/api/assignments/my-submissions", get(my_submissions))
        .route("/api/assignments/grade/{submission_id}", post(grade))
        .route(
            "/api/assignments/{id}",
            get(get_one).put(update).delete(delete),
        )
        .route("/api/assignments/{id}/submissions", get(submissions))
}
