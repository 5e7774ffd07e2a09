//! Programs, courses and class schedules.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use database::{
    queries::{
        self,
        course::{Course, NewCourse},
        program::{NewProgram, Program},
        schedule::{ClassSchedule, NewClassSchedule, ScheduleFilter},
    },
    types::Permission,
};
use serde::Deserialize;
use timeslot::Interval;
use uuid::Uuid;

use crate::{
    auth::Principal,
    error::{AppError, Result},
    extract::{Json, Path, Query},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseFilter {
    program_id: Option<Uuid>,
    semester: Option<i32>,
}

async fn list_programs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Program>>> {
    let client = state.pool.get().await?;
    Ok(Json(queries::program::list(&client).await?))
}

async fn get_program(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Program>> {
    let client = state.pool.get().await?;
    let program = queries::program::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("program"))?;

    Ok(Json(program))
}

async fn create_program(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(program): Json<NewProgram>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::ManageCoursePrograms)?;

    let client = state.pool.get().await?;
    let program = queries::program::insert(&client, &program).await?;

    Ok((StatusCode::CREATED, Json(program)))
}

async fn list_courses(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CourseFilter>,
) -> Result<Json<Vec<Course>>> {
    let client = state.pool.get().await?;
    Ok(Json(
        queries::course::list(&client, filter.program_id, filter.semester).await?,
    ))
}

async fn get_course(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Course>> {
    let client = state.pool.get().await?;
    let course = queries::course::get(&client, id)
        .await?
        .ok_or(AppError::NotFound("course"))?;

    Ok(Json(course))
}

/// Adds a course and bumps the owning program's totals in one transaction.
async fn create_course(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(course): Json<NewCourse>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::ManageCoursePrograms)?;
    if course.credits <= 0 {
        return Err(AppError::bad_request("credits must be positive"));
    }

    let mut client = state.pool.get().await?;
    let tx = client.transaction().await?;

    if !queries::program::lock(&tx, course.program_id).await? {
        return Err(AppError::bad_request("program does not exist"));
    }
    let course = queries::course::insert(&tx, &course).await?;
    queries::program::adjust_totals(&tx, course.program_id, 1, course.credits).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(course)))
}

async fn delete_course(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    principal.require(Permission::ManageCoursePrograms)?;

    let mut client = state.pool.get().await?;
    let tx = client.transaction().await?;

    let course = queries::course::delete(&tx, id)
        .await?
        .ok_or(AppError::NotFound("course"))?;
    queries::program::adjust_totals(&tx, course.program_id, -1, -course.credits).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_schedules(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ScheduleFilter>,
) -> Result<Json<Vec<ClassSchedule>>> {
    let client = state.pool.get().await?;
    Ok(Json(queries::schedule::list(&client, &filter).await?))
}

async fn create_schedule(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(schedule): Json<NewClassSchedule>,
) -> Result<impl IntoResponse> {
    principal.require(Permission::ManageCoursePrograms)?;
    Interval::new(schedule.start_time, schedule.end_time)?;

    let client = state.pool.get().await?;
    let schedule = queries::schedule::insert(&client, &schedule).await?;

    Ok((StatusCode::CREATED, Json(schedule)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/programs", get(list_programs).post(create_program))
        .route("/api/programs/{id}", get(get_program))
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/courses/{id}", get(get_course).delete(delete_course))
        .route("/api/schedules", get(list_schedules).post(create_schedule))
}
