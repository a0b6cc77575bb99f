//! HTTP handlers for job management and the operation sequence

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    services::job::{
        CreateFromTemplateInput, CreateJobInput, JobListFilter, JobService, UpdateJobInput,
        UpdateStatusInput,
    },
    services::sequence::{AddOperationInput, ReorderInput, SequenceService},
    AppState,
};

fn job_service(state: &AppState) -> JobService {
    JobService::new(
        state.db.clone(),
        state.config.estimation.job_number_retries,
    )
}

/// Create a new job
pub async fn create_job(
    State(state): State<AppState>,
    Json(input): Json<CreateJobInput>,
) -> AppResult<impl IntoResponse> {
    let job = job_service(&state).create_job(input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// Create a reusable job template
pub async fn create_template(
    State(state): State<AppState>,
    Json(input): Json<CreateJobInput>,
) -> AppResult<impl IntoResponse> {
    let template = job_service(&state).create_template(input).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// List job templates
pub async fn list_templates(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let templates = job_service(&state).list_templates().await?;
    Ok(Json(templates))
}

/// Instantiate a job from a template
pub async fn create_job_from_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    Json(input): Json<CreateFromTemplateInput>,
) -> AppResult<impl IntoResponse> {
    let job = job_service(&state)
        .create_from_template(template_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// List jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(filter): Query<JobListFilter>,
) -> AppResult<impl IntoResponse> {
    let jobs = job_service(&state).list_jobs(filter).await?;
    Ok(Json(jobs))
}

/// Get a job by ID
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let job = job_service(&state).get_job(job_id).await?;
    Ok(Json(job))
}

/// Update job parameters
pub async fn update_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(input): Json<UpdateJobInput>,
) -> AppResult<impl IntoResponse> {
    let job = job_service(&state).update_job(job_id, input).await?;
    Ok(Json(job))
}

/// Delete a job
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    job_service(&state).delete_job(job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a status transition
pub async fn update_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(input): Json<UpdateStatusInput>,
) -> AppResult<impl IntoResponse> {
    let job = job_service(&state).update_status(job_id, input).await?;
    Ok(Json(job))
}

/// List a job's operation sequence
pub async fn list_job_operations(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let operations = job_service(&state).list_operations(job_id).await?;
    Ok(Json(operations))
}

/// Attach an operation to a job
pub async fn add_job_operation(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(input): Json<AddOperationInput>,
) -> AppResult<impl IntoResponse> {
    let service = SequenceService::new(state.db);
    let operation = service.add_operation(job_id, input).await?;
    Ok((StatusCode::CREATED, Json(operation)))
}

/// Detach an operation from a job
pub async fn remove_job_operation(
    State(state): State<AppState>,
    Path((job_id, job_operation_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let service = SequenceService::new(state.db);
    service.remove_operation(job_id, job_operation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reorder a job's operation sequence
pub async fn reorder_job_operations(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(input): Json<ReorderInput>,
) -> AppResult<impl IntoResponse> {
    let service = SequenceService::new(state.db);
    let operations = service.reorder_operations(job_id, input).await?;
    Ok(Json(operations))
}
