//! HTTP handlers for calculation, variants and the price-table export

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    services::estimation::{
        CalculateVariantsInput, EstimationService, VariantPreviewInput,
    },
    services::job::JobService,
    services::reporting::ReportingService,
    AppState,
};

/// Run the full calculation for a job
pub async fn calculate_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = EstimationService::new(state.db);
    let result = service.calculate_job(job_id).await?;
    Ok(Json(result))
}

/// Preview the estimate at an alternate quantity
pub async fn preview_variant(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(input): Json<VariantPreviewInput>,
) -> AppResult<impl IntoResponse> {
    let service = EstimationService::new(state.db);
    let result = service.calculate_variant(job_id, input).await?;
    Ok(Json(result))
}

/// Recreate the job's saved variant table
pub async fn calculate_all_variants(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(input): Json<CalculateVariantsInput>,
) -> AppResult<impl IntoResponse> {
    let service = EstimationService::new(state.db);
    let result = service.calculate_all_variants(job_id, input).await?;
    Ok(Json(result))
}

/// List the job's saved variants
pub async fn list_job_variants(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = JobService::new(
        state.db.clone(),
        state.config.estimation.job_number_retries,
    );
    let variants = service.list_variants(job_id).await?;
    Ok(Json(variants))
}

/// Download the job's price table as CSV
pub async fn export_price_table(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = ReportingService::new(state.db);
    let export = service.price_table_csv(job_id).await?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
    ];
    Ok((headers, export.content))
}
