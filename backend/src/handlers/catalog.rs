//! HTTP handlers for the paper catalog

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    services::catalog::{
        CatalogService, CreatePaperSizeInput, CreatePaperTypeInput, UpdatePaperTypeInput,
    },
    AppState,
};

/// Listing options for paper type queries
#[derive(Debug, Default, Deserialize)]
pub struct PaperTypeListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Create a paper type
pub async fn create_paper_type(
    State(state): State<AppState>,
    Json(input): Json<CreatePaperTypeInput>,
) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let paper_type = service.create_paper_type(input).await?;
    Ok((StatusCode::CREATED, Json(paper_type)))
}

/// List paper types
pub async fn list_paper_types(
    State(state): State<AppState>,
    Query(query): Query<PaperTypeListQuery>,
) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let paper_types = service.list_paper_types(query.include_inactive).await?;
    Ok(Json(paper_types))
}

/// Get a paper type by ID
pub async fn get_paper_type(
    State(state): State<AppState>,
    Path(paper_type_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let paper_type = service.get_paper_type(paper_type_id).await?;
    Ok(Json(paper_type))
}

/// Update a paper type
pub async fn update_paper_type(
    State(state): State<AppState>,
    Path(paper_type_id): Path<Uuid>,
    Json(input): Json<UpdatePaperTypeInput>,
) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let paper_type = service.update_paper_type(paper_type_id, input).await?;
    Ok(Json(paper_type))
}

/// Delete a paper type
pub async fn delete_paper_type(
    State(state): State<AppState>,
    Path(paper_type_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    service.delete_paper_type(paper_type_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a paper size
pub async fn create_paper_size(
    State(state): State<AppState>,
    Json(input): Json<CreatePaperSizeInput>,
) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let paper_size = service.create_paper_size(input).await?;
    Ok((StatusCode::CREATED, Json(paper_size)))
}

/// List paper sizes
pub async fn list_paper_sizes(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let paper_sizes = service.list_paper_sizes().await?;
    Ok(Json(paper_sizes))
}

/// Get a paper size by ID
pub async fn get_paper_size(
    State(state): State<AppState>,
    Path(paper_size_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    let paper_size = service.get_paper_size(paper_size_id).await?;
    Ok(Json(paper_size))
}

/// Delete a paper size
pub async fn delete_paper_size(
    State(state): State<AppState>,
    Path(paper_size_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = CatalogService::new(state.db);
    service.delete_paper_size(paper_size_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
