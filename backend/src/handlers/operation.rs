//! HTTP handlers for the operation library

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
    services::operation::{
        CreateCategoryInput, CreateOperationInput, OperationService, UpdateOperationInput,
    },
    AppState,
};

/// Listing options for operation queries
#[derive(Debug, Default, Deserialize)]
pub struct OperationListQuery {
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Create an operation category
pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<impl IntoResponse> {
    let service = OperationService::new(state.db);
    let category = service.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// List operation categories
pub async fn list_categories(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = OperationService::new(state.db);
    let categories = service.list_categories().await?;
    Ok(Json(categories))
}

/// Delete an operation category
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = OperationService::new(state.db);
    service.delete_category(category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a master operation definition
pub async fn create_operation(
    State(state): State<AppState>,
    Json(input): Json<CreateOperationInput>,
) -> AppResult<impl IntoResponse> {
    let service = OperationService::new(state.db);
    let operation = service.create_operation(input).await?;
    Ok((StatusCode::CREATED, Json(operation)))
}

/// List operation definitions
pub async fn list_operations(
    State(state): State<AppState>,
    Query(query): Query<OperationListQuery>,
) -> AppResult<impl IntoResponse> {
    let service = OperationService::new(state.db);
    let operations = service
        .list_operations(query.category_id, query.include_inactive)
        .await?;
    Ok(Json(operations))
}

/// Get an operation definition by ID
pub async fn get_operation(
    State(state): State<AppState>,
    Path(operation_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = OperationService::new(state.db);
    let operation = service.get_operation(operation_id).await?;
    Ok(Json(operation))
}

/// Update an operation definition
pub async fn update_operation(
    State(state): State<AppState>,
    Path(operation_id): Path<Uuid>,
    Json(input): Json<UpdateOperationInput>,
) -> AppResult<impl IntoResponse> {
    let service = OperationService::new(state.db);
    let operation = service.update_operation(operation_id, input).await?;
    Ok(Json(operation))
}

/// Delete an operation definition
pub async fn delete_operation(
    State(state): State<AppState>,
    Path(operation_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = OperationService::new(state.db);
    service.delete_operation(operation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
