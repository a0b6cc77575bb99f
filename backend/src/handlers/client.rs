//! HTTP handlers for client management

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
    services::client::{ClientService, CreateClientInput, UpdateClientInput},
    AppState,
};

/// Listing options for client queries
#[derive(Debug, Default, Deserialize)]
pub struct ClientListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Create a new client
pub async fn create_client(
    State(state): State<AppState>,
    Json(input): Json<CreateClientInput>,
) -> AppResult<impl IntoResponse> {
    let service = ClientService::new(state.db);
    let client = service.create_client(input).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// List clients
pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientListQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ClientService::new(state.db);
    let clients = service.list_clients(query.include_inactive).await?;
    Ok(Json(clients))
}

/// Get a client by ID
pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = ClientService::new(state.db);
    let client = service.get_client(client_id).await?;
    Ok(Json(client))
}

/// Update a client
pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    Json(input): Json<UpdateClientInput>,
) -> AppResult<impl IntoResponse> {
    let service = ClientService::new(state.db);
    let client = service.update_client(client_id, input).await?;
    Ok(Json(client))
}

/// Delete a client
pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = ClientService::new(state.db);
    service.delete_client(client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get aggregate statistics for a client
pub async fn get_client_stats(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = ClientService::new(state.db);
    let stats = service.get_client_stats(client_id).await?;
    Ok(Json(stats))
}
