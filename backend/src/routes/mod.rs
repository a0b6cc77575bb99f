//! Route definitions for the Print Shop Estimation Platform

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/clients", client_routes())
        .nest("/paper-types", paper_type_routes())
        .nest("/paper-sizes", paper_size_routes())
        .nest("/operation-categories", category_routes())
        .nest("/operations", operation_routes())
        .nest("/jobs", job_routes())
}

/// Client management routes
fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_clients).post(handlers::create_client))
        .route(
            "/:client_id",
            get(handlers::get_client)
                .put(handlers::update_client)
                .delete(handlers::delete_client),
        )
        .route("/:client_id/stats", get(handlers::get_client_stats))
}

/// Paper type routes
fn paper_type_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_paper_types).post(handlers::create_paper_type),
        )
        .route(
            "/:paper_type_id",
            get(handlers::get_paper_type)
                .put(handlers::update_paper_type)
                .delete(handlers::delete_paper_type),
        )
}

/// Paper size routes
fn paper_size_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_paper_sizes).post(handlers::create_paper_size),
        )
        .route(
            "/:paper_size_id",
            get(handlers::get_paper_size).delete(handlers::delete_paper_size),
        )
}

/// Operation category routes
fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/:category_id", delete(handlers::delete_category))
}

/// Master operation definition routes
fn operation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_operations).post(handlers::create_operation),
        )
        .route(
            "/:operation_id",
            get(handlers::get_operation)
                .put(handlers::update_operation)
                .delete(handlers::delete_operation),
        )
}

/// Job management, sequence and calculation routes
fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_jobs).post(handlers::create_job))
        // Templates
        .route(
            "/templates",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route(
            "/templates/:template_id/instantiate",
            post(handlers::create_job_from_template),
        )
        // Job CRUD
        .route(
            "/:job_id",
            get(handlers::get_job)
                .put(handlers::update_job)
                .delete(handlers::delete_job),
        )
        .route("/:job_id/status", put(handlers::update_job_status))
        // Operation sequence
        .route(
            "/:job_id/operations",
            get(handlers::list_job_operations).post(handlers::add_job_operation),
        )
        .route(
            "/:job_id/operations/reorder",
            put(handlers::reorder_job_operations),
        )
        .route(
            "/:job_id/operations/:job_operation_id",
            delete(handlers::remove_job_operation),
        )
        // Calculation and variants
        .route("/:job_id/calculate", post(handlers::calculate_job))
        .route(
            "/:job_id/variants",
            get(handlers::list_job_variants).post(handlers::calculate_all_variants),
        )
        .route("/:job_id/variants/preview", post(handlers::preview_variant))
        .route("/:job_id/price-table", get(handlers::export_price_table))
}
