//! Route definitions for the Farm Records Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - farms, grids and plots
        .nest("/farms", farm_routes(state))
        // Protected routes - owner dashboard
        .nest("/dashboard", dashboard_routes(state))
}

/// Farm management routes (protected)
fn farm_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_farms).post(handlers::create_farm))
        .route(
            "/:farm_id",
            get(handlers::get_farm)
                .put(handlers::update_farm)
                .delete(handlers::delete_farm),
        )
        .route(
            "/:farm_id/grid",
            get(handlers::get_grid_config).put(handlers::save_grid_config),
        )
        .route("/:farm_id/plots/bulk-update", post(handlers::bulk_update_plots))
        .route("/:farm_id/plots/bulk-clear", post(handlers::bulk_clear_plots))
        .route("/:farm_id/plots/:plot_number", put(handlers::update_plot))
        .route(
            "/:farm_id/plots/:plot_number/activities",
            post(handlers::add_plot_activity),
        )
        .route("/:farm_id/activities", get(handlers::get_activity_log))
        .route("/:farm_id/stats", get(handlers::get_farm_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Dashboard routes (protected)
fn dashboard_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_dashboard))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
