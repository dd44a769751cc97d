//! Plot edit HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use shared::mutation::PlotPatch;

use crate::error::AppJson;
use crate::middleware::AuthUser;
use crate::models::ActivityInput;
use crate::services::plot::{BulkClearInput, BulkUpdateInput, PlotService};
use crate::AppState;

/// Update one plot
pub async fn update_plot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((farm_id, plot_number)): Path<(Uuid, u32)>,
    AppJson(patch): AppJson<PlotPatch>,
) -> impl IntoResponse {
    let service = PlotService::new(state.farms.clone());

    match service
        .update_plot(user.user_id, farm_id, plot_number, patch)
        .await
    {
        Ok(plot) => (StatusCode::OK, Json(plot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Apply the same fields to several plots
pub async fn bulk_update_plots(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(farm_id): Path<Uuid>,
    AppJson(input): AppJson<BulkUpdateInput>,
) -> impl IntoResponse {
    let service = PlotService::new(state.farms.clone());

    match service.bulk_update_plots(user.user_id, farm_id, input).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Reset several plots to empty
pub async fn bulk_clear_plots(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(farm_id): Path<Uuid>,
    AppJson(input): AppJson<BulkClearInput>,
) -> impl IntoResponse {
    let service = PlotService::new(state.farms.clone());

    match service.bulk_clear_plots(user.user_id, farm_id, input).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Log an activity on a plot
pub async fn add_plot_activity(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((farm_id, plot_number)): Path<(Uuid, u32)>,
    AppJson(input): AppJson<ActivityInput>,
) -> impl IntoResponse {
    let service = PlotService::new(state.farms.clone());

    match service
        .add_plot_activity(user.user_id, farm_id, plot_number, input)
        .await
    {
        Ok(activity) => (StatusCode::CREATED, Json(activity)).into_response(),
        Err(e) => e.into_response(),
    }
}
