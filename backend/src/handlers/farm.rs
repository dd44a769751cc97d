//! Farm management HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::error::{AppJson, AppResult};
use crate::middleware::AuthUser;
use crate::models::Farm;
use crate::services::farm::{
    CreateFarmInput, FarmService, GridConfigInput, GridConfigView, GridSaveResult,
    UpdateFarmInput,
};
use crate::AppState;

fn farm_service(state: &AppState) -> FarmService {
    FarmService::new(state.farms.clone(), state.config.grid.shape())
}

/// List the caller's farms
pub async fn list_farms(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<Farm>>> {
    let farms = farm_service(&state).list_farms(user.user_id).await?;
    Ok(Json(farms))
}

/// Get a single farm with all of its plots
pub async fn get_farm(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Farm>> {
    let farm = farm_service(&state).get_farm(user.user_id, farm_id).await?;
    Ok(Json(farm))
}

/// Create a farm
pub async fn create_farm(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    AppJson(input): AppJson<CreateFarmInput>,
) -> AppResult<(StatusCode, Json<Farm>)> {
    let farm = farm_service(&state).create_farm(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(farm)))
}

/// Update a farm
pub async fn update_farm(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(farm_id): Path<Uuid>,
    AppJson(input): AppJson<UpdateFarmInput>,
) -> AppResult<Json<Farm>> {
    let farm = farm_service(&state)
        .update_farm(user.user_id, farm_id, input)
        .await?;
    Ok(Json(farm))
}

/// Deactivate a farm
pub async fn delete_farm(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(farm_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    farm_service(&state).delete_farm(user.user_id, farm_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the farm's current grid configuration
pub async fn get_grid_config(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<GridConfigView>> {
    let view = farm_service(&state)
        .get_grid_config(user.user_id, farm_id)
        .await?;
    Ok(Json(view))
}

/// Save a new grid configuration, reconciling the plots
pub async fn save_grid_config(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(farm_id): Path<Uuid>,
    AppJson(input): AppJson<GridConfigInput>,
) -> AppResult<Json<GridSaveResult>> {
    let result = farm_service(&state)
        .configure_grid(user.user_id, farm_id, input)
        .await?;
    Ok(Json(result))
}
