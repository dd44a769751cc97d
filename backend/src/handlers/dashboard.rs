//! Reporting handlers for stats, dashboard and activity export

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared::types::DateRange;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::dashboard::{DashboardData, DashboardService, FarmStats};
use crate::AppState;

#[derive(Deserialize)]
pub struct ActivityLogQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub format: Option<String>, // "json" or "csv"
}

impl ActivityLogQuery {
    fn range(&self) -> AppResult<Option<DateRange>> {
        if self.start_date.is_none() && self.end_date.is_none() {
            return Ok(None);
        }
        let range = DateRange {
            start: self.start_date.unwrap_or(NaiveDate::MIN),
            end: self.end_date.unwrap_or(NaiveDate::MAX),
        };
        if range.start > range.end {
            return Err(AppError::invalid("start_date", "start_date is after end_date"));
        }
        Ok(Some(range))
    }
}

/// Get rollups for one farm
pub async fn get_farm_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<FarmStats>> {
    let service = DashboardService::new(state.farms.clone());
    let stats = service.get_farm_stats(user.user_id, farm_id).await?;
    Ok(Json(stats))
}

/// Get the dashboard across the caller's farms
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<DashboardData>> {
    let service = DashboardService::new(state.farms.clone());
    let data = service.get_dashboard(user.user_id).await?;
    Ok(Json(data))
}

/// Get a farm's activity log as JSON or CSV
pub async fn get_activity_log(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<ActivityLogQuery>,
) -> AppResult<impl IntoResponse> {
    let service = DashboardService::new(state.farms.clone());
    let data = service
        .get_activity_log(user.user_id, farm_id, query.range()?)
        .await?;

    if query.format.as_deref() == Some("csv") {
        let csv = DashboardService::export_to_csv(&data)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"activity_log.csv\"",
                ),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}
