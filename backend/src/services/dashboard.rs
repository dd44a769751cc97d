//! Reporting service for farm stats, the owner dashboard and activity export

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use shared::aggregate::FarmAggregateView;
use shared::types::DateRange;

use crate::error::{AppError, AppResult};
use crate::models::Farm;
use crate::repository::FarmRepository;

/// Reporting service
#[derive(Clone)]
pub struct DashboardService {
    farms: Arc<dyn FarmRepository>,
}

/// Rollups for one farm
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmStats {
    pub farm_id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub view: FarmAggregateView,
}

/// One line of the dashboard's farm list
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmSummary {
    pub farm_id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub total_size: Decimal,
    pub total_plots: usize,
    pub active_crops_count: usize,
    pub health_percentage: u32,
    pub active_pest_alerts_count: usize,
}

/// Rollups across every active farm of an owner
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub total_farms: usize,
    #[serde(flatten)]
    pub overview: FarmAggregateView,
    pub farms: Vec<FarmSummary>,
}

/// Activity log entry, flattened for export
#[derive(Debug, Serialize)]
pub struct ActivityLogEntry {
    pub plot_number: u32,
    pub date: DateTime<Utc>,
    pub activity_type: String,
    pub description: String,
    pub cost: Option<Decimal>,
    pub labor_hours: Option<Decimal>,
    pub materials: String,
    pub weather: Option<String>,
    pub notes: Option<String>,
}

impl DashboardService {
    pub fn new(farms: Arc<dyn FarmRepository>) -> Self {
        Self { farms }
    }

    /// Stats for one farm
    pub async fn get_farm_stats(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<FarmStats> {
        let farm = self.farms.load(owner_id, farm_id).await?;
        Ok(farm_stats(&farm, Utc::now()))
    }

    /// Dashboard across all of the owner's active farms
    pub async fn get_dashboard(&self, owner_id: Uuid) -> AppResult<DashboardData> {
        let farms = self.farms.list_for_owner(owner_id).await?;
        Ok(dashboard(&farms, Utc::now()))
    }

    /// Every activity recorded on a farm, oldest first, optionally within a date range
    pub async fn get_activity_log(
        &self,
        owner_id: Uuid,
        farm_id: Uuid,
        range: Option<DateRange>,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        let farm = self.farms.load(owner_id, farm_id).await?;
        Ok(activity_log(&farm, range.as_ref()))
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

fn farm_stats(farm: &Farm, now: DateTime<Utc>) -> FarmStats {
    FarmStats {
        farm_id: farm.id,
        name: farm.name.clone(),
        view: FarmAggregateView::compute(&farm.plots, farm.total_size, now),
    }
}

fn dashboard(farms: &[Farm], now: DateTime<Utc>) -> DashboardData {
    let total_area: Decimal = farms.iter().map(|farm| farm.total_size).sum();
    let overview = FarmAggregateView::compute(
        farms.iter().flat_map(|farm| farm.plots.iter()),
        total_area,
        now,
    );

    let summaries = farms
        .iter()
        .map(|farm| {
            let view = FarmAggregateView::compute(&farm.plots, farm.total_size, now);
            FarmSummary {
                farm_id: farm.id,
                name: farm.name.clone(),
                location: farm.location.clone(),
                total_size: farm.total_size,
                total_plots: view.total_plots,
                active_crops_count: view.active_crops_count,
                health_percentage: view.health_percentage,
                active_pest_alerts_count: view.active_pest_alerts_count,
            }
        })
        .collect();

    DashboardData {
        total_farms: farms.len(),
        overview,
        farms: summaries,
    }
}

fn activity_log(farm: &Farm, range: Option<&DateRange>) -> Vec<ActivityLogEntry> {
    let mut entries: Vec<ActivityLogEntry> = farm
        .plots
        .iter()
        .flat_map(|plot| {
            plot.activities
                .iter()
                .map(move |activity| (plot.plot_number, activity))
        })
        .filter(|(_, activity)| range.map_or(true, |range| range.contains(&activity.date)))
        .map(|(plot_number, activity)| ActivityLogEntry {
            plot_number,
            date: activity.date,
            activity_type: activity.activity_type.to_string(),
            description: activity.description.clone(),
            cost: activity.cost,
            labor_hours: activity.labor_hours,
            materials: activity.materials.join("; "),
            weather: activity.weather.clone(),
            notes: activity.notes.clone(),
        })
        .collect();

    entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.plot_number.cmp(&b.plot_number)));
    entries
}
