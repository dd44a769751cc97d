//! Plot edit service for single and bulk plot operations
//!
//! Each operation loads the farm once, applies the edit in memory and saves the
//! whole farm once. A failed operation writes nothing.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::mutation::{self, BulkOutcome, PlotPatch};
use shared::validation::{validate_plot_numbers, validate_soil_readings};

use crate::error::{AppError, AppResult};
use crate::models::{Activity, ActivityInput, Plot};
use crate::repository::FarmRepository;

/// Plot service for editing plots on a farm
#[derive(Clone)]
pub struct PlotService {
    farms: Arc<dyn FarmRepository>,
}

/// Input for a bulk update
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateInput {
    pub plot_numbers: Vec<u32>,
    #[serde(default)]
    pub updates: PlotPatch,
}

/// Input for a bulk clear
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkClearInput {
    pub plot_numbers: Vec<u32>,
}

/// Plots a bulk update changed, plus requested numbers the farm does not have
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateResult {
    pub plots: Vec<Plot>,
    pub skipped: Vec<u32>,
}

/// Plot numbers a bulk clear reset, plus requested numbers the farm does not have
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkClearResult {
    pub cleared: Vec<u32>,
    pub skipped: Vec<u32>,
}

impl From<BulkOutcome> for BulkClearResult {
    fn from(outcome: BulkOutcome) -> Self {
        Self {
            cleared: outcome.touched,
            skipped: outcome.skipped,
        }
    }
}

impl PlotService {
    pub fn new(farms: Arc<dyn FarmRepository>) -> Self {
        Self { farms }
    }

    /// Update one plot: list fields are appended, object fields merged
    pub async fn update_plot(
        &self,
        owner_id: Uuid,
        farm_id: Uuid,
        plot_number: u32,
        patch: PlotPatch,
    ) -> AppResult<Plot> {
        validate_patch(&patch)?;
        if patch.is_empty() {
            tracing::debug!(farm_id = %farm_id, plot_number, "Plot update carries no editable fields");
        }

        let mut farm = self.farms.load(owner_id, farm_id).await?;
        let updated = mutation::update_plot(&mut farm.plots, plot_number, &patch)?.clone();

        self.farms.save(&farm).await?;
        tracing::info!(farm_id = %farm_id, plot_number, "Plot updated");
        Ok(updated)
    }

    /// Apply one field set to many plots, replacing list fields
    pub async fn bulk_update_plots(
        &self,
        owner_id: Uuid,
        farm_id: Uuid,
        input: BulkUpdateInput,
    ) -> AppResult<BulkUpdateResult> {
        validate_plot_numbers(&input.plot_numbers)
            .map_err(|msg| AppError::invalid("plotNumbers", msg))?;
        validate_patch(&input.updates)?;

        let mut farm = self.farms.load(owner_id, farm_id).await?;
        let outcome = mutation::bulk_update(&mut farm.plots, &input.plot_numbers, &input.updates)?;

        let farm = self.farms.save(&farm).await?;
        tracing::info!(
            farm_id = %farm_id,
            updated = outcome.touched.len(),
            skipped = outcome.skipped.len(),
            "Bulk plot update applied"
        );

        let plots = outcome
            .touched
            .iter()
            .filter_map(|&plot_number| farm.plot(plot_number).cloned())
            .collect();
        Ok(BulkUpdateResult {
            plots,
            skipped: outcome.skipped,
        })
    }

    /// Reset many plots to an empty crop with no pest alerts
    pub async fn bulk_clear_plots(
        &self,
        owner_id: Uuid,
        farm_id: Uuid,
        input: BulkClearInput,
    ) -> AppResult<BulkClearResult> {
        validate_plot_numbers(&input.plot_numbers)
            .map_err(|msg| AppError::invalid("plotNumbers", msg))?;

        let mut farm = self.farms.load(owner_id, farm_id).await?;
        let outcome = mutation::bulk_clear(&mut farm.plots, &input.plot_numbers, Utc::now())?;

        self.farms.save(&farm).await?;
        tracing::info!(
            farm_id = %farm_id,
            cleared = outcome.touched.len(),
            skipped = outcome.skipped.len(),
            "Bulk plot clear applied"
        );
        Ok(outcome.into())
    }

    /// Append an entry to a plot's activity log
    pub async fn add_plot_activity(
        &self,
        owner_id: Uuid,
        farm_id: Uuid,
        plot_number: u32,
        input: ActivityInput,
    ) -> AppResult<Activity> {
        if input.description.trim().is_empty() {
            return Err(AppError::invalid("description", "Description is required"));
        }

        let mut farm = self.farms.load(owner_id, farm_id).await?;
        let activity = mutation::add_activity(&mut farm.plots, plot_number, input, Utc::now())?;

        self.farms.save(&farm).await?;
        tracing::info!(
            farm_id = %farm_id,
            plot_number,
            activity = %activity.activity_type,
            "Plot activity recorded"
        );
        Ok(activity)
    }
}

fn validate_patch(patch: &PlotPatch) -> AppResult<()> {
    if let Some(soil) = &patch.soil_health {
        validate_soil_readings(soil).map_err(|msg| AppError::invalid("soilHealth", msg))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryFarmRepository;
    use crate::services::farm::{CreateFarmInput, FarmService, GridConfigInput};
    use rust_decimal::Decimal;
    use shared::grid::GridShape;
    use shared::models::{
        ActivityType, AlertSeverity, AlertStatus, CropHealth, CropStage, PestAlert,
        BULK_CLEAR_DESCRIPTION, EMPTY_CROP_NAME,
    };
    use tokio_test::assert_ok;

    struct Fixture {
        farms: FarmService,
        plots: PlotService,
        owner: Uuid,
        farm_id: Uuid,
    }

    async fn fixture(rows: u32, cols: u32) -> Fixture {
        let repository: Arc<dyn FarmRepository> = Arc::new(InMemoryFarmRepository::new());
        let farms = FarmService::new(repository.clone(), GridShape::default());
        let owner = Uuid::new_v4();
        let farm = farms
            .create_farm(
                owner,
                CreateFarmInput {
                    name: "Plot Farm".to_string(),
                    location: None,
                    soil_type: None,
                    total_size: Decimal::from(rows * cols),
                    description: None,
                    rows: Some(rows),
                    cols: Some(cols),
                    plots: None,
                },
            )
            .await
            .unwrap();
        Fixture {
            farms,
            plots: PlotService::new(repository),
            owner,
            farm_id: farm.id,
        }
    }

    fn patch(json: serde_json::Value) -> PlotPatch {
        serde_json::from_value(json).unwrap()
    }

    fn alert(pest: &str) -> PestAlert {
        PestAlert {
            id: Uuid::new_v4(),
            pest_type: pest.to_string(),
            severity: AlertSeverity::High,
            detected_date: Utc::now(),
            status: AlertStatus::Active,
            treatment: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_update_plot_appends_alerts() {
        let fx = fixture(3, 3).await;
        let first = PlotPatch {
            pest_alerts: Some(vec![alert("aphids")]),
            ..Default::default()
        };
        let second = PlotPatch {
            pest_alerts: Some(vec![alert("thrips")]),
            ..Default::default()
        };

        assert_ok!(fx.plots.update_plot(fx.owner, fx.farm_id, 2, first).await);
        let plot = fx.plots.update_plot(fx.owner, fx.farm_id, 2, second).await.unwrap();

        let pests: Vec<&str> = plot.pest_alerts.iter().map(|a| a.pest_type.as_str()).collect();
        assert_eq!(pests, vec!["aphids", "thrips"]);
    }

    #[tokio::test]
    async fn test_update_plot_merges_crop() {
        let fx = fixture(2, 2).await;
        let plot = fx
            .plots
            .update_plot(
                fx.owner,
                fx.farm_id,
                1,
                patch(serde_json::json!({ "crop": { "name": "Cotton", "stage": "planted" } })),
            )
            .await
            .unwrap();

        let crop = plot.crop.unwrap();
        assert_eq!(crop.name, "Cotton");
        assert_eq!(crop.stage, CropStage::Planted);
        assert_eq!(crop.health, CropHealth::Good);
    }

    #[tokio::test]
    async fn test_update_missing_plot_writes_nothing() {
        let fx = fixture(2, 2).await;
        let err = fx
            .plots
            .update_plot(fx.owner, fx.farm_id, 9, PlotPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(fx.farms.get_farm(fx.owner, fx.farm_id).await.unwrap().revision, 1);
    }

    #[tokio::test]
    async fn test_update_rejects_impossible_soil_ph() {
        let fx = fixture(2, 2).await;
        let err = fx
            .plots
            .update_plot(
                fx.owner,
                fx.farm_id,
                1,
                patch(serde_json::json!({ "soilHealth": { "ph": "15.5" } })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "soilHealth"));
    }

    #[tokio::test]
    async fn test_bulk_update_is_lenient() {
        let fx = fixture(3, 3).await;
        let input = BulkUpdateInput {
            plot_numbers: vec![3, 999],
            updates: patch(serde_json::json!({
                "crop": { "name": "Maize", "stage": "growing", "plantedDate": "2024-06-15" }
            })),
        };

        let result = fx.plots.bulk_update_plots(fx.owner, fx.farm_id, input).await.unwrap();

        assert_eq!(result.plots.len(), 1);
        assert_eq!(result.plots[0].plot_number, 3);
        assert_eq!(result.skipped, vec![999]);
        let crop = result.plots[0].crop.as_ref().unwrap();
        assert_eq!(crop.name, "Maize");
        assert_eq!(
            crop.planted_date.map(|d| d.date_naive().to_string()),
            Some("2024-06-15".to_string())
        );
    }

    #[tokio::test]
    async fn test_bulk_update_replaces_lists() {
        let fx = fixture(2, 2).await;
        let seed = PlotPatch {
            pest_alerts: Some(vec![alert("aphids"), alert("borer")]),
            ..Default::default()
        };
        fx.plots.update_plot(fx.owner, fx.farm_id, 1, seed).await.unwrap();

        let input = BulkUpdateInput {
            plot_numbers: vec![1, 2],
            updates: PlotPatch {
                pest_alerts: Some(vec![alert("whitefly")]),
                ..Default::default()
            },
        };
        let result = fx.plots.bulk_update_plots(fx.owner, fx.farm_id, input).await.unwrap();

        for plot in &result.plots {
            assert_eq!(plot.pest_alerts.len(), 1);
            assert_eq!(plot.pest_alerts[0].pest_type, "whitefly");
        }
    }

    #[tokio::test]
    async fn test_bulk_operations_fail_when_nothing_matches() {
        let fx = fixture(2, 2).await;

        let err = fx
            .plots
            .bulk_update_plots(
                fx.owner,
                fx.farm_id,
                BulkUpdateInput {
                    plot_numbers: vec![50, 60],
                    updates: PlotPatch::default(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoPlotsFound(_)));

        let err = fx
            .plots
            .bulk_clear_plots(fx.owner, fx.farm_id, BulkClearInput { plot_numbers: vec![5] })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoPlotsFound(_)));

        let err = fx
            .plots
            .bulk_clear_plots(fx.owner, fx.farm_id, BulkClearInput { plot_numbers: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_bulk_clear_resets_plots() {
        let fx = fixture(2, 2).await;
        fx.plots
            .update_plot(
                fx.owner,
                fx.farm_id,
                4,
                PlotPatch {
                    pest_alerts: Some(vec![alert("mites")]),
                    crop: Some(serde_json::from_value(serde_json::json!({
                        "name": "Tomato",
                        "stage": "flowering",
                        "health": "poor",
                        "plantedDate": "2024-02-01"
                    }))
                    .unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = fx
            .plots
            .bulk_clear_plots(fx.owner, fx.farm_id, BulkClearInput { plot_numbers: vec![4, 4, 7] })
            .await
            .unwrap();
        assert_eq!(result.cleared, vec![4]);
        assert_eq!(result.skipped, vec![7]);

        let farm = fx.farms.get_farm(fx.owner, fx.farm_id).await.unwrap();
        let plot = farm.plot(4).unwrap();
        let crop = plot.crop.as_ref().unwrap();
        assert_eq!(crop.name, EMPTY_CROP_NAME);
        assert_eq!(crop.stage, CropStage::Fallow);
        assert_eq!(crop.health, CropHealth::Good);
        assert!(crop.planted_date.is_none());
        assert!(plot.pest_alerts.is_empty());
        assert_eq!(plot.activities.len(), 1);
        assert_eq!(plot.activities[0].activity_type, ActivityType::Other);
        assert_eq!(plot.activities[0].description, BULK_CLEAR_DESCRIPTION);
    }

    #[tokio::test]
    async fn test_add_activity_defaults_date() {
        let fx = fixture(2, 2).await;
        let input: ActivityInput = serde_json::from_value(serde_json::json!({
            "type": "watering",
            "description": "Evening watering",
            "materials": []
        }))
        .unwrap();

        let before = Utc::now();
        let activity = fx
            .plots
            .add_plot_activity(fx.owner, fx.farm_id, 2, input)
            .await
            .unwrap();
        assert_eq!(activity.activity_type, ActivityType::Watering);
        assert!(activity.date >= before);

        let farm = fx.farms.get_farm(fx.owner, fx.farm_id).await.unwrap();
        assert_eq!(farm.plot(2).unwrap().activities, vec![activity]);
    }

    #[tokio::test]
    async fn test_history_survives_resize_after_edits() {
        let fx = fixture(4, 4).await;
        fx.plots
            .update_plot(
                fx.owner,
                fx.farm_id,
                5,
                PlotPatch {
                    pest_alerts: Some(vec![alert("stem borer")]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = fx
            .farms
            .configure_grid(
                fx.owner,
                fx.farm_id,
                GridConfigInput {
                    rows: 3,
                    cols: 3,
                    total_size: None,
                    revision: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.farm.plot(5).unwrap().pest_alerts[0].pest_type, "stem borer");
    }
}
