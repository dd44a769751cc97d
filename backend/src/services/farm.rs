//! Farm management service: farm CRUD and grid configuration

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::grid::{self, GridConfig, GridShape};
use shared::reconcile::{apply_grid_config, initial_plots, GridChange};
use shared::validation::{validate_plot_collection, validate_total_size};

use crate::error::{AppError, AppResult};
use crate::models::{Farm, Plot};
use crate::repository::FarmRepository;

/// Farm service for farm records and their grids
#[derive(Clone)]
pub struct FarmService {
    farms: Arc<dyn FarmRepository>,
    default_grid: GridShape,
}

/// Input for creating a farm
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFarmInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[validate(length(max = 100))]
    pub soil_type: Option<String>,
    pub total_size: Decimal,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub rows: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub cols: Option<u32>,
    /// Start from these plots instead of a default grid
    pub plots: Option<Vec<Plot>>,
}

/// Input for updating a farm; absent fields are left as they are
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFarmInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[validate(length(max = 100))]
    pub soil_type: Option<String>,
    pub total_size: Option<Decimal>,
    pub grid_annotation: Option<String>,
    pub grid: Option<GridShape>,
    pub plots: Option<Vec<Plot>>,
    /// Revision the caller loaded; a stale value is rejected
    pub revision: Option<i64>,
}

/// Input for saving a new grid configuration
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GridConfigInput {
    #[validate(range(min = 1, max = 50))]
    pub rows: u32,
    #[validate(range(min = 1, max = 50))]
    pub cols: u32,
    pub total_size: Option<Decimal>,
    pub revision: Option<i64>,
}

/// Where a farm's current grid shape was read from
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GridSource {
    Structured,
    Annotation,
    Inferred,
}

/// Current grid configuration of a farm
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfigView {
    #[serde(flatten)]
    pub config: GridConfig,
    pub source: GridSource,
    pub total_size: Decimal,
    pub allocated_area: Decimal,
    pub plot_count: usize,
    pub revision: i64,
}

/// Saved farm together with what the resize did to its plots
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSaveResult {
    pub farm: Farm,
    pub change: GridChange,
}

impl FarmService {
    pub fn new(farms: Arc<dyn FarmRepository>, default_grid: GridShape) -> Self {
        Self {
            farms,
            default_grid,
        }
    }

    /// List the owner's active farms
    pub async fn list_farms(&self, owner_id: Uuid) -> AppResult<Vec<Farm>> {
        self.farms.list_for_owner(owner_id).await
    }

    /// Get one farm the owner holds
    pub async fn get_farm(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<Farm> {
        self.farms.load(owner_id, farm_id).await
    }

    /// Create a farm with a default grid of empty plots, or with the supplied plots
    pub async fn create_farm(&self, owner_id: Uuid, input: CreateFarmInput) -> AppResult<Farm> {
        input.validate()?;
        validate_total_size(input.total_size).map_err(|msg| AppError::invalid("totalSize", msg))?;

        let requested = match (input.rows, input.cols) {
            (Some(rows), Some(cols)) => Some(GridShape::new(rows, cols)),
            (None, None) => None,
            _ => {
                return Err(AppError::invalid(
                    "grid",
                    "Rows and columns must be given together",
                ))
            }
        };

        let (plots, shape) = match input.plots {
            Some(plots) => {
                validate_plot_collection(&plots).map_err(|msg| AppError::invalid("plots", msg))?;
                grid::check_area_invariant(input.total_size, &plots)?;
                (plots, requested)
            }
            None => {
                let shape = requested.unwrap_or(self.default_grid);
                shape.validate()?;
                (initial_plots(shape, input.total_size), Some(shape))
            }
        };

        let annotation = match shape {
            Some(shape) => Some(grid::write_annotation(
                input.description.as_deref(),
                &GridConfig::for_total_size(shape, input.total_size),
            )),
            None => input.description,
        };

        let now = Utc::now();
        let farm = Farm {
            id: Uuid::new_v4(),
            owner_id,
            name: input.name,
            location: input.location,
            soil_type: input.soil_type,
            total_size: input.total_size,
            grid_annotation: annotation,
            grid: shape,
            plots,
            is_active: true,
            revision: 1,
            created_at: now,
            updated_at: now,
        };

        let farm = self.farms.insert(&farm).await?;
        tracing::info!(
            farm_id = %farm.id,
            plots = farm.plots.len(),
            "Farm created"
        );
        Ok(farm)
    }

    /// Update descriptive fields and, optionally, replace the plot collection
    pub async fn update_farm(
        &self,
        owner_id: Uuid,
        farm_id: Uuid,
        input: UpdateFarmInput,
    ) -> AppResult<Farm> {
        input.validate()?;
        if let Some(total_size) = input.total_size {
            validate_total_size(total_size).map_err(|msg| AppError::invalid("totalSize", msg))?;
        }
        if let Some(shape) = input.grid {
            shape.validate()?;
        }
        if let Some(plots) = &input.plots {
            validate_plot_collection(plots).map_err(|msg| AppError::invalid("plots", msg))?;
        }

        let mut farm = self.farms.load(owner_id, farm_id).await?;
        check_revision(&farm, input.revision)?;

        if let Some(name) = input.name {
            farm.name = name;
        }
        if let Some(location) = input.location {
            farm.location = Some(location);
        }
        if let Some(soil_type) = input.soil_type {
            farm.soil_type = Some(soil_type);
        }
        let resized = input.total_size.is_some() || input.plots.is_some();
        if let Some(total_size) = input.total_size {
            farm.total_size = total_size;
        }
        if let Some(annotation) = input.grid_annotation {
            farm.grid_annotation = Some(annotation);
        }
        if let Some(shape) = input.grid {
            farm.grid = Some(shape);
        }
        if let Some(plots) = input.plots {
            farm.plots = plots;
        }
        if resized {
            grid::check_area_invariant(farm.total_size, &farm.plots)?;
        }

        let farm = self.farms.save(&farm).await?;
        tracing::info!(farm_id = %farm.id, revision = farm.revision, "Farm updated");
        Ok(farm)
    }

    /// Soft delete: the farm disappears from every listing but keeps its records
    pub async fn delete_farm(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<()> {
        let mut farm = self.farms.load(owner_id, farm_id).await?;
        farm.is_active = false;
        self.farms.save(&farm).await?;
        tracing::info!(farm_id = %farm_id, "Farm deactivated");
        Ok(())
    }

    /// Current grid shape, the plot size it implies and where the shape came from
    pub async fn get_grid_config(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<GridConfigView> {
        let farm = self.farms.load(owner_id, farm_id).await?;

        let source = if farm.grid.is_some_and(|shape| shape.plot_count() > 0) {
            GridSource::Structured
        } else if farm
            .grid_annotation
            .as_deref()
            .and_then(grid::decode)
            .is_some()
        {
            GridSource::Annotation
        } else {
            GridSource::Inferred
        };

        Ok(GridConfigView {
            config: farm.grid_config(),
            source,
            total_size: farm.total_size,
            allocated_area: farm.allocated_area(),
            plot_count: farm.plots.len(),
            revision: farm.revision,
        })
    }

    /// Resize the grid, keeping the history of every plot number that still exists
    pub async fn configure_grid(
        &self,
        owner_id: Uuid,
        farm_id: Uuid,
        input: GridConfigInput,
    ) -> AppResult<GridSaveResult> {
        input.validate()?;
        if let Some(total_size) = input.total_size {
            validate_total_size(total_size).map_err(|msg| AppError::invalid("totalSize", msg))?;
        }

        let mut farm = self.farms.load(owner_id, farm_id).await?;
        check_revision(&farm, input.revision)?;

        let change = apply_grid_config(
            &mut farm,
            GridShape::new(input.rows, input.cols),
            input.total_size,
        )?;

        if !change.dropped_with_history.is_empty() {
            tracing::warn!(
                farm_id = %farm_id,
                plots = ?change.dropped_with_history,
                "Grid resize dropped plots that had crop, pest or activity records"
            );
        }

        let farm = self.farms.save(&farm).await?;
        tracing::info!(
            farm_id = %farm.id,
            rows = change.config.rows,
            cols = change.config.cols,
            created = change.created.len(),
            dropped = change.dropped.len(),
            "Grid configuration saved"
        );

        Ok(GridSaveResult { farm, change })
    }
}

fn check_revision(farm: &Farm, expected: Option<i64>) -> AppResult<()> {
    match expected {
        Some(expected) if expected != farm.revision => {
            tracing::warn!(
                farm_id = %farm.id,
                expected,
                current = farm.revision,
                "Rejected edit against a stale farm revision"
            );
            Err(AppError::stale_revision(expected))
        }
        _ => Ok(()),
    }
}
