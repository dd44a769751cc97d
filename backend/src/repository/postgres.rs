//! PostgreSQL farm store
//!
//! One row per farm. Plots live in a JSONB column; the grid shape has its own
//! columns next to the free-text description that may still carry the legacy
//! grid pattern.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::FarmRepository;
use crate::error::{AppError, AppResult};
use crate::models::{Farm, GridShape, Plot};

const FARM_COLUMNS: &str = "id, owner_id, name, location, soil_type, total_size, description, \
     grid_rows, grid_cols, plots, is_active, revision, created_at, updated_at";

#[derive(Clone)]
pub struct PgFarmRepository {
    db: PgPool,
}

impl PgFarmRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FarmRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    location: Option<String>,
    soil_type: Option<String>,
    total_size: Decimal,
    description: Option<String>,
    grid_rows: Option<i32>,
    grid_cols: Option<i32>,
    plots: Json<Vec<Plot>>,
    is_active: bool,
    revision: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FarmRow> for Farm {
    fn from(row: FarmRow) -> Self {
        let dimension = |value: Option<i32>| value.and_then(|v| u32::try_from(v).ok());
        let grid = match (dimension(row.grid_rows), dimension(row.grid_cols)) {
            (Some(rows), Some(cols)) if rows > 0 && cols > 0 => Some(GridShape::new(rows, cols)),
            _ => None,
        };

        Farm {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            location: row.location,
            soil_type: row.soil_type,
            total_size: row.total_size,
            grid_annotation: row.description,
            grid,
            plots: row.plots.0,
            is_active: row.is_active,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn grid_columns(farm: &Farm) -> (Option<i32>, Option<i32>) {
    match farm.grid {
        Some(shape) => (
            i32::try_from(shape.rows).ok(),
            i32::try_from(shape.cols).ok(),
        ),
        None => (None, None),
    }
}

#[async_trait]
impl FarmRepository for PgFarmRepository {
    async fn list_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<Farm>> {
        let rows = sqlx::query_as::<_, FarmRow>(&format!(
            "SELECT {} FROM farms WHERE owner_id = $1 AND is_active = true ORDER BY created_at",
            FARM_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Farm::from).collect())
    }

    async fn find(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<Option<Farm>> {
        let row = sqlx::query_as::<_, FarmRow>(&format!(
            "SELECT {} FROM farms WHERE id = $1 AND owner_id = $2 AND is_active = true",
            FARM_COLUMNS
        ))
        .bind(farm_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Farm::from))
    }

    async fn insert(&self, farm: &Farm) -> AppResult<Farm> {
        let (grid_rows, grid_cols) = grid_columns(farm);

        let row = sqlx::query_as::<_, FarmRow>(&format!(
            r#"
            INSERT INTO farms (id, owner_id, name, location, soil_type, total_size, description,
                               grid_rows, grid_cols, plots, is_active, revision)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            FARM_COLUMNS
        ))
        .bind(farm.id)
        .bind(farm.owner_id)
        .bind(&farm.name)
        .bind(&farm.location)
        .bind(&farm.soil_type)
        .bind(farm.total_size)
        .bind(&farm.grid_annotation)
        .bind(grid_rows)
        .bind(grid_cols)
        .bind(Json(&farm.plots))
        .bind(farm.is_active)
        .bind(farm.revision)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    async fn save(&self, farm: &Farm) -> AppResult<Farm> {
        let (grid_rows, grid_cols) = grid_columns(farm);

        let row = sqlx::query_as::<_, FarmRow>(&format!(
            r#"
            UPDATE farms
            SET name = $4, location = $5, soil_type = $6, total_size = $7, description = $8,
                grid_rows = $9, grid_cols = $10, plots = $11, is_active = $12,
                revision = revision + 1, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2 AND is_active = true AND revision = $3
            RETURNING {}
            "#,
            FARM_COLUMNS
        ))
        .bind(farm.id)
        .bind(farm.owner_id)
        .bind(farm.revision)
        .bind(&farm.name)
        .bind(&farm.location)
        .bind(&farm.soil_type)
        .bind(farm.total_size)
        .bind(&farm.grid_annotation)
        .bind(grid_rows)
        .bind(grid_cols)
        .bind(Json(&farm.plots))
        .bind(farm.is_active)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        // Nothing matched: either the farm is gone or its revision moved on.
        let current: Option<i64> = sqlx::query_scalar(
            "SELECT revision FROM farms WHERE id = $1 AND owner_id = $2 AND is_active = true",
        )
        .bind(farm.id)
        .bind(farm.owner_id)
        .fetch_optional(&self.db)
        .await?;

        match current {
            Some(_) => Err(AppError::stale_revision(farm.revision)),
            None => Err(AppError::NotFound("Farm".to_string())),
        }
    }
}
