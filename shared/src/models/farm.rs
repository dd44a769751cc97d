//! Farm aggregate model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grid::{self, GridConfig, GridShape};
use crate::models::Plot;

/// A farm and every plot on it, persisted as one document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub soil_type: Option<String>,
    /// Area in acres
    pub total_size: Decimal,
    /// Free-text description; may also carry the legacy grid pattern
    pub grid_annotation: Option<String>,
    /// Structured grid shape, authoritative when present
    pub grid: Option<GridShape>,
    pub plots: Vec<Plot>,
    pub is_active: bool,
    /// Incremented on every save
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Farm {
    /// Current grid shape: the structured column, then the annotation, then inference
    pub fn grid_shape(&self) -> GridShape {
        if let Some(shape) = self.grid.filter(|shape| shape.plot_count() > 0) {
            return shape;
        }
        grid::resolve_shape(self.grid_annotation.as_deref(), &self.plots)
    }

    /// Grid shape together with the per-plot size the shape implies
    pub fn grid_config(&self) -> GridConfig {
        GridConfig::for_total_size(self.grid_shape(), self.total_size)
    }

    pub fn plot(&self, plot_number: u32) -> Option<&Plot> {
        self.plots.iter().find(|plot| plot.plot_number == plot_number)
    }

    pub fn plot_mut(&mut self, plot_number: u32) -> Option<&mut Plot> {
        self.plots
            .iter_mut()
            .find(|plot| plot.plot_number == plot_number)
    }

    /// Sum of the individual plot sizes
    pub fn allocated_area(&self) -> Decimal {
        self.plots.iter().map(|plot| plot.size).sum()
    }
}
