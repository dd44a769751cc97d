//! Plot reconciliation for grid resizes
//!
//! A resize rebuilds the plot collection for the new shape. Plot numbers that survive
//! keep their full agronomic history and only get a new size; new numbers start as
//! default plots; numbers past the new plot count are dropped together with their
//! history.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::grid::{self, GridConfig, GridError, GridShape};
use crate::models::{Farm, Plot};

/// New plot collection plus what happened to each plot number
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub plots: Vec<Plot>,
    pub kept: Vec<u32>,
    pub created: Vec<u32>,
    pub dropped: Vec<u32>,
    /// Dropped plots that had a crop, pest alerts or activities
    pub dropped_with_history: Vec<u32>,
}

/// Rebuild `existing` as exactly `shape.plot_count()` plots numbered from 1.
pub fn reconcile_plots(existing: Vec<Plot>, shape: GridShape, plot_size: Decimal) -> Reconciliation {
    let target_count = shape.plot_count();

    let mut by_number: HashMap<u32, Plot> = HashMap::with_capacity(existing.len());
    for plot in existing {
        // Documents are unique by plot number; keep the first if one is not.
        by_number.entry(plot.plot_number).or_insert(plot);
    }

    let mut plots = Vec::with_capacity(target_count as usize);
    let mut kept = Vec::new();
    let mut created = Vec::new();

    for plot_number in 1..=target_count {
        match by_number.remove(&plot_number) {
            Some(mut plot) => {
                plot.size = plot_size;
                kept.push(plot_number);
                plots.push(plot);
            }
            None => {
                created.push(plot_number);
                plots.push(Plot::new_default(plot_number, plot_size));
            }
        }
    }

    let mut leftovers: Vec<Plot> = by_number.into_values().collect();
    leftovers.sort_by_key(|plot| plot.plot_number);
    let dropped = leftovers.iter().map(|plot| plot.plot_number).collect();
    let dropped_with_history = leftovers
        .iter()
        .filter(|plot| plot.has_history())
        .map(|plot| plot.plot_number)
        .collect();

    Reconciliation {
        plots,
        kept,
        created,
        dropped,
        dropped_with_history,
    }
}

/// Outcome of saving a new grid configuration onto a farm
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridChange {
    pub previous: GridShape,
    pub config: GridConfig,
    pub kept: Vec<u32>,
    pub created: Vec<u32>,
    pub dropped: Vec<u32>,
    pub dropped_with_history: Vec<u32>,
}

/// Apply a grid-config save to a loaded farm.
///
/// Optionally changes the total size, recomputes the plot size, reconciles the plots,
/// records the shape in both the structured field and the description annotation, and
/// checks the area invariant. The farm is left untouched on error.
pub fn apply_grid_config(
    farm: &mut Farm,
    shape: GridShape,
    total_size: Option<Decimal>,
) -> Result<GridChange, GridError> {
    shape.validate()?;
    let total_size = total_size.unwrap_or(farm.total_size);
    if total_size <= Decimal::ZERO {
        return Err(GridError::InvalidTotalSize);
    }

    let previous = farm.grid_shape();
    let config = GridConfig::for_total_size(shape, total_size);
    let reconciliation = reconcile_plots(farm.plots.clone(), shape, config.plot_size);
    grid::check_area_invariant(total_size, &reconciliation.plots)?;

    farm.total_size = total_size;
    farm.plots = reconciliation.plots;
    farm.grid = Some(shape);
    farm.grid_annotation = Some(grid::write_annotation(
        farm.grid_annotation.as_deref(),
        &config,
    ));

    Ok(GridChange {
        previous,
        config,
        kept: reconciliation.kept,
        created: reconciliation.created,
        dropped: reconciliation.dropped,
        dropped_with_history: reconciliation.dropped_with_history,
    })
}

/// Default plots for a brand-new farm
pub fn initial_plots(shape: GridShape, total_size: Decimal) -> Vec<Plot> {
    let size = grid::plot_size(total_size, shape.rows, shape.cols);
    (1..=shape.plot_count())
        .map(|plot_number| Plot::new_default(plot_number, size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertSeverity, AlertStatus, Crop, CropHealth, CropStage, PestAlert};
    use chrono::Utc;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn planted(plot_number: u32, size: Decimal) -> Plot {
        let mut plot = Plot::new_default(plot_number, size);
        plot.crop = Some(Crop {
            name: "Wheat".to_string(),
            variety: Some("HD-2967".to_string()),
            planted_date: Some(Utc::now()),
            expected_harvest_date: None,
            stage: CropStage::Growing,
            health: CropHealth::Excellent,
        });
        plot.pest_alerts.push(PestAlert {
            id: Uuid::new_v4(),
            pest_type: "aphids".to_string(),
            severity: AlertSeverity::Medium,
            detected_date: Utc::now(),
            status: AlertStatus::Active,
            treatment: None,
            notes: None,
        });
        plot
    }

    fn farm(rows: u32, cols: u32, total_size: Decimal) -> Farm {
        let shape = GridShape::new(rows, cols);
        Farm {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Reconcile Farm".to_string(),
            location: None,
            soil_type: None,
            total_size,
            grid_annotation: None,
            grid: Some(shape),
            plots: initial_plots(shape, total_size),
            is_active: true,
            revision: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_growing_adds_default_plots() {
        let existing = initial_plots(GridShape::new(2, 2), Decimal::from(4));
        let result = reconcile_plots(existing, GridShape::new(3, 2), dec("0.5"));

        assert_eq!(result.plots.len(), 6);
        assert_eq!(result.kept, vec![1, 2, 3, 4]);
        assert_eq!(result.created, vec![5, 6]);
        assert!(result.dropped.is_empty());
        assert!(result.plots.iter().all(|p| p.size == dec("0.5")));
    }

    #[test]
    fn test_kept_plot_only_changes_size() {
        let mut existing = initial_plots(GridShape::new(4, 4), Decimal::from(16));
        existing[4] = planted(5, Decimal::ONE);
        let before = existing[4].clone();

        let result = reconcile_plots(existing, GridShape::new(3, 3), dec("1.5"));
        let after = &result.plots[4];

        assert_eq!(after.plot_number, 5);
        assert_eq!(after.size, dec("1.5"));
        assert_eq!(after.crop, before.crop);
        assert_eq!(after.pest_alerts, before.pest_alerts);
        assert_eq!(after.activities, before.activities);
        assert_eq!(after.soil_health, before.soil_health);
        assert_eq!(after.irrigation, before.irrigation);
    }

    #[test]
    fn test_shrinking_drops_trailing_numbers() {
        let mut existing = initial_plots(GridShape::new(4, 4), Decimal::from(16));
        existing[11] = planted(12, Decimal::ONE);

        let result = reconcile_plots(existing, GridShape::new(3, 3), Decimal::ONE);

        assert_eq!(result.plots.len(), 9);
        assert_eq!(result.dropped, (10..=16).collect::<Vec<_>>());
        assert_eq!(result.dropped_with_history, vec![12]);
        let numbers: Vec<u32> = result.plots.iter().map(|p| p.plot_number).collect();
        assert_eq!(numbers, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn test_gaps_are_filled() {
        let existing = vec![planted(2, Decimal::ONE), planted(7, Decimal::ONE)];
        let result = reconcile_plots(existing, GridShape::new(2, 2), Decimal::ONE);

        assert_eq!(result.kept, vec![2]);
        assert_eq!(result.created, vec![1, 3, 4]);
        assert_eq!(result.dropped, vec![7]);
        assert!(result.plots[1].is_cultivated());
        assert!(!result.plots[0].is_cultivated());
    }

    #[test]
    fn test_apply_grid_config_scenario() {
        let mut farm = farm(4, 4, dec("2.5"));
        assert_eq!(farm.plots[0].size, dec("0.15625"));
        farm.plots[2] = planted(3, dec("0.15625"));

        let change = apply_grid_config(&mut farm, GridShape::new(2, 2), None).unwrap();

        assert_eq!(change.previous, GridShape::new(4, 4));
        assert_eq!(change.config.plot_size, dec("0.625"));
        assert_eq!(change.dropped, (5..=16).collect::<Vec<_>>());
        assert_eq!(farm.plots.len(), 4);
        assert!(farm.plots[2].is_cultivated());
        assert_eq!(farm.allocated_area(), dec("2.5"));
        assert_eq!(farm.grid, Some(GridShape::new(2, 2)));
        assert_eq!(
            farm.grid_annotation.as_deref(),
            Some("Grid: 2x2, PlotSize: 0.625")
        );
    }

    #[test]
    fn test_apply_grid_config_changes_total_size() {
        let mut farm = farm(2, 2, Decimal::from(4));
        farm.grid_annotation = Some("Irrigated by canal".to_string());

        let change = apply_grid_config(&mut farm, GridShape::new(2, 3), Some(Decimal::from(3))).unwrap();

        assert_eq!(farm.total_size, Decimal::from(3));
        assert_eq!(change.config.plot_size, dec("0.5"));
        assert_eq!(
            farm.grid_annotation.as_deref(),
            Some("Irrigated by canal\nGrid: 2x3, PlotSize: 0.5")
        );
    }

    #[test]
    fn test_apply_grid_config_rejects_bad_input_without_mutation() {
        let mut farm = farm(2, 2, Decimal::from(4));
        let before = farm.clone();

        assert!(apply_grid_config(&mut farm, GridShape::new(0, 3), None).is_err());
        assert!(apply_grid_config(&mut farm, GridShape::new(3, 3), Some(Decimal::ZERO)).is_err());
        assert_eq!(farm, before);
    }
}
