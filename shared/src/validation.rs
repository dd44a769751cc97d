//! Validation utilities for the Farm Records Platform
//!
//! Checks run on request input before any farm is loaded or saved.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::grid::MAX_GRID_DIMENSION;
use crate::models::Plot;
use crate::mutation::SoilHealthPatch;

// ============================================================================
// Farm Validations
// ============================================================================

/// Validate that a farm's total size is positive
pub fn validate_total_size(total_size: Decimal) -> Result<(), &'static str> {
    if total_size <= Decimal::ZERO {
        return Err("Total size must be greater than zero");
    }
    Ok(())
}

/// Validate a caller-supplied plot collection: unique positive numbers, positive sizes
pub fn validate_plot_collection(plots: &[Plot]) -> Result<(), &'static str> {
    let mut seen = HashSet::with_capacity(plots.len());
    for plot in plots {
        if plot.plot_number == 0 {
            return Err("Plot numbers start at 1");
        }
        if !seen.insert(plot.plot_number) {
            return Err("Plot numbers must be unique");
        }
        if plot.size <= Decimal::ZERO {
            return Err("Plot size must be greater than zero");
        }
    }
    Ok(())
}

// ============================================================================
// Plot Operation Validations
// ============================================================================

/// Validate the target list of a bulk operation
pub fn validate_plot_numbers(plot_numbers: &[u32]) -> Result<(), &'static str> {
    if plot_numbers.is_empty() {
        return Err("plotNumbers must be a non-empty list");
    }
    let max_plots = (MAX_GRID_DIMENSION * MAX_GRID_DIMENSION) as usize;
    if plot_numbers.len() > max_plots {
        return Err("Too many plot numbers in one request");
    }
    if plot_numbers.contains(&0) {
        return Err("Plot numbers start at 1");
    }
    Ok(())
}

/// Validate soil readings are within physical ranges
pub fn validate_soil_readings(soil: &SoilHealthPatch) -> Result<(), &'static str> {
    if let Some(ph) = soil.ph {
        if ph < Decimal::ZERO || ph > Decimal::from(14) {
            return Err("Soil pH must be between 0 and 14");
        }
    }
    for value in [soil.moisture, soil.organic_matter].into_iter().flatten() {
        if value < Decimal::ZERO || value > Decimal::from(100) {
            return Err("Soil percentages must be between 0 and 100");
        }
    }
    for value in [soil.nitrogen, soil.phosphorus, soil.potassium].into_iter().flatten() {
        if value < Decimal::ZERO {
            return Err("Nutrient levels cannot be negative");
        }
    }
    Ok(())
}
