//! WebAssembly module for the Farm Records Platform
//!
//! Runs the grid computations in the browser so the grid editor can preview a resize
//! before saving it:
//! - Plot size and area checks
//! - Grid annotation encode/decode and shape inference
//! - Resize previews (which plots are kept, created or dropped)
//! - Farm rollups and season labels
//!
//! Decimals cross the boundary as strings and structured values as JSON text, in the
//! same camelCase shape the REST API uses.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use shared::aggregate::{FarmAggregateView, Season};
use shared::grid::{self, GridConfig, GridShape};
use shared::models::Plot;
use shared::reconcile::reconcile_plots;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("farm-records-wasm loaded"));
}

fn to_js_error(message: String) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}

// ============================================================================
// Exports
// ============================================================================

/// Size of each plot when `total_size` acres are split over `rows * cols` plots
#[wasm_bindgen]
pub fn calculate_plot_size(total_size: &str, rows: u32, cols: u32) -> Result<String, JsValue> {
    plot_size_text(total_size, rows, cols).map_err(to_js_error)
}

/// Description text with its grid pattern replaced by the given configuration
#[wasm_bindgen]
pub fn encode_grid_annotation(
    existing: Option<String>,
    rows: u32,
    cols: u32,
    total_size: &str,
) -> Result<String, JsValue> {
    annotation_text(existing.as_deref(), rows, cols, total_size).map_err(to_js_error)
}

/// Grid configuration embedded in a description as JSON, or `undefined`
#[wasm_bindgen]
pub fn decode_grid_annotation(text: &str) -> Option<String> {
    grid::decode(text).and_then(|config| serde_json::to_string(&config).ok())
}

/// Grid shape for a plot list, from the description if it has one, else inferred
#[wasm_bindgen]
pub fn resolve_grid_shape(annotation: Option<String>, plots_json: &str) -> Result<String, JsValue> {
    resolved_shape_json(annotation.as_deref(), plots_json).map_err(to_js_error)
}

/// What saving a new grid would do to the current plots
#[wasm_bindgen]
pub fn preview_grid_resize(
    plots_json: &str,
    rows: u32,
    cols: u32,
    total_size: &str,
) -> Result<String, JsValue> {
    resize_preview_json(plots_json, rows, cols, total_size).map_err(to_js_error)
}

/// Zero-based `{row, col}` of a plot number as JSON, or `undefined` when outside the grid
#[wasm_bindgen]
pub fn plot_position(plot_number: u32, rows: u32, cols: u32) -> Option<String> {
    GridShape::new(rows, cols)
        .position_of(plot_number)
        .and_then(|position| serde_json::to_string(&position).ok())
}

/// Whether the plots fit within 110% of the farm's area
#[wasm_bindgen]
pub fn check_area_invariant(total_size: &str, plots_json: &str) -> Result<bool, JsValue> {
    area_within_limit(total_size, plots_json).map_err(to_js_error)
}

/// Stats for a plot list as JSON; `now_ms` is a JavaScript timestamp
#[wasm_bindgen]
pub fn compute_farm_stats(plots_json: &str, total_size: &str, now_ms: f64) -> Result<String, JsValue> {
    stats_json(plots_json, total_size, now_ms as i64).map_err(to_js_error)
}

/// Season label such as "Rabi 2025" for the browser's current date
#[wasm_bindgen]
pub fn current_season_label() -> String {
    let today = js_sys::Date::new_0();
    season_text(today.get_month() + 1, today.get_full_year())
}

// ============================================================================
// Computations
// ============================================================================

fn parse_decimal(field: &str, text: &str) -> Result<Decimal, String> {
    Decimal::from_str(text.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

fn parse_plots(plots_json: &str) -> Result<Vec<Plot>, String> {
    serde_json::from_str(plots_json).map_err(|e| format!("Invalid plots JSON: {}", e))
}

fn checked_shape(rows: u32, cols: u32) -> Result<GridShape, String> {
    let shape = GridShape::new(rows, cols);
    shape.validate().map_err(|e| e.to_string())?;
    Ok(shape)
}

fn plot_size_text(total_size: &str, rows: u32, cols: u32) -> Result<String, String> {
    let total_size = parse_decimal("total size", total_size)?;
    Ok(grid::plot_size(total_size, rows, cols).normalize().to_string())
}

fn annotation_text(
    existing: Option<&str>,
    rows: u32,
    cols: u32,
    total_size: &str,
) -> Result<String, String> {
    let shape = checked_shape(rows, cols)?;
    let config = GridConfig::for_total_size(shape, parse_decimal("total size", total_size)?);
    Ok(grid::write_annotation(existing, &config))
}

fn resolved_shape_json(annotation: Option<&str>, plots_json: &str) -> Result<String, String> {
    let plots = parse_plots(plots_json)?;
    let shape = grid::resolve_shape(annotation, &plots);
    serde_json::to_string(&shape).map_err(|e| e.to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResizePreview {
    config: GridConfig,
    plots: Vec<Plot>,
    kept: Vec<u32>,
    created: Vec<u32>,
    dropped: Vec<u32>,
    dropped_with_history: Vec<u32>,
    area_ok: bool,
}

fn resize_preview_json(
    plots_json: &str,
    rows: u32,
    cols: u32,
    total_size: &str,
) -> Result<String, String> {
    let shape = checked_shape(rows, cols)?;
    let total_size = parse_decimal("total size", total_size)?;
    let config = GridConfig::for_total_size(shape, total_size);

    let result = reconcile_plots(parse_plots(plots_json)?, shape, config.plot_size);
    let area_ok = grid::check_area_invariant(total_size, &result.plots).is_ok();

    serde_json::to_string(&ResizePreview {
        config,
        plots: result.plots,
        kept: result.kept,
        created: result.created,
        dropped: result.dropped,
        dropped_with_history: result.dropped_with_history,
        area_ok,
    })
    .map_err(|e| e.to_string())
}

fn area_within_limit(total_size: &str, plots_json: &str) -> Result<bool, String> {
    let total_size = parse_decimal("total size", total_size)?;
    let plots = parse_plots(plots_json)?;
    Ok(grid::check_area_invariant(total_size, &plots).is_ok())
}

fn stats_json(plots_json: &str, total_size: &str, now_ms: i64) -> Result<String, String> {
    let plots = parse_plots(plots_json)?;
    let total_size = parse_decimal("total size", total_size)?;
    let now = DateTime::<Utc>::from_timestamp_millis(now_ms)
        .ok_or_else(|| format!("Timestamp out of range: {}", now_ms))?;
    serde_json::to_string(&FarmAggregateView::compute(&plots, total_size, now))
        .map_err(|e| e.to_string())
}

fn season_text(month: u32, year: u32) -> String {
    format!("{} {}", Season::for_month(month), year)
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_calculate_plot_size_export() {
        assert_eq!(calculate_plot_size("16", 4, 4).unwrap(), "1");
        assert!(calculate_plot_size("-", 4, 4).is_err());
    }

    #[wasm_bindgen_test]
    fn test_current_season_label_has_year() {
        let label = current_season_label();
        assert!(label.starts_with("Kharif") || label.starts_with("Rabi") || label.starts_with("Summer"));
    }
}
