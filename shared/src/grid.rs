//! Grid configuration for farm plots
//!
//! Covers the grid shape, the per-plot size derived from a farm's total area, and the
//! `Grid: {rows}x{cols}, PlotSize: {size}` pattern that older farm records carry inside
//! their free-text description.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Plot;

pub const DEFAULT_ROWS: u32 = 4;
pub const DEFAULT_COLS: u32 = 4;

/// Largest row or column count accepted for a grid
pub const MAX_GRID_DIMENSION: u32 = 50;

/// Plot size used when a grid has no cells (0.16 acres)
pub const FALLBACK_PLOT_SIZE: Decimal = Decimal::from_parts(16, 0, 0, false, 2);

/// Allowed ratio of summed plot sizes over the farm's total size (1.1)
pub const AREA_SLACK: Decimal = Decimal::from_parts(11, 0, 0, false, 1);

/// Decimal places kept when a plot size is written into an annotation
const ANNOTATION_SIZE_SCALE: u32 = 6;

static GRID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Grid:\s*(\d+)\s*x\s*(\d+),\s*PlotSize:\s*(\d+(?:\.\d+)?)")
        .expect("grid annotation pattern")
});

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Grid must have between 1 and {max} rows and columns, got {rows}x{cols}")]
    InvalidDimensions { rows: u32, cols: u32, max: u32 },

    #[error("Total size must be greater than zero")]
    InvalidTotalSize,

    #[error("Plot sizes add up to {allocated}, more than 110% of the farm's {total_size}")]
    InvariantDrift {
        allocated: Decimal,
        total_size: Decimal,
    },
}

/// Row and column count of a farm grid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GridShape {
    pub rows: u32,
    pub cols: u32,
}

impl GridShape {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn plot_count(&self) -> u32 {
        self.rows.saturating_mul(self.cols)
    }

    pub fn validate(&self) -> Result<(), GridError> {
        let in_range = |n: u32| (1..=MAX_GRID_DIMENSION).contains(&n);
        if in_range(self.rows) && in_range(self.cols) {
            Ok(())
        } else {
            Err(GridError::InvalidDimensions {
                rows: self.rows,
                cols: self.cols,
                max: MAX_GRID_DIMENSION,
            })
        }
    }

    /// Zero-based cell holding a plot number, row-major
    pub fn position_of(&self, plot_number: u32) -> Option<GridPosition> {
        if plot_number == 0 || plot_number > self.plot_count() {
            return None;
        }
        let index = plot_number - 1;
        Some(GridPosition {
            row: index / self.cols,
            col: index % self.cols,
        })
    }

    /// Plot number shown at a zero-based cell, row-major
    pub fn plot_number_at(&self, position: GridPosition) -> Option<u32> {
        if position.row >= self.rows || position.col >= self.cols {
            return None;
        }
        Some(position.row * self.cols + position.col + 1)
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

/// Zero-based cell coordinates, used only when laying plots out for display
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridPosition {
    pub row: u32,
    pub col: u32,
}

/// Grid shape plus the derived size of each plot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    pub rows: u32,
    pub cols: u32,
    pub plot_size: Decimal,
}

impl GridConfig {
    pub fn for_total_size(shape: GridShape, total_size: Decimal) -> Self {
        Self {
            rows: shape.rows,
            cols: shape.cols,
            plot_size: plot_size(total_size, shape.rows, shape.cols),
        }
    }

    pub fn shape(&self) -> GridShape {
        GridShape::new(self.rows, self.cols)
    }
}

/// Size of each plot when `total_size` is split evenly over the grid
pub fn plot_size(total_size: Decimal, rows: u32, cols: u32) -> Decimal {
    let count = u64::from(rows) * u64::from(cols);
    if count == 0 {
        return FALLBACK_PLOT_SIZE;
    }
    total_size / Decimal::from(count)
}

/// Fails when the plots claim more than 110% of the farm's area
pub fn check_area_invariant(total_size: Decimal, plots: &[Plot]) -> Result<(), GridError> {
    let allocated: Decimal = plots.iter().map(|plot| plot.size).sum();
    if allocated > total_size * AREA_SLACK {
        return Err(GridError::InvariantDrift {
            allocated,
            total_size,
        });
    }
    Ok(())
}

/// The annotation pattern for a grid configuration
pub fn encode(config: &GridConfig) -> String {
    format!(
        "Grid: {}x{}, PlotSize: {}",
        config.rows,
        config.cols,
        config.plot_size.round_dp(ANNOTATION_SIZE_SCALE).normalize()
    )
}

/// Replace any grid pattern in `existing` with the encoding of `config`.
///
/// Human-written text is kept; the pattern goes on its own trailing line.
pub fn write_annotation(existing: Option<&str>, config: &GridConfig) -> String {
    let encoded = encode(config);
    let text = existing.map(strip_annotation).unwrap_or_default();
    if text.is_empty() {
        encoded
    } else {
        format!("{}\n{}", text, encoded)
    }
}

/// Remove every grid pattern from a description.
///
/// A line that held nothing but the pattern is dropped; every other line is kept as
/// written. Whitespace-only text counts as no text.
pub fn strip_annotation(text: &str) -> String {
    let kept: Vec<Cow<'_, str>> = text
        .split('\n')
        .filter_map(|line| {
            if !GRID_PATTERN.is_match(line) {
                return Some(Cow::Borrowed(line));
            }
            let rest = GRID_PATTERN.replace_all(line, "");
            let rest = rest.trim_end();
            (!rest.trim().is_empty()).then(|| Cow::Owned(rest.to_string()))
        })
        .collect();

    let stripped = kept.join("\n");
    if stripped.trim().is_empty() {
        String::new()
    } else {
        stripped
    }
}

/// Grid configuration embedded in a description, if any.
///
/// A pattern with a zero dimension or an out-of-range number is ignored.
pub fn decode(annotation: &str) -> Option<GridConfig> {
    GRID_PATTERN.captures_iter(annotation).find_map(|caps| {
        let rows = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let cols = caps.get(2)?.as_str().parse::<u32>().ok()?;
        let plot_size = caps.get(3)?.as_str().parse::<Decimal>().ok()?;
        if rows == 0 || cols == 0 {
            return None;
        }
        Some(GridConfig {
            rows,
            cols,
            plot_size,
        })
    })
}

/// Best-effort shape for plots that were saved without any grid record.
///
/// Works from the highest plot number: small farms get a near-square grid, larger
/// ones the most square exact factorisation.
pub fn infer_shape(plots: &[Plot]) -> GridShape {
    let max_plot_number = plots.iter().map(|plot| plot.plot_number).max().unwrap_or(0);
    if max_plot_number == 0 {
        return GridShape::default();
    }

    if max_plot_number <= 16 {
        let rows = ceil_sqrt(max_plot_number);
        return GridShape::new(rows, max_plot_number.div_ceil(rows));
    }

    most_square_factors(max_plot_number)
}

/// Shape from the annotation if it has one, otherwise inferred from the plots
pub fn resolve_shape(annotation: Option<&str>, plots: &[Plot]) -> GridShape {
    annotation
        .and_then(decode)
        .map(|config| config.shape())
        .unwrap_or_else(|| infer_shape(plots))
}

fn ceil_sqrt(n: u32) -> u32 {
    let n = u64::from(n);
    let mut root = 1u64;
    while root * root < n {
        root += 1;
    }
    root as u32
}

// Rows never exceed columns, so the largest divisor up to the square root gives the
// smallest aspect ratio.
fn most_square_factors(n: u32) -> GridShape {
    let mut rows = 1u32;
    let mut candidate = 1u32;
    while u64::from(candidate) * u64::from(candidate) <= u64::from(n) {
        if n % candidate == 0 {
            rows = candidate;
        }
        candidate += 1;
    }
    GridShape::new(rows, n / rows)
}
