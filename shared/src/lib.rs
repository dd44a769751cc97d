//! Shared types and models for the Farm Records Platform
//!
//! This crate contains the farm and plot models and the pure grid engine shared
//! between the backend and the browser grid editor (via WASM).

pub mod aggregate;
pub mod grid;
pub mod models;
pub mod mutation;
pub mod reconcile;
pub mod types;
pub mod validation;

pub use aggregate::*;
pub use grid::{GridConfig, GridError, GridPosition, GridShape};
pub use models::*;
pub use mutation::{BulkOutcome, MutationError, PlotPatch};
pub use reconcile::{apply_grid_config, GridChange, Reconciliation};
pub use types::*;
pub use validation::*;
