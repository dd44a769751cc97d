//! Domain models for the Farm Records Platform
//!
//! Re-exports models from the shared crate

pub use shared::grid::GridShape;
pub use shared::models::*;
