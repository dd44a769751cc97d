//! Domain models for the Farm Records Platform

mod farm;
mod plot;

pub use farm::*;
pub use plot::*;
