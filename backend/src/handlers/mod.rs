//! HTTP handlers for the Farm Records Platform

pub mod dashboard;
pub mod farm;
pub mod health;
pub mod plot;

pub use dashboard::*;
pub use farm::*;
pub use health::*;
pub use plot::*;
