//! Business logic services for the Farm Records Platform

pub mod dashboard;
pub mod farm;
pub mod plot;

pub use dashboard::DashboardService;
pub use farm::FarmService;
pub use plot::PlotService;
