//! Liveness handler

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub database: &'static str,
}

/// Reports 503 while the database is unreachable
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_up = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    if !database_up {
        tracing::warn!("Health check could not reach the database");
    }

    let (status, code, database) = if database_up {
        ("healthy", StatusCode::OK, "connected")
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE, "disconnected")
    };

    (
        code,
        Json(HealthResponse {
            status,
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            environment: state.config.environment.clone(),
            database,
        }),
    )
}
