//! Health check endpoints.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use serde::Serialize;

use crate::middleware::AppState;

const RUNNING: &str = "Backend server is running properly";

/// Basic liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Liveness plus process details.
#[derive(Debug, Serialize)]
pub struct HealthDetailResponse {
    #[serde(flatten)]
    pub health: HealthResponse,
    pub environment: EnvironmentInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    pub name: String,
    pub version: &'static str,
    pub os_name: &'static str,
    pub available_processors: usize,
}

fn up() -> HealthResponse {
    HealthResponse {
        status: "UP",
        message: RUNNING,
        timestamp: Utc::now().timestamp_millis(),
    }
}

async fn health() -> Json<HealthResponse> {
    Json(up())
}

async fn health_detail(State(state): State<AppState>) -> Json<HealthDetailResponse> {
    Json(HealthDetailResponse {
        health: up(),
        environment: EnvironmentInfo {
            name: state.environment,
            version: env!("CARGO_PKG_VERSION"),
            os_name: std::env::consts::OS,
            available_processors: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
        },
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/detail", get(health_detail))
}
