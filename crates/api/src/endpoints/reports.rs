//! Report endpoints for the moderation queue.

use agora_common::AppResult;
use agora_core::{
    CreateReportInput, ReportPage, ReportStats, ResolveReportInput,
    report::{DEFAULT_PAGE_SIZE, DEFAULT_RECENT_LIMIT},
};
use agora_db::entities::report;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, put},
};
use serde::Deserialize;

use crate::{middleware::AppState, response::Created};

/// Page request; `page` is zero-based.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
}

const fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: u64,
}

const fn default_recent_limit() -> u64 {
    DEFAULT_RECENT_LIMIT
}

async fn create_report(
    State(state): State<AppState>,
    Json(input): Json<CreateReportInput>,
) -> AppResult<Created<report::Model>> {
    Ok(Created(state.report_service.create(input).await?))
}

async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ReportPage>> {
    Ok(Json(state.report_service.list(query.page, query.size).await?))
}

async fn list_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> AppResult<Json<Vec<report::Model>>> {
    Ok(Json(state.report_service.list_by_status(&status).await?))
}

async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> AppResult<Json<report::Model>> {
    Ok(Json(state.report_service.get(&report_id).await?))
}

async fn report_stats(State(state): State<AppState>) -> AppResult<Json<ReportStats>> {
    Ok(Json(state.report_service.stats().await?))
}

async fn recent_reports(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<Vec<report::Model>>> {
    Ok(Json(state.report_service.recent(query.limit).await?))
}

async fn update_status(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Json(input): Json<ResolveReportInput>,
) -> AppResult<Json<report::Model>> {
    Ok(Json(
        state.report_service.update_status(&report_id, input).await?,
    ))
}

/// Remove the reported post and resolve the report.
async fn delete_reported_post(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Json(input): Json<ResolveReportInput>,
) -> AppResult<Json<report::Model>> {
    Ok(Json(
        state
            .report_service
            .delete_reported_post(&report_id, input)
            .await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reports).post(create_report))
        .route("/stats", get(report_stats))
        .route("/recent", get(recent_reports))
        .route("/status/{status}", get(list_by_status))
        .route("/{report_id}", get(get_report))
        .route("/{report_id}/status", put(update_status))
        .route("/{report_id}/post", delete(delete_reported_post))
}
