//! Notification endpoints.

use agora_common::{AppError, AppResult};
use agora_db::entities::notification;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
};
use serde::Deserialize;

use crate::{
    middleware::AppState,
    response::{CountResponse, ok},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

impl UserQuery {
    fn require(self) -> AppResult<String> {
        self.user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("User ID is required".to_string()))
    }
}

/// Notifications for a user, newest first.
async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<Vec<notification::Model>>> {
    let user_id = query.require()?;
    Ok(Json(state.notification_service.list_for_user(&user_id).await?))
}

async fn unread_count(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<CountResponse>> {
    let user_id = query.require()?;
    let count = state.notification_service.unread_count(&user_id).await?;
    Ok(Json(CountResponse { count }))
}

async fn mark_as_read(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .notification_service
        .mark_as_read(&notification_id)
        .await?;
    Ok(ok())
}

async fn mark_all_as_read(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> AppResult<StatusCode> {
    let user_id = query.require()?;
    let updated = state.notification_service.mark_all_as_read(&user_id).await?;
    tracing::debug!(user_id = %user_id, updated, "Marked notifications read");
    Ok(ok())
}

async fn delete_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> AppResult<StatusCode> {
    state.notification_service.delete(&notification_id).await?;
    Ok(ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/mark-all-read", put(mark_all_as_read))
        .route("/{notification_id}/read", put(mark_as_read))
        .route("/{notification_id}", delete(delete_notification))
}
