//! Admin endpoints: user management and dashboard statistics.
//!
//! These routes carry no access control of their own.

use agora_common::AppResult;
use agora_core::{
    CreateUserInput, DashboardStats, PostStats, TodayPosts, UpdateUserInput, UserStats,
};
use agora_db::entities::user;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};

use super::users::RoleRequest;
use crate::{
    middleware::AppState,
    response::{Created, ok},
};

async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<user::Model>>> {
    Ok(Json(state.admin_service.list_users().await?))
}

async fn list_blocked(State(state): State<AppState>) -> AppResult<Json<Vec<user::Model>>> {
    Ok(Json(state.admin_service.list_blocked().await?))
}

async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<Created<user::Model>> {
    Ok(Created(state.admin_service.create_user(input).await?))
}

async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<user::Model>> {
    Ok(Json(state.admin_service.update_user(&user_id, input).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<StatusCode> {
    state.admin_service.delete_user(&user_id).await?;
    Ok(ok())
}

async fn toggle_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<user::Model>> {
    Ok(Json(state.admin_service.toggle_status(&user_id).await?))
}

async fn update_role(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> AppResult<Json<user::Model>> {
    let role = req.role.unwrap_or_default();
    Ok(Json(state.user_service.update_role(&user_id, &role).await?))
}

async fn dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardStats>> {
    Ok(Json(state.stats_service.dashboard().await?))
}

async fn user_stats(State(state): State<AppState>) -> AppResult<Json<UserStats>> {
    Ok(Json(state.stats_service.user_stats().await?))
}

async fn post_stats(State(state): State<AppState>) -> AppResult<Json<PostStats>> {
    Ok(Json(state.stats_service.post_stats().await?))
}

async fn today_posts(State(state): State<AppState>) -> AppResult<Json<TodayPosts>> {
    Ok(Json(state.stats_service.today_posts().await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/blocked", get(list_blocked))
        .route("/users/{user_id}", put(update_user).delete(delete_user))
        .route("/users/{user_id}/toggle-status", put(toggle_status))
        .route("/users/{user_id}/role", put(update_role))
        .route("/stats", get(dashboard))
        .route("/stats/users", get(user_stats))
        .route("/stats/posts", get(post_stats))
        .route("/stats/posts/today", get(today_posts))
}
