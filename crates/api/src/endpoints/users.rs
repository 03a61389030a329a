//! User profile endpoints.

use agora_common::{AppError, AppResult};
use agora_core::{PostResponse, UpdateProfileInput};
use agora_db::entities::user;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use serde::Deserialize;

use crate::{extractors::MultipartForm, middleware::AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

/// Role change request, e.g. `{"role": "ROLE_ADMIN"}`.
#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Option<String>,
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<user::Model>> {
    Ok(Json(state.user_service.get(&user_id).await?))
}

/// Update `firstName`, `lastName`, and `bio`, and optionally replace the
/// picture sent as `profilePicture`.
async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    mut form: MultipartForm,
) -> AppResult<Json<user::Model>> {
    let input = UpdateProfileInput {
        first_name: form.text("firstName").map(ToString::to_string),
        last_name: form.text("lastName").map(ToString::to_string),
        bio: form.text("bio").map(ToString::to_string),
    };

    let mut updated = state.user_service.update_profile(&user_id, input).await?;
    if let Some(picture) = form.take_file("profilePicture") {
        updated = state.user_service.upload_avatar(&user_id, picture).await?;
    }
    Ok(Json(updated))
}

async fn upload_avatar(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    mut form: MultipartForm,
) -> AppResult<Json<user::Model>> {
    let picture = form
        .take_file("file")
        .or_else(|| form.take_file("profilePicture"))
        .ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    Ok(Json(state.user_service.upload_avatar(&user_id, picture).await?))
}

async fn user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<PostResponse>>> {
    Ok(Json(state.post_service.list_by_user(&user_id).await?))
}

async fn update_role(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<RoleRequest>,
) -> AppResult<Json<user::Model>> {
    let role = req
        .role
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Role is required".to_string()))?;

    Ok(Json(state.user_service.update_role(&user_id, &role).await?))
}

async fn promote_to_admin(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<user::Model>> {
    Ok(Json(state.user_service.promote_to_admin(&user_id).await?))
}

async fn demote_to_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<user::Model>> {
    Ok(Json(state.user_service.demote_to_user(&user_id).await?))
}

async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<user::Model>>> {
    Ok(Json(state.user_service.search(&query.query).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search_users))
        .route("/{user_id}", get(get_user).put(update_user))
        .route("/{user_id}/avatar", post(upload_avatar))
        .route("/{user_id}/posts", get(user_posts))
        .route("/{user_id}/update-role", put(update_role))
        .route("/{user_id}/promote-to-admin", put(promote_to_admin))
        .route("/{user_id}/demote-to-user", put(demote_to_user))
}
