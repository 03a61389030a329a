//! Post endpoints. Creating and editing take `multipart/form-data`.

use agora_common::AppResult;
use agora_core::{CreatePostInput, PostResponse, UpdatePostInput};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use crate::{extractors::MultipartForm, middleware::AppState, response::ok};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePostQuery {
    pub user_id: String,
}

/// Create a post from `userId`, `content`, optional `groupId`, any number of
/// `images`, and at most one `video`.
async fn create_post(
    State(state): State<AppState>,
    mut form: MultipartForm,
) -> AppResult<Json<PostResponse>> {
    let input = CreatePostInput {
        user_id: form.required("userId", "User ID is required")?,
        content: form.text("content").unwrap_or_default().to_string(),
        group_id: form.text("groupId").map(ToString::to_string),
        images: form.take_files("images"),
        video: form.take_file("video"),
    };

    tracing::info!(
        user_id = %input.user_id,
        images = input.images.len(),
        has_video = input.video.is_some(),
        "Creating post"
    );

    let post = state.post_service.create(input).await?;
    Ok(Json(post))
}

async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<PostResponse>>> {
    Ok(Json(state.post_service.list_all().await?))
}

async fn list_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<PostResponse>>> {
    Ok(Json(state.post_service.list_by_user(&user_id).await?))
}

async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<PostResponse>> {
    Ok(Json(state.post_service.get(&post_id).await?))
}

async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    mut form: MultipartForm,
) -> AppResult<Json<PostResponse>> {
    let input = UpdatePostInput {
        user_id: form.required("userId", "User ID is required")?,
        content: form.text("content").unwrap_or_default().to_string(),
        images: form.take_files("images"),
    };

    let post = state.post_service.update(&post_id, input).await?;
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(query): Query<DeletePostQuery>,
) -> AppResult<StatusCode> {
    state.post_service.delete(&post_id, &query.user_id).await?;
    Ok(ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/user/{user_id}", get(list_user_posts))
        .route(
            "/{post_id}",
            get(get_post).put(update_post).delete(delete_post),
        )
}
