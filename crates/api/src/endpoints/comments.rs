//! Comment endpoints.
//!
//! Writes take form-encoded bodies or query parameters rather than JSON.

use agora_common::{AppError, AppResult};
use agora_core::{
    CommentResponse, CreateCommentInput,
    comment::{DEFAULT_COMMENT_LIMIT, parse_mentions},
};
use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;

use crate::{
    middleware::AppState,
    response::{CountResponse, Created, ok},
};

/// Create comment form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentForm {
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    pub parent_comment_id: Option<String>,
    /// Comma-separated user IDs.
    pub mentions: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentForm {
    pub user_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentQuery {
    pub user_id: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsQuery {
    pub limit: Option<u64>,
    pub current_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactQuery {
    pub user_id: String,
    pub reaction_type: Option<String>,
}

async fn create_comment(
    State(state): State<AppState>,
    Form(form): Form<CreateCommentForm>,
) -> AppResult<Created<CommentResponse>> {
    let input = CreateCommentInput {
        post_id: form.post_id,
        user_id: form.user_id,
        content: form.content,
        parent_comment_id: form.parent_comment_id.filter(|id| !id.trim().is_empty()),
        mentions: form.mentions.as_deref().map(parse_mentions).unwrap_or_default(),
    };

    let comment = state.comment_service.create(input).await?;
    Ok(Created(comment))
}

/// Rejections are plain-text 400s, like delete.
async fn update_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Form(form): Form<UpdateCommentForm>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state
        .comment_service
        .update(&comment_id, &form.user_id, &form.content)
        .await
        .map_err(AppError::into_bad_request)?;
    Ok(Json(comment))
}

/// Every rejection here is reported as a plain-text 400.
async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Query(query): Query<DeleteCommentQuery>,
) -> AppResult<StatusCode> {
    state
        .comment_service
        .delete(&comment_id, &query.user_id, query.is_admin)
        .await
        .map_err(AppError::into_bad_request)?;
    Ok(ok())
}

async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(query): Query<ListCommentsQuery>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    let comments = state
        .comment_service
        .list_for_post(
            &post_id,
            query.limit.unwrap_or(DEFAULT_COMMENT_LIMIT),
            query.current_user_id.as_deref(),
        )
        .await?;
    Ok(Json(comments))
}

async fn count_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<CountResponse>> {
    let count = state.comment_service.count_for_post(&post_id).await?;
    Ok(Json(CountResponse { count }))
}

/// Toggle the caller's like on a comment.
async fn react_to_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Query(query): Query<ReactQuery>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state
        .comment_service
        .react(&comment_id, &query.user_id, query.reaction_type.as_deref())
        .await
        .map_err(AppError::into_bad_request)?;
    Ok(Json(comment))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_comment))
        .route("/{comment_id}", put(update_comment).delete(delete_comment))
        .route("/{comment_id}/react", post(react_to_comment))
        .route("/post/{post_id}", get(list_comments))
        .route("/count/{post_id}", get(count_comments))
}
