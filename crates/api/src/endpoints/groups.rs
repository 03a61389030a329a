//! Group endpoints.

use agora_common::AppResult;
use agora_core::{CreateGroupInput, GroupResponse, PostResponse, UpdateGroupInput};
use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use crate::{extractors::MultipartForm, middleware::AppState, response::ok};

/// The acting user, passed as `?userId=`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberQuery {
    pub user_id: String,
}

/// Create a group from `name`, `description`, `userId`, and an optional
/// `coverImage` file.
async fn create_group(
    State(state): State<AppState>,
    mut form: MultipartForm,
) -> AppResult<Json<GroupResponse>> {
    let input = CreateGroupInput {
        name: form.required("name", "Group name is required")?,
        description: form.text("description").map(ToString::to_string),
        user_id: form.required("userId", "User ID is required")?,
    };
    let cover = form.take_file("coverImage");

    let group = state.group_service.create(input, cover).await?;
    Ok(Json(group))
}

async fn list_groups(State(state): State<AppState>) -> AppResult<Json<Vec<GroupResponse>>> {
    Ok(Json(state.group_service.list_all().await?))
}

async fn list_user_groups(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<GroupResponse>>> {
    Ok(Json(state.group_service.list_for_member(&user_id).await?))
}

async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> AppResult<Json<GroupResponse>> {
    Ok(Json(state.group_service.get(&group_id).await?))
}

async fn list_group_posts(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> AppResult<Json<Vec<PostResponse>>> {
    Ok(Json(state.post_service.list_by_group(&group_id).await?))
}

async fn update_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Form(input): Form<UpdateGroupInput>,
) -> AppResult<Json<GroupResponse>> {
    Ok(Json(state.group_service.update(&group_id, input).await?))
}

async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Query(query): Query<MemberQuery>,
) -> AppResult<StatusCode> {
    state.group_service.delete(&group_id, &query.user_id).await?;
    Ok(ok())
}

async fn join_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Query(query): Query<MemberQuery>,
) -> AppResult<Json<GroupResponse>> {
    Ok(Json(state.group_service.join(&group_id, &query.user_id).await?))
}

async fn leave_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Query(query): Query<MemberQuery>,
) -> AppResult<Json<GroupResponse>> {
    Ok(Json(state.group_service.leave(&group_id, &query.user_id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/user/{user_id}", get(list_user_groups))
        .route(
            "/{group_id}",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route("/{group_id}/posts", get(list_group_posts))
        .route("/{group_id}/join", post(join_group))
        .route("/{group_id}/leave", post(leave_group))
}
