//! Post reaction endpoints.

use agora_common::{AppError, AppResult};
use agora_core::ReactionCounts;
use agora_db::entities::reaction::ReactionType;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::middleware::AppState;

/// Set reaction request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReactionRequest {
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub reaction_type: Option<String>,
}

/// Who is removing a reaction. Defaults to the reacting user.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveReactionQuery {
    pub actor_id: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct UserReactionResponse {
    #[serde(rename = "type")]
    pub reaction_type: ReactionType,
}

/// React to a post. Repeating the current reaction removes it.
async fn set_reaction(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(req): Json<SetReactionRequest>,
) -> AppResult<Json<ReactionCounts>> {
    let (Some(user_id), Some(reaction_type)) = (req.user_id, req.reaction_type) else {
        return Err(AppError::BadRequest(
            "Both userId and type are required".to_string(),
        ));
    };

    let counts = state
        .reaction_service
        .set_reaction(&post_id, &user_id, &reaction_type)
        .await?;
    Ok(Json(counts))
}

async fn remove_reaction(
    State(state): State<AppState>,
    Path((post_id, user_id)): Path<(String, String)>,
    Query(query): Query<RemoveReactionQuery>,
) -> AppResult<Json<ReactionCounts>> {
    let actor_id = query.actor_id.unwrap_or_else(|| user_id.clone());
    let counts = state
        .reaction_service
        .remove_reaction(&post_id, &user_id, &actor_id, query.is_admin)
        .await?;
    Ok(Json(counts))
}

async fn get_stats(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<ReactionCounts>> {
    Ok(Json(state.reaction_service.get_counts(&post_id).await?))
}

async fn get_user_reaction(
    State(state): State<AppState>,
    Path((post_id, user_id)): Path<(String, String)>,
) -> AppResult<Json<UserReactionResponse>> {
    state
        .reaction_service
        .get_user_reaction(&post_id, &user_id)
        .await?
        .map(|reaction_type| Json(UserReactionResponse { reaction_type }))
        .ok_or_else(|| AppError::NotFound("Reaction not found".to_string()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{post_id}", post(set_reaction))
        .route("/{post_id}/stats", get(get_stats))
        .route(
            "/{post_id}/user/{user_id}",
            get(get_user_reaction).delete(remove_reaction),
        )
}
