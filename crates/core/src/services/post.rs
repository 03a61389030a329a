//! Post service.

use std::collections::{BTreeSet, HashMap};

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::{
        post::{self, MediaRef},
        user,
    },
    repositories::{GroupRepository, PostRepository, UserRepository},
};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::Set;
use serde::Serialize;

use crate::services::{
    media::{MediaService, MediaUpload},
    policy::can_modify,
    reaction::ReactionCounts,
};

/// Input for creating a post.
#[derive(Debug, Clone, Default)]
pub struct CreatePostInput {
    pub user_id: String,
    pub content: String,
    /// Group the post is shared to. The author must be a member.
    pub group_id: Option<String>,
    pub images: Vec<MediaUpload>,
    pub video: Option<MediaUpload>,
}

/// Input for editing a post. Non-empty `images` replace all existing media.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    pub user_id: String,
    pub content: String,
    pub images: Vec<MediaUpload>,
}

/// Post response with author info and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_profile_picture: Option<String>,
    pub group_id: Option<String>,
    pub content: String,
    pub media: Vec<MediaRef>,
    pub comment_count: usize,
    pub reaction_counts: ReactionCounts,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl PostResponse {
    #[must_use]
    pub fn from_model(model: post::Model, author: Option<&user::Model>) -> Self {
        let media = model.media_refs();
        let comment_count = model.comment_id_list().len();
        let reaction_counts = ReactionCounts::from_stored(&model.reaction_count_map());
        let user_name = author
            .map(user::Model::display_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown User".to_string());

        Self {
            id: model.id,
            user_id: model.user_id,
            user_name,
            user_profile_picture: author.and_then(|a| a.profile_picture.clone()),
            group_id: model.group_id,
            content: model.content,
            media,
            comment_count,
            reaction_counts,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    media: MediaService,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
        media: MediaService,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            group_repo,
            media,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a post with optional images, video, and group.
    pub async fn create(&self, input: CreatePostInput) -> AppResult<PostResponse> {
        let video = input.video.as_ref().filter(|v| !v.is_empty());
        let images: Vec<MediaUpload> = input
            .images
            .into_iter()
            .filter(|i| !i.is_empty())
            .collect();

        if input.user_id.trim().is_empty() {
            return Err(AppError::BadRequest("User ID is required".to_string()));
        }
        if input.content.trim().is_empty() && video.is_none() && images.is_empty() {
            return Err(AppError::BadRequest(
                "Post must have content, images, or a video".to_string(),
            ));
        }

        if let Some(group_id) = input.group_id.as_deref() {
            let group = self.group_repo.get_by_id(group_id).await?;
            if !group.has_member(&input.user_id) {
                return Err(AppError::Forbidden(
                    "You must be a member of the group to post in it".to_string(),
                ));
            }
        }

        let media = self.media.store_all(&input.user_id, video, &images).await?;

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(input.user_id.clone()),
            group_id: Set(input.group_id.clone()),
            content: Set(input.content),
            media: Set(serde_json::json!(media)),
            comment_ids: Set(serde_json::json!([])),
            reaction_counts: Set(serde_json::json!({})),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = match self.post_repo.create(model).await {
            Ok(p) => p,
            Err(e) => {
                self.media.discard(&media).await;
                return Err(e);
            }
        };

        tracing::info!(post_id = %created.id, user_id = %created.user_id, media = media.len(), "Post created");

        let author = self.user_repo.find_by_id(&created.user_id).await?;
        Ok(PostResponse::from_model(created, author.as_ref()))
    }

    pub async fn get(&self, post_id: &str) -> AppResult<PostResponse> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let author = self.user_repo.find_by_id(&post.user_id).await?;
        Ok(PostResponse::from_model(post, author.as_ref()))
    }

    /// All posts, newest first.
    pub async fn list_all(&self) -> AppResult<Vec<PostResponse>> {
        let posts = self.post_repo.find_all().await?;
        self.respond_all(posts).await
    }

    pub async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<PostResponse>> {
        let posts = self.post_repo.find_by_user(user_id).await?;
        self.respond_all(posts).await
    }

    pub async fn list_by_group(&self, group_id: &str) -> AppResult<Vec<PostResponse>> {
        let posts = self.post_repo.find_by_group(group_id).await?;
        self.respond_all(posts).await
    }

    /// Edit a post. Only its author may do so.
    pub async fn update(&self, post_id: &str, input: UpdatePostInput) -> AppResult<PostResponse> {
        let existing = self.post_repo.get_by_id(post_id).await?;
        if !can_modify(&input.user_id, &existing.user_id, false) {
            return Err(AppError::Forbidden(
                "You can only update your own posts".to_string(),
            ));
        }

        let images: Vec<MediaUpload> = input
            .images
            .into_iter()
            .filter(|i| !i.is_empty())
            .collect();
        let old_media = existing.media_refs();

        if input.content.trim().is_empty() && images.is_empty() && old_media.is_empty() {
            return Err(AppError::BadRequest(
                "Post must have content, images, or a video".to_string(),
            ));
        }

        let new_media = if images.is_empty() {
            None
        } else {
            Some(self.media.store_all(&input.user_id, None, &images).await?)
        };

        let mut active: post::ActiveModel = existing.into();
        active.content = Set(input.content);
        active.updated_at = Set(Some(Utc::now().into()));
        if let Some(ref media) = new_media {
            active.media = Set(serde_json::json!(media));
        }

        let updated = match self.post_repo.update(active).await {
            Ok(p) => p,
            Err(e) => {
                if let Some(ref media) = new_media {
                    self.media.discard(media).await;
                }
                return Err(e);
            }
        };

        if new_media.is_some() {
            self.media.discard(&old_media).await;
        }

        let author = self.user_repo.find_by_id(&updated.user_id).await?;
        Ok(PostResponse::from_model(updated, author.as_ref()))
    }

    /// Delete a post and its media. Only its author may do so.
    pub async fn delete(&self, post_id: &str, user_id: &str) -> AppResult<()> {
        let existing = self.post_repo.get_by_id(post_id).await?;
        if !can_modify(user_id, &existing.user_id, false) {
            return Err(AppError::Forbidden(
                "You can only delete your own posts".to_string(),
            ));
        }

        self.remove(existing).await
    }

    /// Delete a post on behalf of a moderator.
    pub(crate) async fn remove(&self, post: post::Model) -> AppResult<()> {
        self.post_repo.delete(&post.id).await?;
        self.media.discard(&post.media_refs()).await;

        tracing::info!(post_id = %post.id, "Post deleted");
        Ok(())
    }

    async fn respond_all(&self, posts: Vec<post::Model>) -> AppResult<Vec<PostResponse>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids: Vec<String> = posts
            .iter()
            .map(|p| p.user_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(posts
            .into_iter()
            .map(|p| {
                let author = authors.get(&p.user_id);
                PostResponse::from_model(p, author)
            })
            .collect())
    }
}
