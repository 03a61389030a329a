//! Group service.

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{entities::group, entities::post::MediaKind, repositories::GroupRepository};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::{
    locks::KeyedLocks,
    media::{MediaService, MediaUpload},
    policy::can_modify,
};

/// Input for creating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    #[validate(length(max = 128))]
    pub name: String,
    #[validate(length(max = 2048))]
    pub description: Option<String>,
    pub user_id: String,
}

/// Input for updating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupInput {
    pub user_id: String,
    #[validate(length(max = 128))]
    pub name: String,
    #[validate(length(max = 2048))]
    pub description: Option<String>,
}

/// Group response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub owner_id: String,
    pub members: Vec<String>,
    pub members_count: usize,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl GroupResponse {
    #[must_use]
    pub fn from_model(model: group::Model) -> Self {
        let members = model.member_list();
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            cover_image: model.cover_image,
            owner_id: model.owner_id,
            members_count: members.len(),
            members,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Group service for business logic.
#[derive(Clone)]
pub struct GroupService {
    group_repo: GroupRepository,
    media: MediaService,
    locks: KeyedLocks,
    id_gen: IdGenerator,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub fn new(group_repo: GroupRepository, media: MediaService) -> Self {
        Self {
            group_repo,
            media,
            locks: KeyedLocks::default(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a group owned by `input.user_id`, who becomes its first member.
    pub async fn create(
        &self,
        input: CreateGroupInput,
        cover: Option<MediaUpload>,
    ) -> AppResult<GroupResponse> {
        input.validate()?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Group name is required".to_string()));
        }
        if input.user_id.trim().is_empty() {
            return Err(AppError::BadRequest("User ID is required".to_string()));
        }
        if self.group_repo.find_by_name(name).await?.is_some() {
            return Err(AppError::Conflict("Group name already exists".to_string()));
        }

        let cover_image = match cover.filter(|c| !c.is_empty()) {
            Some(cover) => {
                self.media.check_image(&cover)?;
                Some(
                    self.media
                        .store(&input.user_id, &cover, MediaKind::Image)
                        .await?
                        .url,
                )
            }
            None => None,
        };

        let model = group::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.to_string()),
            description: Set(input.description),
            cover_image: Set(cover_image),
            owner_id: Set(input.user_id.clone()),
            member_ids: Set(serde_json::json!([input.user_id])),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.group_repo.create(model).await?;
        tracing::info!(group_id = %created.id, owner_id = %created.owner_id, "Group created");

        Ok(GroupResponse::from_model(created))
    }

    pub async fn get(&self, group_id: &str) -> AppResult<GroupResponse> {
        Ok(GroupResponse::from_model(
            self.group_repo.get_by_id(group_id).await?,
        ))
    }

    pub async fn list_all(&self) -> AppResult<Vec<GroupResponse>> {
        Ok(self
            .group_repo
            .find_all()
            .await?
            .into_iter()
            .map(GroupResponse::from_model)
            .collect())
    }

    /// Groups `user_id` belongs to.
    pub async fn list_for_member(&self, user_id: &str) -> AppResult<Vec<GroupResponse>> {
        Ok(self
            .group_repo
            .find_by_member(user_id)
            .await?
            .into_iter()
            .map(GroupResponse::from_model)
            .collect())
    }

    /// Rename or redescribe a group. Only its owner may do so.
    pub async fn update(&self, group_id: &str, input: UpdateGroupInput) -> AppResult<GroupResponse> {
        input.validate()?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Group name is required".to_string()));
        }

        let existing = self.group_repo.get_by_id(group_id).await?;
        if !can_modify(&input.user_id, &existing.owner_id, false) {
            return Err(AppError::Forbidden(
                "Only group owner can update the group".to_string(),
            ));
        }

        if name != existing.name {
            if let Some(other) = self.group_repo.find_by_name(name).await? {
                if other.id != existing.id {
                    return Err(AppError::Conflict("Group name already exists".to_string()));
                }
            }
        }

        let mut active: group::ActiveModel = existing.into();
        active.name = Set(name.to_string());
        active.description = Set(input.description);
        active.updated_at = Set(Some(Utc::now().into()));

        Ok(GroupResponse::from_model(
            self.group_repo.update(active).await?,
        ))
    }

    /// Delete a group. Only its owner may do so.
    pub async fn delete(&self, group_id: &str, user_id: &str) -> AppResult<()> {
        let existing = self.group_repo.get_by_id(group_id).await?;
        if !can_modify(user_id, &existing.owner_id, false) {
            return Err(AppError::Forbidden(
                "Only group owner can delete the group".to_string(),
            ));
        }

        self.group_repo.delete(group_id).await?;
        tracing::info!(group_id = %group_id, "Group deleted");
        Ok(())
    }

    /// Add a member. Joining twice changes nothing.
    pub async fn join(&self, group_id: &str, user_id: &str) -> AppResult<GroupResponse> {
        if user_id.trim().is_empty() {
            return Err(AppError::BadRequest("User ID is required".to_string()));
        }

        self.locks
            .run(group_id, async {
                let existing = self.group_repo.get_by_id(group_id).await?;
                if existing.has_member(user_id) {
                    return Ok(GroupResponse::from_model(existing));
                }

                let mut members = existing.member_list();
                members.push(user_id.to_string());
                self.save_members(existing, members).await
            })
            .await
    }

    /// Remove a member. The owner cannot leave their own group.
    pub async fn leave(&self, group_id: &str, user_id: &str) -> AppResult<GroupResponse> {
        self.locks
            .run(group_id, async {
                let existing = self.group_repo.get_by_id(group_id).await?;
                if existing.owner_id == user_id {
                    return Err(AppError::BadRequest(
                        "Group owner cannot leave the group".to_string(),
                    ));
                }
                if !existing.has_member(user_id) {
                    return Ok(GroupResponse::from_model(existing));
                }

                let members: Vec<String> = existing
                    .member_list()
                    .into_iter()
                    .filter(|m| m != user_id)
                    .collect();
                self.save_members(existing, members).await
            })
            .await
    }

    async fn save_members(
        &self,
        existing: group::Model,
        members: Vec<String>,
    ) -> AppResult<GroupResponse> {
        let mut active: group::ActiveModel = existing.into();
        active.member_ids = Set(serde_json::json!(members));
        active.updated_at = Set(Some(Utc::now().into()));

        Ok(GroupResponse::from_model(
            self.group_repo.update(active).await?,
        ))
    }
}
