//! User profile service.

use agora_common::{AppError, AppResult};
use agora_db::{
    entities::{post::MediaKind, user, user::Role},
    repositories::UserRepository,
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::media::{MediaService, MediaUpload};

/// Most users returned by a search.
pub const SEARCH_LIMIT: u64 = 20;

/// Input for updating a profile. Blank fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(max = 64))]
    pub first_name: Option<String>,
    #[validate(length(max = 64))]
    pub last_name: Option<String>,
    #[validate(length(max = 2048))]
    pub bio: Option<String>,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    media: MediaService,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, media: MediaService) -> Self {
        Self { user_repo, media }
    }

    pub async fn get(&self, user_id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(user_id).await
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let existing = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = existing.into();

        if let Some(first_name) = non_blank(input.first_name) {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = non_blank(input.last_name) {
            active.last_name = Set(last_name);
        }
        if let Some(bio) = input.bio {
            active.bio = Set(Some(bio));
        }

        self.user_repo.update(active).await
    }

    /// Store a new profile picture and point the user at it.
    pub async fn upload_avatar(&self, user_id: &str, upload: MediaUpload) -> AppResult<user::Model> {
        if upload.is_empty() {
            return Err(AppError::BadRequest("Profile picture is empty".to_string()));
        }
        self.media.check_image(&upload).map_err(|_| {
            AppError::BadRequest("Only image files are allowed for profile picture".to_string())
        })?;

        let existing = self.user_repo.get_by_id(user_id).await?;
        let stored = self.media.store(user_id, &upload, MediaKind::Image).await?;

        let mut active: user::ActiveModel = existing.into();
        active.profile_picture = Set(Some(stored.url.clone()));

        match self.user_repo.update(active).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                self.media.discard(std::slice::from_ref(&stored)).await;
                Err(e)
            }
        }
    }

    /// Set a user's role from its wire form (`ROLE_USER` or `ROLE_ADMIN`).
    pub async fn update_role(&self, user_id: &str, role: &str) -> AppResult<user::Model> {
        let role: Role = role.parse().map_err(AppError::InvalidArgument)?;
        self.set_role(user_id, role).await
    }

    pub async fn promote_to_admin(&self, user_id: &str) -> AppResult<user::Model> {
        self.set_role(user_id, Role::Admin).await
    }

    pub async fn demote_to_user(&self, user_id: &str) -> AppResult<user::Model> {
        self.set_role(user_id, Role::User).await
    }

    /// Users whose first name, last name, or email contains `query`, ignoring case.
    pub async fn search(&self, query: &str) -> AppResult<Vec<user::Model>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.user_repo.search(query, SEARCH_LIMIT).await
    }

    async fn set_role(&self, user_id: &str, role: Role) -> AppResult<user::Model> {
        let existing = self.user_repo.get_by_id(user_id).await?;
        if existing.role == role {
            return Ok(existing);
        }

        let mut active: user::ActiveModel = existing.into();
        active.role = Set(role);
        let updated = self.user_repo.update(active).await?;

        tracing::info!(user_id = %updated.id, role = role.as_str(), "Role changed");
        Ok(updated)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::media::{MemoryStorage, upload};
    use agora_db::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn service(db: MockDatabase, storage: &MemoryStorage) -> UserService {
        UserService::new(
            UserRepository::new(Arc::new(db.into_connection())),
            MediaService::new(Arc::new(storage.clone()), 1024),
        )
    }

    #[tokio::test]
    async fn test_update_role_rejects_unknown_role() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), &MemoryStorage::default());

        let err = svc.update_role("u1", "ROLE_ROOT").await.unwrap_err();

        assert!(matches!(err, AppError::InvalidArgument(msg) if msg == "Invalid role: ROLE_ROOT"));
    }

    #[tokio::test]
    async fn test_promote_to_admin() {
        let admin = user::Model {
            role: Role::Admin,
            ..fixtures::user("u1", "Ada", "Lovelace")
        };
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::user("u1", "Ada", "Lovelace")]])
                .append_query_results([[admin]]),
            &MemoryStorage::default(),
        );

        let updated = svc.promote_to_admin("u1").await.unwrap();

        assert!(updated.is_admin());
    }

    #[tokio::test]
    async fn test_demote_when_already_user_does_not_write() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::user("u1", "Ada", "Lovelace")]]),
            &MemoryStorage::default(),
        );

        let user = svc.demote_to_user("u1").await.unwrap();

        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn test_update_profile_skips_blank_names() {
        let updated = user::Model {
            bio: Some("analyst".to_string()),
            ..fixtures::user("u1", "Ada", "Lovelace")
        };
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::user("u1", "Ada", "Lovelace")]])
                .append_query_results([[updated]]),
            &MemoryStorage::default(),
        );

        let user = svc
            .update_profile(
                "u1",
                UpdateProfileInput {
                    first_name: Some("  ".to_string()),
                    last_name: None,
                    bio: Some("analyst".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.bio.as_deref(), Some("analyst"));
    }

    #[tokio::test]
    async fn test_avatar_must_be_an_image() {
        let storage = MemoryStorage::default();
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), &storage);

        let err = svc
            .upload_avatar("u1", upload("me.gif.exe", "application/octet-stream", 4))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("Only image files")));
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_upload_avatar_sets_picture() {
        let storage = MemoryStorage::default();
        let updated = user::Model {
            profile_picture: Some("/api/media/me.png".to_string()),
            ..fixtures::user("u1", "Ada", "Lovelace")
        };
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::user("u1", "Ada", "Lovelace")]])
                .append_query_results([[updated]]),
            &storage,
        );

        let user = svc
            .upload_avatar("u1", upload("me.png", "image/png", 4))
            .await
            .unwrap();

        assert!(user.profile_picture.is_some());
        assert_eq!(storage.keys().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_search_returns_nothing() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), &MemoryStorage::default());

        assert!(svc.search("   ").await.unwrap().is_empty());
    }
}
