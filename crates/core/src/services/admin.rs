//! Admin user management.

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::{user, user::Role},
    repositories::UserRepository,
};
use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Input for creating a user from the admin console.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 64))]
    pub first_name: String,
    #[validate(length(max = 64))]
    #[serde(default)]
    pub last_name: String,
    /// `ROLE_USER` when absent.
    pub role: Option<String>,
    pub enabled: Option<bool>,
}

/// Partial user update from the admin console.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 6, max = 128))]
    pub password: Option<String>,
    #[validate(length(max = 64))]
    pub first_name: Option<String>,
    #[validate(length(max = 64))]
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub enabled: Option<bool>,
}

/// Admin service for business logic.
#[derive(Clone)]
pub struct AdminService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl AdminService {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    pub async fn list_users(&self) -> AppResult<Vec<user::Model>> {
        self.user_repo.find_all().await
    }

    /// Users whose account is disabled.
    pub async fn list_blocked(&self) -> AppResult<Vec<user::Model>> {
        self.user_repo.find_disabled().await
    }

    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        let email = normalize_email(&input.email);
        let role = parse_role(input.role.as_deref())?.unwrap_or(Role::User);

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            first_name: Set(input.first_name.trim().to_string()),
            last_name: Set(input.last_name.trim().to_string()),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(role),
            bio: Set(None),
            profile_picture: Set(None),
            enabled: Set(input.enabled.unwrap_or(true)),
            created_at: Set(Utc::now().into()),
        };

        let created = self.user_repo.create(model).await?;
        tracing::info!(user_id = %created.id, role = created.role.as_str(), "User created by admin");
        Ok(created)
    }

    /// Apply the fields present in `input`. Blank strings are ignored.
    pub async fn update_user(
        &self,
        user_id: &str,
        input: UpdateUserInput,
    ) -> AppResult<user::Model> {
        input.validate()?;
        let role = parse_role(input.role.as_deref())?;

        let existing = self.user_repo.get_by_id(user_id).await?;

        let email = input
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty() && *e != existing.email);
        if let Some(ref email) = email {
            if self.user_repo.find_by_email(email).await?.is_some() {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }

        let mut active: user::ActiveModel = existing.into();
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(first_name) = input.first_name.filter(|v| !v.trim().is_empty()) {
            active.first_name = Set(first_name.trim().to_string());
        }
        if let Some(last_name) = input.last_name.filter(|v| !v.trim().is_empty()) {
            active.last_name = Set(last_name.trim().to_string());
        }
        if let Some(password) = input.password {
            active.password_hash = Set(hash_password(&password)?);
        }
        if let Some(role) = role {
            active.role = Set(role);
        }
        if let Some(enabled) = input.enabled {
            active.enabled = Set(enabled);
        }

        let updated = self.user_repo.update(active).await?;
        tracing::info!(user_id = %updated.id, "User updated by admin");
        Ok(updated)
    }

    pub async fn delete_user(&self, user_id: &str) -> AppResult<()> {
        if !self.user_repo.delete(user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        tracing::info!(user_id = %user_id, "User deleted by admin");
        Ok(())
    }

    /// Flip a user between enabled and blocked.
    pub async fn toggle_status(&self, user_id: &str) -> AppResult<user::Model> {
        let existing = self.user_repo.get_by_id(user_id).await?;
        let enabled = !existing.enabled;

        let mut active: user::ActiveModel = existing.into();
        active.enabled = Set(enabled);
        let updated = self.user_repo.update(active).await?;

        tracing::info!(user_id = %updated.id, enabled, "User status toggled");
        Ok(updated)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn parse_role(role: Option<&str>) -> AppResult<Option<Role>> {
    role.map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| r.parse().map_err(AppError::InvalidArgument))
        .transpose()
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}
