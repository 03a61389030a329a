//! Reaction repository.

use std::sync::Arc;

use crate::entities::{Reaction, reaction};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Reaction repository for database operations.
///
/// Reactions are addressed by their `(post_id, user_id)` key.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the reaction a user left on a post.
    pub async fn find_by_post_and_user(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<Option<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::PostId.eq(post_id))
            .filter(reaction::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All reactions on a post, oldest first.
    pub async fn find_by_post(&self, post_id: &str) -> AppResult<Vec<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::PostId.eq(post_id))
            .order_by_asc(reaction::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new reaction.
    pub async fn create(&self, model: reaction::ActiveModel) -> AppResult<reaction::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an existing reaction.
    pub async fn update(&self, model: reaction::ActiveModel) -> AppResult<reaction::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the reaction a user left on a post. Returns the number of rows removed.
    pub async fn delete_by_post_and_user(&self, post_id: &str, user_id: &str) -> AppResult<u64> {
        let result = Reaction::delete_many()
            .filter(reaction::Column::PostId.eq(post_id))
            .filter(reaction::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{entities::reaction::ReactionType, test_utils::fixtures};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_find_by_post_and_user() {
        let r = fixtures::reaction("p1", "u1", ReactionType::Love);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[r.clone()]])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let found = repo.find_by_post_and_user("p1", "u1").await.unwrap();

        assert_eq!(found.unwrap().reaction_type, ReactionType::Love);
    }

    #[tokio::test]
    async fn test_find_by_post() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    fixtures::reaction("p1", "u1", ReactionType::Love),
                    fixtures::reaction("p1", "u2", ReactionType::Angry),
                ]])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        let all = repo.find_by_post("p1").await.unwrap();

        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_is_zero_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = ReactionRepository::new(db);
        assert_eq!(repo.delete_by_post_and_user("p1", "u1").await.unwrap(), 0);
    }
}
