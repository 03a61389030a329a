//! Report repository.

use std::sync::Arc;

use crate::entities::{
    Report,
    report::{self, ReportStatus},
};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a report by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a report by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<report::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))
    }

    /// One page of reports, newest first. Pages are zero-based.
    pub async fn find_page(&self, page: u64, size: u64) -> AppResult<Vec<report::Model>> {
        Report::find()
            .order_by_desc(report::Column::CreatedAt)
            .order_by_desc(report::Column::Id)
            .offset(page * size)
            .limit(size)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Reports with a given status, newest first.
    pub async fn find_by_status(&self, status: ReportStatus) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::Status.eq(status))
            .order_by_desc(report::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The `limit` most recent reports.
    pub async fn find_recent(&self, limit: u64) -> AppResult<Vec<report::Model>> {
        Report::find()
            .order_by_desc(report::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all reports.
    pub async fn count(&self) -> AppResult<u64> {
        Report::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count reports with a given status.
    pub async fn count_by_status(&self, status: ReportStatus) -> AppResult<u64> {
        Report::find()
            .filter(report::Column::Status.eq(status))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new report.
    pub async fn create(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a report.
    pub async fn update(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_page() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::report("r2", "p1", "u1")]])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        let page = repo.find_page(1, 1).await.unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page[0].status, ReportStatus::Pending);
    }

    #[tokio::test]
    async fn test_count_by_status() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(6))
                }]])
                .into_connection(),
        );

        let repo = ReportRepository::new(db);
        let count = repo.count_by_status(ReportStatus::Pending).await.unwrap();

        assert_eq!(count, 6);
    }
}
