//! Report service (post moderation queue).

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::report::{self, ReportStatus},
    repositories::{PostRepository, ReportRepository, UserRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::post::PostService;

/// Page size used when none is given.
pub const DEFAULT_PAGE_SIZE: u64 = 10;
/// Largest page a client may request.
pub const MAX_PAGE_SIZE: u64 = 100;
/// Number of reports on the dashboard's "recent" list.
pub const DEFAULT_RECENT_LIMIT: u64 = 5;

/// Input for reporting a post.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    pub post_id: String,
    pub reporter_id: String,
    #[validate(length(min = 1, max = 256))]
    pub reason: String,
    #[validate(length(max = 2048))]
    pub note: Option<String>,
}

/// Input for handling a report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReportInput {
    pub status: Option<String>,
    pub admin_id: Option<String>,
    pub admin_note: Option<String>,
}

/// One page of reports.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    pub content: Vec<report::Model>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

/// Report counts by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub total: u64,
    pub pending: u64,
    pub resolved: u64,
    pub rejected: u64,
}

/// Report service for business logic.
#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    post_service: PostService,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(
        report_repo: ReportRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        post_service: PostService,
    ) -> Self {
        Self {
            report_repo,
            post_repo,
            user_repo,
            post_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a pending report against a post.
    pub async fn create(&self, input: CreateReportInput) -> AppResult<report::Model> {
        input.validate()?;

        self.post_repo.get_by_id(&input.post_id).await?;
        let reporter = self.user_repo.get_by_id(&input.reporter_id).await?;

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(input.post_id),
            reporter_id: Set(reporter.id.clone()),
            reporter_name: Set(reporter.display_name()),
            reason: Set(input.reason),
            note: Set(input.note),
            status: Set(ReportStatus::Pending),
            admin_id: Set(None),
            admin_note: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let created = self.report_repo.create(model).await?;
        tracing::info!(report_id = %created.id, post_id = %created.post_id, "Report filed");
        Ok(created)
    }

    /// Reports newest first. `page` is zero-based.
    pub async fn list(&self, page: u64, size: u64) -> AppResult<ReportPage> {
        let size = size.clamp(1, MAX_PAGE_SIZE);
        let content = self.report_repo.find_page(page, size).await?;
        let total_elements = self.report_repo.count().await?;

        Ok(ReportPage {
            content,
            page,
            size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        })
    }

    pub async fn list_by_status(&self, status: &str) -> AppResult<Vec<report::Model>> {
        let status: ReportStatus = status.parse().map_err(AppError::InvalidArgument)?;
        self.report_repo.find_by_status(status).await
    }

    pub async fn get(&self, report_id: &str) -> AppResult<report::Model> {
        self.report_repo.get_by_id(report_id).await
    }

    pub async fn recent(&self, limit: u64) -> AppResult<Vec<report::Model>> {
        self.report_repo
            .find_recent(limit.clamp(1, MAX_PAGE_SIZE))
            .await
    }

    pub async fn stats(&self) -> AppResult<ReportStats> {
        Ok(ReportStats {
            total: self.report_repo.count().await?,
            pending: self.report_repo.count_by_status(ReportStatus::Pending).await?,
            resolved: self.report_repo.count_by_status(ReportStatus::Resolved).await?,
            rejected: self.report_repo.count_by_status(ReportStatus::Rejected).await?,
        })
    }

    /// Set a report's status on behalf of an admin.
    pub async fn update_status(
        &self,
        report_id: &str,
        input: ResolveReportInput,
    ) -> AppResult<report::Model> {
        let status: ReportStatus = input
            .status
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Status is required".to_string()))?
            .parse()
            .map_err(AppError::InvalidArgument)?;
        let admin_id = required_admin(input.admin_id)?;

        let existing = self.report_repo.get_by_id(report_id).await?;
        self.close(existing, status, admin_id, input.admin_note)
            .await
    }

    /// Delete the reported post and mark the report resolved.
    ///
    /// A post that is already gone only resolves the report.
    pub async fn delete_reported_post(
        &self,
        report_id: &str,
        input: ResolveReportInput,
    ) -> AppResult<report::Model> {
        let admin_id = required_admin(input.admin_id)?;
        let existing = self.report_repo.get_by_id(report_id).await?;

        match self.post_repo.find_by_id(&existing.post_id).await? {
            Some(post) => self.post_service.remove(post).await?,
            None => {
                tracing::debug!(post_id = %existing.post_id, "Reported post already deleted");
            }
        }

        self.close(existing, ReportStatus::Resolved, admin_id, input.admin_note)
            .await
    }

    async fn close(
        &self,
        existing: report::Model,
        status: ReportStatus,
        admin_id: String,
        admin_note: Option<String>,
    ) -> AppResult<report::Model> {
        let mut active: report::ActiveModel = existing.into();
        active.status = Set(status);
        active.admin_id = Set(Some(admin_id));
        active.admin_note = Set(admin_note);
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.report_repo.update(active).await?;
        tracing::info!(report_id = %updated.id, status = ?updated.status, "Report handled");
        Ok(updated)
    }
}

fn required_admin(admin_id: Option<String>) -> AppResult<String> {
    admin_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Admin ID is required".to_string()))
}
