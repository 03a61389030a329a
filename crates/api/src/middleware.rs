//! Shared application state.

#![allow(missing_docs)]

use agora_core::{
    AdminService, CommentService, GroupService, NotificationService, PostService,
    ReactionService, ReportService, StatsService, UserService,
};

use crate::streaming::StreamingState;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub reaction_service: ReactionService,
    pub comment_service: CommentService,
    pub post_service: PostService,
    pub group_service: GroupService,
    pub notification_service: NotificationService,
    pub report_service: ReportService,
    pub user_service: UserService,
    pub admin_service: AdminService,
    pub stats_service: StatsService,
    pub streaming: StreamingState,
    /// Deployment name shown by the detailed health check.
    pub environment: String,
}
