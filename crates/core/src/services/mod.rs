//! Business logic services.

#![allow(missing_docs)]

pub mod admin;
pub mod comment;
pub mod event_publisher;
pub mod group;
mod locks;
pub mod media;
pub mod notification;
pub mod policy;
pub mod post;
pub mod reaction;
pub mod report;
pub mod stats;
pub mod user;

pub use admin::{AdminService, CreateUserInput, UpdateUserInput};
pub use comment::{CommentResponse, CommentService, CreateCommentInput};
pub use event_publisher::{
    CommentChange, EventPublisher, EventPublisherService, NoOpEventPublisher, StreamEvent,
};
pub use group::{CreateGroupInput, GroupResponse, GroupService, UpdateGroupInput};
pub use media::{MediaService, MediaUpload};
pub use notification::{Actor, NotificationService};
pub use post::{CreatePostInput, PostResponse, PostService, UpdatePostInput};
pub use reaction::{ReactionCounts, ReactionService};
pub use report::{CreateReportInput, ReportPage, ReportService, ReportStats, ResolveReportInput};
pub use stats::{DashboardStats, PostStats, StatsService, TodayPosts, UserStats};
pub use user::{UpdateProfileInput, UserService};
