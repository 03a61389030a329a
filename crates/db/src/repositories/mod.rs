//! Database repositories.

mod comment;
mod group;
mod notification;
mod post;
mod reaction;
mod report;
mod user;

pub use comment::CommentRepository;
pub use group::GroupRepository;
pub use notification::NotificationRepository;
pub use post::PostRepository;
pub use reaction::ReactionRepository;
pub use report::ReportRepository;
pub use user::UserRepository;
