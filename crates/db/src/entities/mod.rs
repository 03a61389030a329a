//! Database entities.

pub mod comment;
pub mod comment_reaction;
pub mod group;
pub mod notification;
pub mod post;
pub mod reaction;
pub mod report;
pub mod user;

pub use comment::Entity as Comment;
pub use comment_reaction::Entity as CommentReaction;
pub use group::Entity as Group;
pub use notification::Entity as Notification;
pub use post::Entity as Post;
pub use reaction::Entity as Reaction;
pub use report::Entity as Report;
pub use user::Entity as User;
