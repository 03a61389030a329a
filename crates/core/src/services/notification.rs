//! Notification fan-out and inbox.
//!
//! Creating notifications is best-effort: persistence and publish failures
//! are logged and swallowed so they never fail the action that caused them.

use std::collections::BTreeSet;

use crate::services::event_publisher::{CommentChange, EventPublisherService};
use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::{
        comment,
        notification::{self, NotificationType},
        post, user,
    },
    repositories::NotificationRepository,
};
use sea_orm::Set;

/// The user whose action triggers notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    /// Rendered into notification text.
    pub name: String,
}

impl Actor {
    /// Build an actor, naming them "Someone" when the account is unknown or unnamed.
    #[must_use]
    pub fn new(id: &str, account: Option<&user::Model>) -> Self {
        let name = account
            .map(user::Model::display_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Someone".to_string());

        Self {
            id: id.to_string(),
            name,
        }
    }
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Notify about a new comment.
    ///
    /// A top-level comment notifies the post author; a reply notifies the
    /// author of `parent`. Nothing happens when that is the actor.
    pub async fn notify_comment(
        &self,
        post: &post::Model,
        comment: &comment::Model,
        parent: Option<&comment::Model>,
        actor: &Actor,
    ) -> Option<notification::Model> {
        let (recipient, kind, content, change) = match parent {
            None => (
                post.user_id.as_str(),
                NotificationType::Comment,
                format!("{} commented on your post", actor.name),
                CommentChange::Add,
            ),
            Some(parent) => (
                parent.user_id.as_str(),
                NotificationType::Reply,
                format!("{} replied to your comment", actor.name),
                CommentChange::Reply,
            ),
        };

        let created = self
            .deliver(recipient, kind, content, &post.id, &actor.id)
            .await?;

        tracing::debug!(
            comment_id = %comment.id,
            recipient = %recipient,
            kind = ?kind,
            "Comment notification sent"
        );
        self.broadcast_comments_changed(&post.id, change).await;

        Some(created)
    }

    /// Notify every mentioned user except the actor and the post author.
    ///
    /// The post author already hears about the comment itself.
    pub async fn notify_mentions(
        &self,
        post: &post::Model,
        mentioned: &[String],
        actor: &Actor,
    ) -> Vec<notification::Model> {
        let recipients: BTreeSet<&str> = mentioned
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && *id != actor.id && *id != post.user_id)
            .collect();

        let mut sent = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let content = format!("{} mentioned you in a comment", actor.name);
            if let Some(n) = self
                .deliver(recipient, NotificationType::Mention, content, &post.id, &actor.id)
                .await
            {
                sent.push(n);
            }
        }
        sent
    }

    /// Tell viewers of a post that one of its comments is gone.
    pub async fn notify_comment_deleted(&self, post_id: &str) {
        self.broadcast_comments_changed(post_id, CommentChange::Delete)
            .await;
    }

    /// Persist and push one notification. `None` when skipped or failed.
    async fn deliver(
        &self,
        recipient: &str,
        kind: NotificationType,
        content: String,
        source_id: &str,
        source_user_id: &str,
    ) -> Option<notification::Model> {
        if recipient == source_user_id {
            return None;
        }

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(recipient.to_string()),
            notification_type: Set(kind),
            content: Set(content),
            source_id: Set(Some(source_id.to_string())),
            source_user_id: Set(source_user_id.to_string()),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        let created = match self.notification_repo.create(model).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, recipient = %recipient, "Failed to store notification");
                return None;
            }
        };

        if let Some(ref event_publisher) = self.event_publisher {
            if let Err(e) = event_publisher.publish_notification(&created).await {
                tracing::warn!(error = %e, "Failed to publish notification event");
            }
        }

        Some(created)
    }

    async fn broadcast_comments_changed(&self, post_id: &str, change: CommentChange) {
        if let Some(ref event_publisher) = self.event_publisher {
            if let Err(e) = event_publisher
                .publish_comments_changed(post_id, change)
                .await
            {
                tracing::warn!(error = %e, post_id = %post_id, "Failed to publish comment update");
            }
        }
    }

    // ==================== Inbox ====================

    /// Notifications of a user, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<notification::Model>> {
        self.notification_repo.find_by_user(user_id).await
    }

    pub async fn mark_as_read(&self, id: &str) -> AppResult<notification::Model> {
        self.notification_repo
            .mark_as_read(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    pub async fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if self.notification_repo.delete(id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Notification not found".to_string()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::event_publisher::{RecordingEventPublisher, StreamEvent};
    use agora_db::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use std::sync::Arc;

    fn service(db: MockDatabase, publisher: &RecordingEventPublisher) -> NotificationService {
        let mut svc =
            NotificationService::new(NotificationRepository::new(Arc::new(db.into_connection())));
        svc.set_event_publisher(Arc::new(publisher.clone()));
        svc
    }

    fn actor(id: &str) -> Actor {
        Actor {
            id: id.to_string(),
            name: "Ada Lovelace".to_string(),
        }
    }

    #[test]
    fn test_actor_name_fallback() {
        assert_eq!(Actor::new("u1", None).name, "Someone");

        let mut blank = fixtures::user("u1", "", "");
        blank.first_name = " ".to_string();
        assert_eq!(Actor::new("u1", Some(&blank)).name, "Someone");

        let ada = fixtures::user("u1", "Ada", "Lovelace");
        assert_eq!(Actor::new("u1", Some(&ada)).name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_comment_notifies_post_author() {
        let post = fixtures::post("p1", "author");
        let comment = fixtures::comment("c1", "p1", "u1", None);
        let stored = fixtures::notification("n1", "author", NotificationType::Comment);

        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[stored.clone()]]),
            &publisher,
        );

        let sent = svc
            .notify_comment(&post, &comment, None, &actor("u1"))
            .await
            .unwrap();

        assert_eq!(sent.user_id, "author");
        assert_eq!(
            publisher.events(),
            vec![
                StreamEvent::Notification {
                    user_id: "author".to_string(),
                    notification: stored,
                },
                StreamEvent::CommentsChanged {
                    post_id: "p1".to_string(),
                    change: CommentChange::Add,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_reply_notifies_parent_author() {
        let post = fixtures::post("p1", "author");
        let parent = fixtures::comment("c1", "p1", "u1", None);
        let reply = fixtures::comment("c2", "p1", "u2", Some("c1"));
        let stored = fixtures::notification("n2", "u1", NotificationType::Reply);

        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[stored]]),
            &publisher,
        );

        let sent = svc
            .notify_comment(&post, &reply, Some(&parent), &actor("u2"))
            .await
            .unwrap();

        assert_eq!(sent.user_id, "u1");
        assert!(publisher.events().contains(&StreamEvent::CommentsChanged {
            post_id: "p1".to_string(),
            change: CommentChange::Reply,
        }));
    }

    #[tokio::test]
    async fn test_no_self_notification() {
        let post = fixtures::post("p1", "author");
        let comment = fixtures::comment("c1", "p1", "author", None);

        let publisher = RecordingEventPublisher::default();
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), &publisher);

        let sent = svc
            .notify_comment(&post, &comment, None, &actor("author"))
            .await;

        assert!(sent.is_none());
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_mentions_skip_actor_author_and_duplicates() {
        let post = fixtures::post("p1", "author");
        let stored = fixtures::notification("n3", "u3", NotificationType::Mention);

        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[stored]]),
            &publisher,
        );

        let mentioned = ["u1", "author", "u3", " u3 ", ""].map(String::from);
        let sent = svc.notify_mentions(&post, &mentioned, &actor("u1")).await;

        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id, "u3");
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let post = fixtures::post("p1", "author");
        let comment = fixtures::comment("c1", "p1", "u1", None);

        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([DbErr::Custom("connection reset".to_string())]),
            &publisher,
        );

        let sent = svc.notify_comment(&post, &comment, None, &actor("u1")).await;

        assert!(sent.is_none());
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_is_swallowed() {
        let post = fixtures::post("p1", "author");
        let comment = fixtures::comment("c1", "p1", "u1", None);
        let stored = fixtures::notification("n1", "author", NotificationType::Comment);

        let publisher = RecordingEventPublisher::failing();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[stored]]),
            &publisher,
        );

        let sent = svc.notify_comment(&post, &comment, None, &actor("u1")).await;

        assert!(sent.is_some());
    }

    #[tokio::test]
    async fn test_mark_as_read_missing_is_not_found() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notification::Model>::new()]),
            &publisher,
        );

        let err = svc.mark_as_read("n404").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
