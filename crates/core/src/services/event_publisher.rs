//! Event publisher service.
//!
//! Provides an abstraction for publishing real-time events.
//! The implementation lives in the API crate (in-process WebSocket hub).

use std::sync::Arc;

use agora_common::AppResult;
use agora_db::entities::notification;
use async_trait::async_trait;
use serde::Serialize;

/// What happened to a post's comment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommentChange {
    /// A top-level comment was added.
    Add,
    /// A reply was added.
    Reply,
    /// A comment was removed.
    Delete,
}

/// Event types for real-time updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A notification was stored for `user_id`.
    Notification {
        user_id: String,
        notification: notification::Model,
    },
    /// The comment list of a post changed; viewers should refetch.
    CommentsChanged { post_id: String, change: CommentChange },
}

/// Trait for publishing real-time events.
///
/// This allows the core services to publish events
/// without directly depending on the transport.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Push a stored notification to its recipient's channel.
    async fn publish_notification(&self, notification: &notification::Model) -> AppResult<()>;

    /// Broadcast a comment-list change to the post's channel.
    async fn publish_comments_changed(&self, post_id: &str, change: CommentChange)
    -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for when real-time events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_notification(&self, _notification: &notification::Model) -> AppResult<()> {
        Ok(())
    }

    async fn publish_comments_changed(
        &self,
        _post_id: &str,
        _change: CommentChange,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Type alias for a shared event publisher.
pub type EventPublisherService = Arc<dyn EventPublisher>;

/// Publisher that records events, for service tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingEventPublisher {
    events: Arc<std::sync::Mutex<Vec<StreamEvent>>>,
    fail: bool,
}

#[cfg(test)]
impl RecordingEventPublisher {
    /// A publisher whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    fn record(&self, event: StreamEvent) -> AppResult<()> {
        if self.fail {
            return Err(agora_common::AppError::Internal("hub closed".to_string()));
        }
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish_notification(&self, notification: &notification::Model) -> AppResult<()> {
        self.record(StreamEvent::Notification {
            user_id: notification.user_id.clone(),
            notification: notification.clone(),
        })
    }

    async fn publish_comments_changed(
        &self,
        post_id: &str,
        change: CommentChange,
    ) -> AppResult<()> {
        self.record(StreamEvent::CommentsChanged {
            post_id: post_id.to_string(),
            change,
        })
    }
}
