//! WebSocket streaming API.
//!
//! One in-process broadcast bus carries every event. Each connection
//! forwards the events addressed to its user plus those of the posts it
//! has subscribed to.

#![allow(missing_docs)]

use std::{collections::HashSet, sync::Arc};

use agora_common::AppResult;
use agora_core::{CommentChange, EventPublisher};
use agora_db::entities::notification;
use async_trait::async_trait;
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::middleware::AppState;

const BUS_CAPACITY: usize = 1000;

/// Streaming query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    /// User whose notifications this connection receives.
    pub user_id: Option<String>,
}

/// Where an event is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// A user's private channel.
    User(String),
    /// Everyone watching a post.
    Post(String),
}

/// Body of a `commentsChanged` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsChangedBody {
    #[serde(rename = "type")]
    pub change: CommentChange,
    pub post_id: String,
}

/// Server-to-client message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum ServerMessage {
    /// A notification stored for the connected user.
    Notification(notification::Model),
    /// A watched post's comments changed.
    CommentsChanged(CommentsChangedBody),
}

/// Client-to-server message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Start receiving comment updates for a post.
    SubscribePost {
        #[serde(rename = "postId")]
        post_id: String,
    },
    /// Stop receiving comment updates for a post.
    UnsubscribePost {
        #[serde(rename = "postId")]
        post_id: String,
    },
}

/// A message on the bus together with its address.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub topic: Topic,
    pub message: ServerMessage,
}

/// What one connection listens to.
#[derive(Debug, Default)]
pub struct Subscriptions {
    user_id: Option<String>,
    posts: HashSet<String>,
}

impl Subscriptions {
    #[must_use]
    pub fn for_user(user_id: Option<String>) -> Self {
        Self {
            user_id: user_id.filter(|id| !id.is_empty()),
            posts: HashSet::new(),
        }
    }

    /// Apply a client request.
    pub fn apply(&mut self, msg: ClientMessage) {
        match msg {
            ClientMessage::SubscribePost { post_id } => {
                debug!(post_id = %post_id, "Subscribed to post");
                self.posts.insert(post_id);
            }
            ClientMessage::UnsubscribePost { post_id } => {
                debug!(post_id = %post_id, "Unsubscribed from post");
                self.posts.remove(&post_id);
            }
        }
    }

    /// Whether an envelope should be forwarded to this connection.
    #[must_use]
    pub fn wants(&self, topic: &Topic) -> bool {
        match topic {
            Topic::User(id) => self.user_id.as_deref() == Some(id.as_str()),
            Topic::Post(id) => self.posts.contains(id),
        }
    }
}

/// Shared state for streaming.
#[derive(Clone)]
pub struct StreamingState {
    tx: Arc<broadcast::Sender<Envelope>>,
}

impl StreamingState {
    /// Create a new streaming state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx: Arc::new(tx) }
    }

    /// A receiver for every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Publish to the bus. Nobody listening is not an error.
    pub fn publish(&self, topic: Topic, message: ServerMessage) {
        if self.tx.send(Envelope { topic, message }).is_err() {
            debug!("No streaming connections; event dropped");
        }
    }
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for StreamingState {
    async fn publish_notification(&self, notification: &notification::Model) -> AppResult<()> {
        self.publish(
            Topic::User(notification.user_id.clone()),
            ServerMessage::Notification(notification.clone()),
        );
        Ok(())
    }

    async fn publish_comments_changed(
        &self,
        post_id: &str,
        change: CommentChange,
    ) -> AppResult<()> {
        self.publish(
            Topic::Post(post_id.to_string()),
            ServerMessage::CommentsChanged(CommentsChangedBody {
                change,
                post_id: post_id.to_string(),
            }),
        );
        Ok(())
    }
}

/// WebSocket handler for streaming.
pub async fn streaming_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!(user_id = ?query.user_id, "New streaming connection");

    ws.on_upgrade(move |socket| handle_socket(socket, query, state.streaming))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, query: StreamQuery, streaming: StreamingState) {
    let (mut sender, mut receiver) = socket.split();
    let mut bus = streaming.subscribe();
    let mut subscriptions = Subscriptions::for_user(query.user_id);

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => subscriptions.apply(client_msg),
                            Err(e) => warn!(error = %e, "Failed to parse client message"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            event = bus.recv() => {
                match event {
                    Ok(envelope) if subscriptions.wants(&envelope.topic) => {
                        let json = match serde_json::to_string(&envelope.message) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!(error = %e, "Failed to encode stream event");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Streaming connection lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Streaming connection closed");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_db::{entities::notification::NotificationType, test_utils::fixtures};

    #[test]
    fn test_client_message_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribePost","body":{"postId":"p1"}}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SubscribePost {
                post_id: "p1".to_string()
            }
        );

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"unsubscribePost","body":{"postId":"p1"}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::UnsubscribePost { .. }));
    }

    #[test]
    fn test_comments_changed_format() {
        let msg = ServerMessage::CommentsChanged(CommentsChangedBody {
            change: CommentChange::Reply,
            post_id: "p1".to_string(),
        });

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({
                "type": "commentsChanged",
                "body": { "type": "REPLY", "postId": "p1" }
            })
        );
    }

    #[test]
    fn test_subscriptions_route_by_topic() {
        let mut subs = Subscriptions::for_user(Some("u1".to_string()));

        assert!(subs.wants(&Topic::User("u1".to_string())));
        assert!(!subs.wants(&Topic::User("u2".to_string())));
        assert!(!subs.wants(&Topic::Post("p1".to_string())));

        subs.apply(ClientMessage::SubscribePost {
            post_id: "p1".to_string(),
        });
        assert!(subs.wants(&Topic::Post("p1".to_string())));

        subs.apply(ClientMessage::UnsubscribePost {
            post_id: "p1".to_string(),
        });
        assert!(!subs.wants(&Topic::Post("p1".to_string())));
    }

    #[test]
    fn test_anonymous_connection_gets_no_user_events() {
        let subs = Subscriptions::for_user(Some(String::new()));

        assert!(!subs.wants(&Topic::User(String::new())));
    }

    #[tokio::test]
    async fn test_publisher_addresses_recipient() {
        let streaming = StreamingState::new();
        let mut rx = streaming.subscribe();
        let stored = fixtures::notification("n1", "u1", NotificationType::Comment);

        streaming.publish_notification(&stored).await.unwrap();
        streaming
            .publish_comments_changed("p1", CommentChange::Add)
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.topic, Topic::User("u1".to_string()));
        assert_eq!(first.message, ServerMessage::Notification(stored));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.topic, Topic::Post("p1".to_string()));
    }

    #[tokio::test]
    async fn test_publish_without_listeners_succeeds() {
        let streaming = StreamingState::new();

        assert!(
            streaming
                .publish_comments_changed("p1", CommentChange::Delete)
                .await
                .is_ok()
        );
    }
}
