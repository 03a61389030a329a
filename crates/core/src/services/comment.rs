//! Comment service.

use std::collections::{BTreeSet, HashMap};

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::{comment, comment_reaction, comment_reaction::DEFAULT_COMMENT_REACTION, user},
    repositories::{CommentRepository, PostRepository, UserRepository},
};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::{
    locks::KeyedLocks,
    notification::{Actor, NotificationService},
    policy::can_modify,
};

/// Default number of comments returned for a post.
pub const DEFAULT_COMMENT_LIMIT: u64 = 100;

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub post_id: String,
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
    pub parent_comment_id: Option<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
}

/// Split a comma-separated list of user IDs, dropping blanks.
#[must_use]
pub fn parse_mentions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Comment response with author info and likes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_profile_picture: Option<String>,
    pub content: String,
    pub parent_comment_id: Option<String>,
    pub mentions: Vec<String>,
    pub like_count: u64,
    pub user_liked: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl CommentResponse {
    #[must_use]
    pub fn from_model(
        model: comment::Model,
        author: Option<&user::Model>,
        like_count: u64,
        user_liked: bool,
    ) -> Self {
        let mentions = model.mention_list();
        Self {
            id: model.id,
            post_id: model.post_id,
            user_id: model.user_id,
            user_name: author.map_or_else(|| "Deleted User".to_string(), user::Model::display_name),
            user_profile_picture: author.and_then(|a| a.profile_picture.clone()),
            content: model.content,
            parent_comment_id: model.parent_comment_id,
            mentions,
            like_count,
            user_liked,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    locks: KeyedLocks,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            notification_service,
            locks: KeyedLocks::default(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a comment or a reply, then notify the affected users.
    pub async fn create(&self, input: CreateCommentInput) -> AppResult<CommentResponse> {
        input.validate()?;

        let mentions: Vec<String> = input
            .mentions
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();

        let (post, parent, created) = self
            .locks
            .run(&input.post_id, async {
                let post = self.post_repo.get_by_id(&input.post_id).await?;

                let parent = match input.parent_comment_id.as_deref() {
                    Some(parent_id) => Some(
                        self.comment_repo
                            .find_by_id(parent_id)
                            .await?
                            .ok_or_else(|| {
                                AppError::NotFound("Parent comment not found".to_string())
                            })?,
                    ),
                    None => None,
                };

                let created = self
                    .comment_repo
                    .create(comment::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        post_id: Set(post.id.clone()),
                        user_id: Set(input.user_id.clone()),
                        content: Set(input.content.clone()),
                        parent_comment_id: Set(parent.as_ref().map(|p| p.id.clone())),
                        mentions: Set(serde_json::json!(mentions)),
                        created_at: Set(Utc::now().into()),
                        updated_at: Set(None),
                    })
                    .await?;

                let mut comment_ids = post.comment_id_list();
                comment_ids.push(created.id.clone());
                self.post_repo.set_comment_ids(&post.id, &comment_ids).await?;

                Ok::<_, AppError>((post, parent, created))
            })
            .await?;

        tracing::debug!(comment_id = %created.id, post_id = %post.id, "Comment created");

        // The comment is stored; enrichment failures only degrade the response
        let author = match self.user_repo.find_by_id(&input.user_id).await {
            Ok(author) => author,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    user_id = %input.user_id,
                    "Failed to load comment author"
                );
                None
            }
        };
        let actor = Actor::new(&input.user_id, author.as_ref());

        self.notification_service
            .notify_comment(&post, &created, parent.as_ref(), &actor)
            .await;
        if !mentions.is_empty() {
            self.notification_service
                .notify_mentions(&post, &mentions, &actor)
                .await;
        }

        let like_count = self.like_count(&created.id).await.unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                comment_id = %created.id,
                "Failed to count comment likes"
            );
            0
        });
        Ok(CommentResponse::from_model(
            created,
            author.as_ref(),
            like_count,
            false,
        ))
    }

    /// Change the text of a comment. Only its author may do so.
    pub async fn update(
        &self,
        comment_id: &str,
        user_id: &str,
        content: &str,
    ) -> AppResult<CommentResponse> {
        if content.trim().is_empty() {
            return Err(AppError::BadRequest("Content is required".to_string()));
        }

        let existing = self.comment_repo.get_by_id(comment_id).await?;
        if !can_modify(user_id, &existing.user_id, false) {
            return Err(AppError::Forbidden(
                "You can only update your own comments".to_string(),
            ));
        }

        let mut active: comment::ActiveModel = existing.into();
        active.content = Set(content.to_string());
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self.comment_repo.update(active).await?;

        self.respond(updated, Some(user_id)).await
    }

    /// Delete a comment.
    ///
    /// Allowed for the comment's author, the post's author, and admins. The
    /// comment ID is dropped from the post's list when the post still exists.
    pub async fn delete(&self, comment_id: &str, user_id: &str, is_admin: bool) -> AppResult<()> {
        let existing = self.comment_repo.get_by_id(comment_id).await?;
        let post_id = existing.post_id.clone();

        self.locks
            .run(&post_id, async {
                let post = self.post_repo.find_by_id(&post_id).await?;

                let allowed = can_modify(user_id, &existing.user_id, is_admin)
                    || post
                        .as_ref()
                        .is_some_and(|p| can_modify(user_id, &p.user_id, false));
                if !allowed {
                    return Err(AppError::Forbidden(
                        "You don't have permission to delete this comment".to_string(),
                    ));
                }

                if let Some(post) = post {
                    let comment_ids: Vec<String> = post
                        .comment_id_list()
                        .into_iter()
                        .filter(|id| id != comment_id)
                        .collect();
                    self.post_repo.set_comment_ids(&post.id, &comment_ids).await?;
                }

                self.comment_repo.delete(comment_id).await?;
                Ok(())
            })
            .await?;

        tracing::debug!(comment_id = %comment_id, post_id = %post_id, "Comment deleted");
        self.notification_service
            .notify_comment_deleted(&post_id)
            .await;

        Ok(())
    }

    /// Comments on a post, newest first.
    pub async fn list_for_post(
        &self,
        post_id: &str,
        limit: u64,
        viewer_id: Option<&str>,
    ) -> AppResult<Vec<CommentResponse>> {
        let comments = self
            .comment_repo
            .find_by_post(post_id, limit.max(1))
            .await?;
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids: Vec<String> = comments
            .iter()
            .map(|c| c.user_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut responses = Vec::with_capacity(comments.len());
        for c in comments {
            let like_count = self.like_count(&c.id).await?;
            let user_liked = self.has_liked(&c.id, viewer_id).await?;
            let author = authors.get(&c.user_id);
            responses.push(CommentResponse::from_model(c, author, like_count, user_liked));
        }
        Ok(responses)
    }

    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        self.comment_repo.count_by_post(post_id).await
    }

    /// Toggle a user's reaction on a comment.
    pub async fn react(
        &self,
        comment_id: &str,
        user_id: &str,
        reaction_type: Option<&str>,
    ) -> AppResult<CommentResponse> {
        let reaction_type = reaction_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_COMMENT_REACTION)
            .to_lowercase();

        let target = self.comment_repo.get_by_id(comment_id).await?;

        let key = format!("comment:{comment_id}");
        self.locks
            .run(&key, async {
                match self.comment_repo.find_reaction(comment_id, user_id).await? {
                    Some(existing) => self.comment_repo.delete_reaction(&existing.id).await,
                    None => self
                        .comment_repo
                        .create_reaction(comment_reaction::ActiveModel {
                            id: Set(self.id_gen.generate()),
                            comment_id: Set(comment_id.to_string()),
                            user_id: Set(user_id.to_string()),
                            reaction_type: Set(reaction_type),
                            created_at: Set(Utc::now().into()),
                        })
                        .await
                        .map(|_| ()),
                }
            })
            .await?;

        self.respond(target, Some(user_id)).await
    }

    async fn respond(
        &self,
        model: comment::Model,
        viewer_id: Option<&str>,
    ) -> AppResult<CommentResponse> {
        let author = self.user_repo.find_by_id(&model.user_id).await?;
        let like_count = self.like_count(&model.id).await?;
        let user_liked = self.has_liked(&model.id, viewer_id).await?;
        Ok(CommentResponse::from_model(
            model,
            author.as_ref(),
            like_count,
            user_liked,
        ))
    }

    async fn like_count(&self, comment_id: &str) -> AppResult<u64> {
        self.comment_repo
            .count_reactions(comment_id, DEFAULT_COMMENT_REACTION)
            .await
    }

    async fn has_liked(&self, comment_id: &str, viewer_id: Option<&str>) -> AppResult<bool> {
        match viewer_id {
            Some(viewer) if !viewer.is_empty() => Ok(self
                .comment_repo
                .find_reaction(comment_id, viewer)
                .await?
                .is_some()),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::event_publisher::{CommentChange, RecordingEventPublisher, StreamEvent};
    use agora_db::{
        entities::{notification, notification::NotificationType, post},
        repositories::NotificationRepository,
        test_utils::fixtures,
    };
    use sea_orm::{
        DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, MockExecResult, Transaction,
    };
    use std::{collections::BTreeMap, sync::Arc};

    fn service(db: MockDatabase, publisher: &RecordingEventPublisher) -> CommentService {
        service_on(Arc::new(db.into_connection()), publisher)
    }

    fn service_on(
        db: Arc<DatabaseConnection>,
        publisher: &RecordingEventPublisher,
    ) -> CommentService {
        let mut notifications = NotificationService::new(NotificationRepository::new(db.clone()));
        notifications.set_event_publisher(Arc::new(publisher.clone()));
        CommentService::new(
            CommentRepository::new(db.clone()),
            PostRepository::new(db.clone()),
            UserRepository::new(db),
            notifications,
        )
    }

    /// The statement that persists a post's comment ID list.
    fn comment_ids_update(post_id: &str, ids: serde_json::Value) -> Transaction {
        Transaction::from_sql_and_values(
            DatabaseBackend::Postgres,
            r#"UPDATE "post" SET "comment_ids" = $1 WHERE "post"."id" = $2"#,
            [ids.into(), post_id.into()],
        )
    }

    fn affected(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn count(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
    }

    fn input(post_id: &str, user_id: &str, parent: Option<&str>) -> CreateCommentInput {
        CreateCommentInput {
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            content: "nice".to_string(),
            parent_comment_id: parent.map(ToString::to_string),
            mentions: Vec::new(),
        }
    }

    #[test]
    fn test_parse_mentions() {
        assert_eq!(parse_mentions("u1, u2,,  ,u3"), ["u1", "u2", "u3"]);
        assert!(parse_mentions("").is_empty());
    }

    #[test]
    fn test_response_falls_back_for_missing_author() {
        let response =
            CommentResponse::from_model(fixtures::comment("c1", "p1", "gone", None), None, 0, false);

        assert_eq!(response.user_name, "Deleted User");
        assert!(response.user_profile_picture.is_none());
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let author = fixtures::user("u1", "Ada", "Lovelace");
        let response = CommentResponse::from_model(
            fixtures::comment("c2", "p1", "u1", Some("c1")),
            Some(&author),
            3,
            true,
        );
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["userName"], "Ada Lovelace");
        assert_eq!(json["parentCommentId"], "c1");
        assert_eq!(json["likeCount"], 3);
        assert_eq!(json["userLiked"], true);
    }

    #[tokio::test]
    async fn test_create_top_level_comment_notifies_post_author() {
        let created = fixtures::comment("c1", "p1", "u1", None);

        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::post("p1", "author")]])
                .append_query_results([[created]])
                .append_exec_results([affected(1)])
                .append_query_results([[fixtures::user("u1", "Ada", "Lovelace")]])
                .append_query_results([[fixtures::notification(
                    "n1",
                    "author",
                    NotificationType::Comment,
                )]])
                .append_query_results([[count(0)]]),
            &publisher,
        );

        let response = svc.create(input("p1", "u1", None)).await.unwrap();

        assert_eq!(response.id, "c1");
        assert_eq!(response.user_name, "Ada Lovelace");
        assert_eq!(response.like_count, 0);

        let events = publisher.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            StreamEvent::Notification { user_id, notification }
                if user_id == "author" && notification.notification_type == NotificationType::Comment
        ));
        assert_eq!(
            events[1],
            StreamEvent::CommentsChanged {
                post_id: "p1".to_string(),
                change: CommentChange::Add,
            }
        );
    }

    #[tokio::test]
    async fn test_create_appends_id_to_post_comment_list() {
        let publisher = RecordingEventPublisher::default();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post::Model {
                    comment_ids: serde_json::json!(["c0"]),
                    ..fixtures::post("p1", "u1")
                }]])
                .append_query_results([[fixtures::comment("c1", "p1", "u1", None)]])
                .append_exec_results([affected(1)])
                .append_query_results([[fixtures::user("u1", "Ada", "Lovelace")]])
                .append_query_results([[count(0)]])
                .into_connection(),
        );
        let svc = service_on(db.clone(), &publisher);

        svc.create(input("p1", "u1", None)).await.unwrap();
        drop(svc);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert!(log.contains(&comment_ids_update("p1", serde_json::json!(["c0", "c1"]))));
    }

    #[tokio::test]
    async fn test_create_survives_failed_enrichment() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::post("p1", "author")]])
                .append_query_results([[fixtures::comment("c1", "p1", "u1", None)]])
                .append_exec_results([affected(1)])
                .append_query_errors([DbErr::Custom("connection reset".to_string())])
                .append_query_results([[fixtures::notification(
                    "n1",
                    "author",
                    NotificationType::Comment,
                )]])
                .append_query_errors([DbErr::Custom("connection reset".to_string())]),
            &publisher,
        );

        let response = svc.create(input("p1", "u1", None)).await.unwrap();

        assert_eq!(response.id, "c1");
        assert_eq!(response.user_name, "Deleted User");
        assert_eq!(response.like_count, 0);
        assert_eq!(publisher.events().len(), 2);
    }

    #[tokio::test]
    async fn test_create_reply_notifies_parent_author() {
        let parent = fixtures::comment("c1", "p1", "u1", None);
        let reply = fixtures::comment("c2", "p1", "u2", Some("c1"));

        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::post("p1", "author")]])
                .append_query_results([[parent]])
                .append_query_results([[reply]])
                .append_exec_results([affected(1)])
                .append_query_results([[fixtures::user("u2", "Alan", "Turing")]])
                .append_query_results([[fixtures::notification("n2", "u1", NotificationType::Reply)]])
                .append_query_results([[count(0)]]),
            &publisher,
        );

        let response = svc.create(input("p1", "u2", Some("c1"))).await.unwrap();

        assert_eq!(response.parent_comment_id.as_deref(), Some("c1"));
        let notified: Vec<_> = publisher
            .events()
            .into_iter()
            .filter_map(|e| match e {
                StreamEvent::Notification { notification, .. } => Some(notification),
                StreamEvent::CommentsChanged { .. } => None,
            })
            .collect();
        assert_eq!(notified.len(), 1);
        assert_eq!(notified[0].user_id, "u1");
        assert_eq!(notified[0].notification_type, NotificationType::Reply);
    }

    #[tokio::test]
    async fn test_comment_on_own_post_sends_nothing() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::post("p1", "author")]])
                .append_query_results([[fixtures::comment("c1", "p1", "author", None)]])
                .append_exec_results([affected(1)])
                .append_query_results([[fixtures::user("author", "Grace", "Hopper")]])
                .append_query_results([[count(0)]]),
            &publisher,
        );

        svc.create(input("p1", "author", None)).await.unwrap();

        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_create_on_missing_post() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()]),
            &publisher,
        );

        let err = svc.create(input("gone", "u1", None)).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(msg) if msg == "Post not found"));
    }

    #[tokio::test]
    async fn test_create_with_missing_parent() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::post("p1", "author")]])
                .append_query_results([Vec::<comment::Model>::new()]),
            &publisher,
        );

        let err = svc.create(input("p1", "u1", Some("c404"))).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(msg) if msg == "Parent comment not found"));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_content() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), &publisher);

        let mut empty = input("p1", "u1", None);
        empty.content = String::new();

        assert!(matches!(
            svc.create(empty).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_update_by_non_author_is_forbidden() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::comment("c1", "p1", "u1", None)]]),
            &publisher,
        );

        let err = svc.update("c1", "u2", "edited").await.unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_update_sets_updated_at() {
        let original = fixtures::comment("c1", "p1", "u1", None);
        let edited = comment::Model {
            content: "edited".to_string(),
            updated_at: Some(Utc::now().into()),
            ..original.clone()
        };

        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[original]])
                .append_query_results([[edited]])
                .append_query_results([[fixtures::user("u1", "Ada", "Lovelace")]])
                .append_query_results([[count(2)]])
                .append_query_results([Vec::<comment_reaction::Model>::new()]),
            &publisher,
        );

        let response = svc.update("c1", "u1", "edited").await.unwrap();

        assert_eq!(response.content, "edited");
        assert!(response.updated_at.is_some());
        assert_eq!(response.like_count, 2);
        assert!(!response.user_liked);
    }

    #[tokio::test]
    async fn test_post_author_may_delete_comment() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::comment("c1", "p1", "u1", None)]])
                .append_query_results([[post::Model {
                    comment_ids: serde_json::json!(["c0", "c1"]),
                    ..fixtures::post("p1", "author")
                }]])
                .append_exec_results([affected(1), affected(1)]),
            &publisher,
        );

        svc.delete("c1", "author", false).await.unwrap();

        assert_eq!(
            publisher.events(),
            vec![StreamEvent::CommentsChanged {
                post_id: "p1".to_string(),
                change: CommentChange::Delete,
            }]
        );
    }

    #[tokio::test]
    async fn test_delete_removes_id_from_post_comment_list() {
        let publisher = RecordingEventPublisher::default();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::comment("c1", "p1", "u1", None)]])
                .append_query_results([[post::Model {
                    comment_ids: serde_json::json!(["c0", "c1"]),
                    ..fixtures::post("p1", "author")
                }]])
                .append_exec_results([affected(1), affected(1)])
                .into_connection(),
        );
        let svc = service_on(db.clone(), &publisher);

        svc.delete("c1", "u1", false).await.unwrap();
        drop(svc);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert!(log.contains(&comment_ids_update("p1", serde_json::json!(["c0"]))));
    }

    #[tokio::test]
    async fn test_stranger_may_not_delete_comment() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::comment("c1", "p1", "u1", None)]])
                .append_query_results([[fixtures::post("p1", "author")]]),
            &publisher,
        );

        let err = svc.delete("c1", "u9", false).await.unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_post() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::comment("c1", "p1", "u1", None)]])
                .append_query_results([Vec::<post::Model>::new()])
                .append_exec_results([affected(1)])
                .append_query_results([[fixtures::comment("c2", "p2", "u1", None)]])
                .append_query_results([Vec::<post::Model>::new()])
                .append_exec_results([affected(1)]),
            &publisher,
        );

        // Author and admin can both clean up after the post is gone.
        svc.delete("c1", "u1", false).await.unwrap();
        svc.delete("c2", "admin", true).await.unwrap();
    }

    #[tokio::test]
    async fn test_react_toggles_like() {
        let target = fixtures::comment("c1", "p1", "author", None);
        let like = comment_reaction::Model {
            id: "cr1".to_string(),
            comment_id: "c1".to_string(),
            user_id: "u1".to_string(),
            reaction_type: DEFAULT_COMMENT_REACTION.to_string(),
            created_at: Utc::now().into(),
        };

        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                // like
                .append_query_results([[target.clone()]])
                .append_query_results([Vec::<comment_reaction::Model>::new()])
                .append_query_results([[like.clone()]])
                .append_query_results([[fixtures::user("author", "Grace", "Hopper")]])
                .append_query_results([[count(1)]])
                .append_query_results([[like.clone()]])
                // unlike
                .append_query_results([[target]])
                .append_query_results([[like]])
                .append_exec_results([affected(1)])
                .append_query_results([[fixtures::user("author", "Grace", "Hopper")]])
                .append_query_results([[count(0)]])
                .append_query_results([Vec::<comment_reaction::Model>::new()]),
            &publisher,
        );

        let liked = svc.react("c1", "u1", None).await.unwrap();
        assert_eq!((liked.like_count, liked.user_liked), (1, true));

        let unliked = svc.react("c1", "u1", Some("LIKE")).await.unwrap();
        assert_eq!((unliked.like_count, unliked.user_liked), (0, false));
    }

    #[tokio::test]
    async fn test_list_for_post_uses_placeholders_for_deleted_authors() {
        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    fixtures::comment("c2", "p1", "gone", None),
                    fixtures::comment("c1", "p1", "u1", None),
                ]])
                .append_query_results([[fixtures::user("u1", "Ada", "Lovelace")]])
                .append_query_results([[count(0)]])
                .append_query_results([[count(4)]]),
            &publisher,
        );

        let comments = svc
            .list_for_post("p1", DEFAULT_COMMENT_LIMIT, None)
            .await
            .unwrap();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].user_name, "Deleted User");
        assert_eq!(comments[1].user_name, "Ada Lovelace");
        assert_eq!(comments[1].like_count, 4);
    }

    #[tokio::test]
    async fn test_create_sends_mention_notifications() {
        let mut with_mentions = input("p1", "u1", None);
        with_mentions.mentions = vec!["u3".to_string(), "author".to_string()];

        let publisher = RecordingEventPublisher::default();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::post("p1", "author")]])
                .append_query_results([[comment::Model {
                    mentions: serde_json::json!(["u3", "author"]),
                    ..fixtures::comment("c1", "p1", "u1", None)
                }]])
                .append_exec_results([affected(1)])
                .append_query_results([[fixtures::user("u1", "Ada", "Lovelace")]])
                .append_query_results([[fixtures::notification(
                    "n1",
                    "author",
                    NotificationType::Comment,
                )]])
                .append_query_results([[notification::Model {
                    content: "Ada Lovelace mentioned you in a comment".to_string(),
                    ..fixtures::notification("n2", "u3", NotificationType::Mention)
                }]])
                .append_query_results([[count(0)]]),
            &publisher,
        );

        let response = svc.create(with_mentions).await.unwrap();

        assert_eq!(response.mentions, ["u3", "author"]);
        let recipients: Vec<String> = publisher
            .events()
            .into_iter()
            .filter_map(|e| match e {
                StreamEvent::Notification { user_id, .. } => Some(user_id),
                StreamEvent::CommentsChanged { .. } => None,
            })
            .collect();
        assert_eq!(recipients, ["author", "u3"]);
    }
}
