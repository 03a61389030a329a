//! Reaction ledger.
//!
//! Every (post, user) pair holds at most one reaction. Reacting again with
//! the same type removes it, reacting with another type replaces it. After
//! every mutation the post's denormalized count map is rebuilt from a full
//! scan of its reactions.

use std::collections::BTreeMap;

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::reaction::{self, ReactionType},
    repositories::{PostRepository, ReactionRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::{locks::KeyedLocks, policy::can_modify};

/// What a reaction request does to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAction {
    /// No reaction yet: store the requested one.
    Insert(ReactionType),
    /// A different reaction exists: overwrite it.
    Replace {
        from: ReactionType,
        to: ReactionType,
    },
    /// The same reaction exists: toggle it off.
    Remove(ReactionType),
}

/// Decide how a request for `requested` changes a pair currently holding `existing`.
#[must_use]
pub fn decide(existing: Option<ReactionType>, requested: ReactionType) -> LedgerAction {
    match existing {
        None => LedgerAction::Insert(requested),
        Some(current) if current == requested => LedgerAction::Remove(current),
        Some(current) => LedgerAction::Replace {
            from: current,
            to: requested,
        },
    }
}

/// Per-type reaction counts of a post. Every type is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionCounts {
    pub total: u64,
    pub reactions: BTreeMap<ReactionType, u64>,
}

impl Default for ReactionCounts {
    fn default() -> Self {
        Self {
            total: 0,
            reactions: ReactionType::ALL.into_iter().map(|t| (t, 0)).collect(),
        }
    }
}

impl ReactionCounts {
    /// Count reactions by type.
    pub fn tally(types: impl IntoIterator<Item = ReactionType>) -> Self {
        let mut counts = Self::default();
        for t in types {
            *counts.reactions.entry(t).or_default() += 1;
            counts.total += 1;
        }
        counts
    }

    /// Rebuild from the map stored on a post. Unknown keys are dropped.
    #[must_use]
    pub fn from_stored(stored: &BTreeMap<String, u64>) -> Self {
        let mut counts = Self::default();
        for (key, n) in stored {
            if let Ok(t) = key.parse::<ReactionType>() {
                counts.reactions.insert(t, *n);
                counts.total += n;
            }
        }
        counts
    }

    #[must_use]
    pub fn get(&self, t: ReactionType) -> u64 {
        self.reactions.get(&t).copied().unwrap_or_default()
    }

    /// The form persisted on the post: `{"LIKE": 0, "LOVE": 2, ...}`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.reactions
                .iter()
                .map(|(t, n)| (t.as_str().to_string(), serde_json::Value::from(*n)))
                .collect(),
        )
    }
}

/// Reaction service for business logic.
#[derive(Clone)]
pub struct ReactionService {
    reaction_repo: ReactionRepository,
    post_repo: PostRepository,
    locks: KeyedLocks,
    id_gen: IdGenerator,
}

impl ReactionService {
    /// Create a new reaction service.
    #[must_use]
    pub fn new(reaction_repo: ReactionRepository, post_repo: PostRepository) -> Self {
        Self {
            reaction_repo,
            post_repo,
            locks: KeyedLocks::default(),
            id_gen: IdGenerator::new(),
        }
    }

    /// React to a post, toggling or replacing an existing reaction.
    ///
    /// Mutations of the same post are serialized within this process.
    pub async fn set_reaction(
        &self,
        post_id: &str,
        user_id: &str,
        reaction_type: &str,
    ) -> AppResult<ReactionCounts> {
        let requested: ReactionType = reaction_type.parse().map_err(AppError::InvalidArgument)?;

        self.locks
            .run(post_id, async {
                self.post_repo.get_by_id(post_id).await?;

                let existing = self
                    .reaction_repo
                    .find_by_post_and_user(post_id, user_id)
                    .await?;
                let action = decide(existing.as_ref().map(|r| r.reaction_type), requested);

                match (action, existing) {
                    (LedgerAction::Insert(t), _) => {
                        self.reaction_repo
                            .create(reaction::ActiveModel {
                                id: Set(self.id_gen.generate()),
                                post_id: Set(post_id.to_string()),
                                user_id: Set(user_id.to_string()),
                                reaction_type: Set(t),
                                created_at: Set(chrono::Utc::now().into()),
                            })
                            .await?;
                    }
                    (LedgerAction::Replace { to, .. }, Some(current)) => {
                        let mut active: reaction::ActiveModel = current.into();
                        active.reaction_type = Set(to);
                        active.created_at = Set(chrono::Utc::now().into());
                        self.reaction_repo.update(active).await?;
                    }
                    (LedgerAction::Remove(_), _) | (LedgerAction::Replace { .. }, None) => {
                        self.reaction_repo
                            .delete_by_post_and_user(post_id, user_id)
                            .await?;
                    }
                }

                tracing::debug!(post_id = %post_id, user_id = %user_id, ?action, "Reaction ledger updated");
                self.recompute(post_id).await
            })
            .await
    }

    /// Remove a user's reaction. Removing a missing reaction is not an error.
    ///
    /// `actor_id` is whoever asked for the removal; only the reacting user or
    /// an admin may do so.
    pub async fn remove_reaction(
        &self,
        post_id: &str,
        user_id: &str,
        actor_id: &str,
        is_admin: bool,
    ) -> AppResult<ReactionCounts> {
        if !can_modify(actor_id, user_id, is_admin) {
            return Err(AppError::Forbidden(
                "You can only remove your own reactions".to_string(),
            ));
        }

        self.locks
            .run(post_id, async {
                self.post_repo.get_by_id(post_id).await?;
                self.reaction_repo
                    .delete_by_post_and_user(post_id, user_id)
                    .await?;
                self.recompute(post_id).await
            })
            .await
    }

    /// The reaction a user currently holds on a post.
    pub async fn get_user_reaction(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ReactionType>> {
        Ok(self
            .reaction_repo
            .find_by_post_and_user(post_id, user_id)
            .await?
            .map(|r| r.reaction_type))
    }

    /// Current counts, read from the post's denormalized map.
    pub async fn get_counts(&self, post_id: &str) -> AppResult<ReactionCounts> {
        let post = self.post_repo.get_by_id(post_id).await?;
        Ok(ReactionCounts::from_stored(&post.reaction_count_map()))
    }

    async fn recompute(&self, post_id: &str) -> AppResult<ReactionCounts> {
        let reactions = self.reaction_repo.find_by_post(post_id).await?;
        let counts = ReactionCounts::tally(reactions.iter().map(|r| r.reaction_type));

        if !self
            .post_repo
            .set_reaction_counts(post_id, counts.to_json())
            .await?
        {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        Ok(counts)
    }
}
