//! Post entity.

use std::collections::BTreeMap;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of an attached media blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// A media blob attached to a post, stored inside the `media` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    /// Storage key of the blob.
    pub id: String,
    pub kind: MediaKind,
    pub url: String,
    pub content_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Author user ID
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Group the post was shared to
    #[sea_orm(nullable, indexed)]
    pub group_id: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Ordered list of [`MediaRef`]
    #[sea_orm(column_type = "JsonBinary")]
    pub media: Json,

    /// Comment IDs (denormalized)
    #[sea_orm(column_type = "JsonBinary")]
    pub comment_ids: Json,

    /// Reaction type -> count (denormalized)
    #[sea_orm(column_type = "JsonBinary")]
    pub reaction_counts: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Attached media in display order.
    #[must_use]
    pub fn media_refs(&self) -> Vec<MediaRef> {
        serde_json::from_value(self.media.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn comment_id_list(&self) -> Vec<String> {
        serde_json::from_value(self.comment_ids.clone()).unwrap_or_default()
    }

    /// Stored reaction counts. Types never reacted with may be absent.
    #[must_use]
    pub fn reaction_count_map(&self) -> BTreeMap<String, u64> {
        serde_json::from_value(self.reaction_counts.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::reaction::Entity")]
    Reactions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
