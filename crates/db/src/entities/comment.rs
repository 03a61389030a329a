//! Comment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A comment on a post, or a reply to another comment on the same post.
///
/// Comments are not tied to their post or author by foreign keys: they
/// survive both, and readers fall back to placeholders.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub post_id: String,

    pub user_id: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Comment this one replies to
    #[sea_orm(nullable)]
    pub parent_comment_id: Option<String>,

    /// Mentioned user IDs
    #[sea_orm(column_type = "JsonBinary")]
    pub mentions: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    #[must_use]
    pub fn mention_list(&self) -> Vec<String> {
        serde_json::from_value(self.mentions.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment_reaction::Entity")]
    Reactions,
}

impl Related<super::comment_reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
