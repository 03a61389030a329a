//! Group entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named community users can join and share posts to.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Cover image URL
    #[sea_orm(nullable)]
    pub cover_image: Option<String>,

    /// User who created the group. Only they may edit or delete it.
    #[sea_orm(indexed)]
    pub owner_id: String,

    /// Member user IDs, owner included
    #[sea_orm(column_type = "JsonBinary")]
    pub member_ids: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    #[must_use]
    pub fn member_list(&self) -> Vec<String> {
        serde_json::from_value(self.member_ids.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn has_member(&self, user_id: &str) -> bool {
        self.member_list().iter().any(|m| m == user_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
