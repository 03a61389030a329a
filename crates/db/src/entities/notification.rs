//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationType {
    #[sea_orm(string_value = "LIKE")]
    Like,
    #[sea_orm(string_value = "COMMENT")]
    Comment,
    #[sea_orm(string_value = "REPLY")]
    Reply,
    #[sea_orm(string_value = "MENTION")]
    Mention,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    #[sea_orm(indexed)]
    pub user_id: String,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    /// Rendered message, e.g. "Ada Lovelace commented on your post"
    pub content: String,

    /// Post the notification points at
    #[sea_orm(nullable)]
    pub source_id: Option<String>,

    /// The user who triggered the notification
    pub source_user_id: String,

    #[sea_orm(default_value = false)]
    #[serde(rename = "read")]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
