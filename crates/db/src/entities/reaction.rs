//! Reaction entity (one reaction per user and post).

use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The fixed set of post reactions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReactionType {
    #[sea_orm(string_value = "LIKE")]
    Like,
    #[sea_orm(string_value = "LOVE")]
    Love,
    #[sea_orm(string_value = "HAHA")]
    Haha,
    #[sea_orm(string_value = "WOW")]
    Wow,
    #[sea_orm(string_value = "SAD")]
    Sad,
    #[sea_orm(string_value = "ANGRY")]
    Angry,
}

impl ReactionType {
    /// Every reaction type, in display order.
    pub const ALL: [Self; 6] = [
        Self::Like,
        Self::Love,
        Self::Haha,
        Self::Wow,
        Self::Sad,
        Self::Angry,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "LIKE",
            Self::Love => "LOVE",
            Self::Haha => "HAHA",
            Self::Wow => "WOW",
            Self::Sad => "SAD",
            Self::Angry => "ANGRY",
        }
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionType {
    type Err = String;

    /// Only the exact upper-case names are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Invalid reaction type: {s}"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The post being reacted to
    pub post_id: String,

    /// The user who reacted
    pub user_id: String,

    pub reaction_type: ReactionType,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reaction_type() {
        assert_eq!("LOVE".parse::<ReactionType>(), Ok(ReactionType::Love));
        assert_eq!("ANGRY".parse::<ReactionType>(), Ok(ReactionType::Angry));
        assert_eq!(
            "MEH".parse::<ReactionType>(),
            Err("Invalid reaction type: MEH".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_case_and_whitespace_variants() {
        for input in ["love", "Love", " ANGRY ", "haha\n"] {
            assert_eq!(
                input.parse::<ReactionType>(),
                Err(format!("Invalid reaction type: {input}"))
            );
        }
    }

    #[test]
    fn test_serde_form_matches_display() {
        for t in ReactionType::ALL {
            let json = serde_json::to_value(t).unwrap_or_default();
            assert_eq!(json, serde_json::Value::String(t.to_string()));
        }
    }
}
