//! Report entity (a user flagging a post for moderation).

use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    #[sea_orm(string_value = "PENDING")]
    #[default]
    Pending,
    #[sea_orm(string_value = "RESOLVED")]
    Resolved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "RESOLVED" => Ok(Self::Resolved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("Invalid report status: {s}")),
        }
    }
}

/// Report model.
///
/// Reports outlive the post they point at, so `post_id` has no foreign key.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// The reported post.
    #[sea_orm(indexed)]
    pub post_id: String,
    /// The user who submitted the report.
    pub reporter_id: String,
    /// Reporter display name at the time of reporting.
    pub reporter_name: String,
    pub reason: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub status: ReportStatus,
    /// Admin who last handled the report.
    #[sea_orm(nullable)]
    pub admin_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub admin_note: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
