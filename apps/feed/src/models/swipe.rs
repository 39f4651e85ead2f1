use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::opportunity::OpportunityId;
use crate::models::profile::UserId;

pub type SwipeId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SwipeAction {
    Skip,
    Save,
    Interested,
}

impl SwipeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeAction::Skip => "skip",
            SwipeAction::Save => "save",
            SwipeAction::Interested => "interested",
        }
    }
}

impl FromStr for SwipeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" | "dislike" => Ok(SwipeAction::Skip),
            "save" => Ok(SwipeAction::Save),
            "interested" | "applied" | "like" => Ok(SwipeAction::Interested),
            other => Err(format!("unknown swipe action '{other}'")),
        }
    }
}

impl fmt::Display for SwipeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gesture outcome reported by the presentation layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
}

impl SwipeDirection {
    pub fn action(&self) -> SwipeAction {
        match self {
            SwipeDirection::Left => SwipeAction::Skip,
            SwipeDirection::Right => SwipeAction::Save,
            SwipeDirection::Up => SwipeAction::Interested,
        }
    }
}

/// The decision record. At most one per (user_id, opportunity_id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Swipe {
    pub id: SwipeId,
    pub user_id: UserId,
    pub opportunity_id: OpportunityId,
    pub action: SwipeAction,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SwipeRow {
    pub id: i64,
    pub user_id: i64,
    pub opportunity_id: i64,
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SwipeRow> for Swipe {
    type Error = String;

    fn try_from(row: SwipeRow) -> Result<Self, Self::Error> {
        Ok(Swipe {
            id: row.id,
            user_id: row.user_id,
            opportunity_id: row.opportunity_id,
            action: row.action.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Upsert payload, conflict key `(user_id, opportunity_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwipeUpsert {
    pub user_id: UserId,
    pub opportunity_id: OpportunityId,
    pub action: SwipeAction,
    pub updated_at: DateTime<Utc>,
}
