use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::opportunity::{OpportunityType, WorkArrangement};
use crate::models::profile::UserId;

/// Per-user feed filters. An empty dimension means "no filter", never "match nothing".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub opportunity_types: Vec<OpportunityType>,
    pub work_arrangements: Vec<WorkArrangement>,
    pub job_levels: Vec<String>,
    pub salary_min: Option<f64>,
    pub preferred_industries: Vec<String>,
    pub preferred_locations: Vec<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PreferencesRow {
    pub user_id: UserId,
    pub opportunity_types: Vec<String>,
    pub work_arrangements: Vec<String>,
    pub job_levels: Vec<String>,
    pub salary_min: Option<f64>,
    pub preferred_industries: Vec<String>,
    pub preferred_locations: Vec<String>,
}

impl From<PreferencesRow> for Preferences {
    /// Unrecognised enum values are dropped rather than failing the whole row.
    fn from(row: PreferencesRow) -> Self {
        Preferences {
            opportunity_types: row
                .opportunity_types
                .iter()
                .filter_map(|t| t.parse().ok())
                .collect(),
            work_arrangements: row
                .work_arrangements
                .iter()
                .filter_map(|a| a.parse().ok())
                .collect(),
            job_levels: row.job_levels,
            salary_min: row.salary_min,
            preferred_industries: row.preferred_industries,
            preferred_locations: row.preferred_locations,
        }
    }
}
