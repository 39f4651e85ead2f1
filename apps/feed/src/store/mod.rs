//! Storage collaborator: the backend of record for opportunities, profiles,
//! preferences and swipe decisions.
//!
//! `PgOpportunityStore` is the production backend. Tests use the in-memory
//! store in `memory`, which can inject transport aborts and write failures.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::opportunity::{Opportunity, OpportunityId, OpportunityType, WorkArrangement};
use crate::models::preferences::Preferences;
use crate::models::profile::{UserId, UserProfile};
use crate::models::swipe::{Swipe, SwipeId, SwipeUpsert};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never completed (connection drop, pool timeout). Safe to retry.
    #[error("request aborted: {0}")]
    Aborted(String),

    /// The backend answered and refused (bad query, permission denied).
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Only transport-level aborts are retried by the feed loader.
    pub fn is_abort(&self) -> bool {
        matches!(self, StoreError::Aborted(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Aborted(err.to_string()),
            sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
            other => StoreError::Database(other),
        }
    }
}

/// Source-side filter. Everything here is expressible as a WHERE clause;
/// empty vectors mean "no filter".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OpportunityFilter {
    pub active: bool,
    pub exclude_ids: Vec<OpportunityId>,
    pub types: Vec<OpportunityType>,
    pub arrangements: Vec<WorkArrangement>,
    pub levels: Vec<String>,
    pub salary_min: Option<f64>,
    pub limit: usize,
}

impl OpportunityFilter {
    /// In-process equivalent of the Postgres listing query. Opportunities
    /// with no published salary are kept under a salary floor.
    #[cfg(test)]
    pub fn matches(&self, opp: &Opportunity) -> bool {
        if self.active && !opp.is_active {
            return false;
        }
        if self.exclude_ids.contains(&opp.id) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&opp.opportunity_type) {
            return false;
        }
        if !self.arrangements.is_empty() && !self.arrangements.contains(&opp.work_arrangement) {
            return false;
        }
        if !self.levels.is_empty() {
            let level = opp.experience_level.as_deref().map(str::to_lowercase);
            let wanted = level.is_some_and(|level| {
                self.levels.iter().any(|l| l.to_lowercase() == level)
            });
            if !wanted {
                return false;
            }
        }
        if let Some(floor) = self.salary_min {
            let ceiling = opp.salary_max.or(opp.salary_min);
            if ceiling.is_some_and(|c| c < floor) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait OpportunityStore: Send + Sync {
    async fn list_opportunities(
        &self,
        filter: &OpportunityFilter,
    ) -> Result<Vec<Opportunity>, StoreError>;

    async fn get_opportunity(&self, id: OpportunityId) -> Result<Opportunity, StoreError>;

    async fn list_swipes(&self, user_id: UserId) -> Result<Vec<Swipe>, StoreError>;

    async fn find_swipe(
        &self,
        user_id: UserId,
        opportunity_id: OpportunityId,
    ) -> Result<Option<Swipe>, StoreError>;

    async fn count_swipes_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Insert-or-update on `(user_id, opportunity_id)`.
    async fn upsert_swipe(&self, record: &SwipeUpsert) -> Result<Swipe, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_swipe(&self, user_id: UserId, swipe_id: SwipeId) -> Result<bool, StoreError>;

    async fn get_preferences(&self, user_id: UserId) -> Result<Preferences, StoreError>;

    async fn get_profile(&self, user_id: UserId) -> Result<UserProfile, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::opportunity::fixtures::opportunity;

    #[test]
    fn test_default_filter_is_inclusive() {
        let filter = OpportunityFilter::default();
        assert!(filter.matches(&opportunity(1)));
    }

    #[test]
    fn test_filter_excludes_ids_and_inactive() {
        let filter = OpportunityFilter {
            active: true,
            exclude_ids: vec![5, 9],
            ..OpportunityFilter::default()
        };
        assert!(!filter.matches(&opportunity(5)));
        assert!(filter.matches(&opportunity(6)));

        let mut closed = opportunity(6);
        closed.is_active = false;
        assert!(!filter.matches(&closed));
    }

    #[test]
    fn test_salary_floor_keeps_unpublished_salaries() {
        let filter = OpportunityFilter {
            salary_min: Some(50_000.0),
            ..OpportunityFilter::default()
        };
        let mut opp = opportunity(1);
        assert!(filter.matches(&opp));

        opp.salary_max = Some(45_000.0);
        assert!(!filter.matches(&opp));

        opp.salary_max = Some(60_000.0);
        assert!(filter.matches(&opp));
    }

    #[test]
    fn test_level_filter_case_insensitive() {
        let filter = OpportunityFilter {
            levels: vec!["Entry".to_string()],
            ..OpportunityFilter::default()
        };
        assert!(filter.matches(&opportunity(1)));

        let mut senior = opportunity(2);
        senior.experience_level = Some("senior".to_string());
        assert!(!filter.matches(&senior));
    }

    #[test]
    fn test_level_filter_folds_non_ascii_case() {
        let filter = OpportunityFilter {
            levels: vec!["DÉBUTANT".to_string()],
            ..OpportunityFilter::default()
        };
        let mut opp = opportunity(1);
        opp.experience_level = Some("débutant".to_string());
        assert!(filter.matches(&opp));

        opp.experience_level = None;
        assert!(!filter.matches(&opp));
    }

    #[test]
    fn test_sqlx_errors_classified() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_abort());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_abort());
        assert!(!StoreError::from(sqlx::Error::Protocol("bad".to_string())).is_abort());
    }
}
