//! Write-through of committed decisions to the store of record.
//!
//! The deck has already advanced by the time `commit` runs. A failed write is
//! reported but never rolls the deck back, so a later refresh may show the
//! same opportunity again.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::opportunity::{Opportunity, OpportunityId};
use crate::models::profile::UserId;
use crate::models::swipe::{Swipe, SwipeAction, SwipeId, SwipeUpsert};
use crate::store::{OpportunityStore, StoreError};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Daily swipe limit reached ({limit} swipes). Limit resets at midnight UTC.")]
    DailyLimitReached { limit: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeCommit {
    pub user_id: UserId,
    pub opportunity_id: OpportunityId,
    pub action: SwipeAction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwipeStats {
    pub total: usize,
    pub skipped: usize,
    pub saved: usize,
    pub interested: usize,
}

impl SwipeStats {
    pub fn from_swipes(swipes: &[Swipe]) -> Self {
        swipes.iter().fold(Self::default(), |mut stats, s| {
            stats.total += 1;
            match s.action {
                SwipeAction::Skip => stats.skipped += 1,
                SwipeAction::Save => stats.saved += 1,
                SwipeAction::Interested => stats.interested += 1,
            }
            stats
        })
    }
}

/// A saved decision with the opportunity it refers to.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SavedItem {
    #[serde(flatten)]
    pub swipe: Swipe,
    pub opportunity: Opportunity,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SwipeLimits {
    /// Zero means no limit.
    pub daily_limit: u32,
    pub used_today: u32,
    /// `None` when there is no limit.
    pub remaining: Option<u32>,
    /// Next UTC midnight.
    pub reset_time: DateTime<Utc>,
}

pub struct ActionPersister {
    store: Arc<dyn OpportunityStore>,
    /// New decisions per UTC day; zero disables the check.
    daily_limit: u32,
}

impl ActionPersister {
    pub fn new(store: Arc<dyn OpportunityStore>, daily_limit: u32) -> Self {
        Self { store, daily_limit }
    }

    /// Idempotent upsert keyed on `(user_id, opportunity_id)`. Re-deciding an
    /// existing pair overwrites its action and is never counted against the
    /// daily limit.
    pub async fn commit(&self, commit: &SwipeCommit) -> Result<Swipe, PersistError> {
        if self.daily_limit > 0 {
            self.check_daily_limit(commit).await?;
        }

        let swipe = self
            .store
            .upsert_swipe(&SwipeUpsert {
                user_id: commit.user_id,
                opportunity_id: commit.opportunity_id,
                action: commit.action,
                updated_at: Utc::now(),
            })
            .await?;

        info!(
            "Recorded {} on opportunity {} for user {} (swipe {})",
            swipe.action, swipe.opportunity_id, swipe.user_id, swipe.id
        );
        Ok(swipe)
    }

    /// Removes an item from the user's saved list. Returns `false` when the
    /// swipe does not exist, belongs to someone else, or is not a save.
    pub async fn remove_saved(&self, user_id: UserId, swipe_id: SwipeId) -> Result<bool, PersistError> {
        let swipes = self.store.list_swipes(user_id).await?;
        let is_saved = swipes
            .iter()
            .any(|s| s.id == swipe_id && s.action == SwipeAction::Save);
        if !is_saved {
            debug!("Swipe {swipe_id} is not a saved item of user {user_id}");
            return Ok(false);
        }

        let removed = self.store.delete_swipe(user_id, swipe_id).await?;
        if removed {
            info!("Removed saved swipe {swipe_id} for user {user_id}");
        }
        Ok(removed)
    }

    /// Saved items, newest first. Saves whose opportunity has been deleted
    /// are skipped.
    pub async fn saved(
        &self,
        user_id: UserId,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<SavedItem>, PersistError> {
        let mut swipes: Vec<Swipe> = self
            .store
            .list_swipes(user_id)
            .await?
            .into_iter()
            .filter(|s| s.action == SwipeAction::Save)
            .collect();
        swipes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let mut items = Vec::new();
        for swipe in swipes {
            match self.store.get_opportunity(swipe.opportunity_id).await {
                Ok(opportunity) => items.push(SavedItem { swipe, opportunity }),
                Err(StoreError::NotFound(_)) => {
                    debug!("Saved swipe {} points at a missing opportunity", swipe.id);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(items.into_iter().skip(skip).take(limit).collect())
    }

    pub async fn limits(&self, user_id: UserId) -> Result<SwipeLimits, PersistError> {
        self.limits_at(user_id, Utc::now()).await
    }

    async fn limits_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<SwipeLimits, PersistError> {
        let today = start_of_day(now);
        let used = self.store.count_swipes_since(user_id, today).await?;
        let used_today = u32::try_from(used).unwrap_or(u32::MAX);
        let remaining =
            (self.daily_limit > 0).then(|| self.daily_limit.saturating_sub(used_today));
        Ok(SwipeLimits {
            daily_limit: self.daily_limit,
            used_today,
            remaining,
            reset_time: today + Days::new(1),
        })
    }

    pub async fn stats(&self, user_id: UserId) -> Result<SwipeStats, PersistError> {
        let swipes = self.store.list_swipes(user_id).await?;
        Ok(SwipeStats::from_swipes(&swipes))
    }

    async fn check_daily_limit(&self, commit: &SwipeCommit) -> Result<(), PersistError> {
        let existing = self
            .store
            .find_swipe(commit.user_id, commit.opportunity_id)
            .await?;
        if existing.is_some() {
            return Ok(());
        }

        let used = self
            .store
            .count_swipes_since(commit.user_id, start_of_day(Utc::now()))
            .await?;
        if used >= i64::from(self.daily_limit) {
            return Err(PersistError::DailyLimitReached {
                limit: self.daily_limit,
            });
        }
        Ok(())
    }
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}
