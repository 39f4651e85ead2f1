//! Feed loader: cache hydration, then a retrying fetch from the source.
//!
//! Pipeline per attempt: decided ids → source filter → fetch → client-side
//! filters → de-duplicate → cap. Candidates keep source order; the match
//! score is attached for display only and never used as a sort key.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::FeedSettings;
use crate::feed::cache::{CachedFeed, FeedCache};
use crate::feed::filter::{matches_client_side, source_filter};
use crate::models::opportunity::{FeedCard, Opportunity, OpportunityId};
use crate::models::preferences::Preferences;
use crate::models::profile::{UserId, UserProfile};
use crate::scoring::MatchScorer;
use crate::store::{OpportunityStore, StoreError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("feed unavailable after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("feed request failed: {0}")]
    Failed(#[source] StoreError),

    #[error("load cancelled")]
    Cancelled,
}

/// Cleared on teardown. Checked before every state mutation a load makes.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Default for Liveness {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl Liveness {
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn shut_down(&self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct FeedLoader {
    store: Arc<dyn OpportunityStore>,
    cache: Arc<dyn FeedCache>,
    scorer: Arc<dyn MatchScorer>,
    settings: FeedSettings,
}

impl FeedLoader {
    pub fn new(
        store: Arc<dyn OpportunityStore>,
        cache: Arc<dyn FeedCache>,
        scorer: Arc<dyn MatchScorer>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            store,
            cache,
            scorer,
            settings,
        }
    }

    /// Last cached queue, scored against the current profile. A missing or
    /// unreadable cache yields an empty queue; the refresh still runs.
    pub async fn hydrate(&self, user_id: UserId, profile: &UserProfile) -> Vec<FeedCard> {
        match self.cache.read(user_id).await {
            Ok(Some(cached)) => {
                info!(
                    "Feed cache hit for user {user_id}: {} cards saved at {}",
                    cached.opportunities.len(),
                    cached.saved_at
                );
                self.annotate(cached.opportunities, profile)
            }
            Ok(None) => {
                debug!("Feed cache miss for user {user_id}");
                vec![]
            }
            Err(e) => {
                warn!("Ignoring unreadable feed cache for user {user_id}: {e}");
                vec![]
            }
        }
    }

    /// Fetches a fresh queue and, if the session is still alive, overwrites
    /// the cache with it.
    pub async fn refresh(
        &self,
        user_id: UserId,
        prefs: &Preferences,
        profile: &UserProfile,
        liveness: &Liveness,
    ) -> Result<Vec<FeedCard>, LoadError> {
        let opportunities = self.fetch_with_retry(user_id, prefs, liveness).await?;

        if !liveness.is_alive() {
            debug!("Session for user {user_id} torn down; dropping fetched feed");
            return Err(LoadError::Cancelled);
        }

        let snapshot = CachedFeed {
            user_id,
            saved_at: Utc::now(),
            opportunities: opportunities.clone(),
        };
        if let Err(e) = self.cache.write(&snapshot).await {
            warn!("Failed to write feed cache for user {user_id}: {e}");
        }

        info!(
            "Loaded {} opportunities for user {user_id}",
            opportunities.len()
        );
        Ok(self.annotate(opportunities, profile))
    }

    pub fn annotate(&self, opportunities: Vec<Opportunity>, profile: &UserProfile) -> Vec<FeedCard> {
        opportunities
            .into_iter()
            .map(|opportunity| {
                let match_result = self.scorer.score(&opportunity, profile);
                FeedCard {
                    opportunity,
                    match_result,
                }
            })
            .collect()
    }

    /// Transport aborts are retried with linear backoff (`unit * attempt`);
    /// any other failure ends the sequence immediately.
    async fn fetch_with_retry(
        &self,
        user_id: UserId,
        prefs: &Preferences,
        liveness: &Liveness,
    ) -> Result<Vec<Opportunity>, LoadError> {
        let max_attempts = self.settings.fetch_attempts;
        let mut attempt = 1;

        loop {
            if !liveness.is_alive() {
                return Err(LoadError::Cancelled);
            }

            match self.fetch_once(user_id, prefs).await {
                Ok(opportunities) => return Ok(opportunities),
                Err(e) if e.is_abort() && attempt < max_attempts => {
                    let delay = self.settings.backoff_unit * attempt;
                    warn!(
                        "Feed fetch attempt {attempt}/{max_attempts} for user {user_id} aborted ({e}), retrying after {}ms...",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_abort() => {
                    warn!("Feed fetch for user {user_id} aborted on final attempt {attempt}: {e}");
                    return Err(LoadError::Exhausted {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    warn!("Feed fetch for user {user_id} failed without retry: {e}");
                    return Err(LoadError::Failed(e));
                }
            }
        }
    }

    async fn fetch_once(
        &self,
        user_id: UserId,
        prefs: &Preferences,
    ) -> Result<Vec<Opportunity>, StoreError> {
        let decided: HashSet<OpportunityId> = self
            .store
            .list_swipes(user_id)
            .await?
            .into_iter()
            .map(|s| s.opportunity_id)
            .collect();

        let filter = source_filter(prefs, decided.iter().copied().collect(), self.settings.fetch_limit);
        let candidates = self.store.list_opportunities(&filter).await?;
        let fetched = candidates.len();

        let mut seen = HashSet::new();
        let queue: Vec<Opportunity> = candidates
            .into_iter()
            .filter(|o| !decided.contains(&o.id))
            .filter(|o| seen.insert(o.id))
            .filter(|o| matches_client_side(prefs, o))
            .take(self.settings.page_size)
            .collect();

        debug!(
            "User {user_id}: {fetched} candidates fetched, {} kept after client filters ({} already decided)",
            queue.len(),
            decided.len()
        );
        Ok(queue)
    }
}
