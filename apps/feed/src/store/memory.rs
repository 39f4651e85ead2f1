//! In-memory store used by tests. Faults are queued per operation and
//! consumed one per call.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::opportunity::{Opportunity, OpportunityId};
use crate::models::preferences::Preferences;
use crate::models::profile::{UserId, UserProfile};
use crate::models::swipe::{Swipe, SwipeId, SwipeUpsert};
use crate::store::{OpportunityFilter, OpportunityStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    opportunities: Mutex<Vec<Opportunity>>,
    swipes: Mutex<HashMap<(UserId, OpportunityId), Swipe>>,
    preferences: Mutex<HashMap<UserId, Preferences>>,
    profiles: Mutex<HashMap<UserId, UserProfile>>,
    next_swipe_id: AtomicUsize,
    fetch_faults: Mutex<VecDeque<StoreError>>,
    upsert_faults: Mutex<VecDeque<StoreError>>,
    pub fetch_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
    pub last_filter: Mutex<Option<OpportunityFilter>>,
}

impl MemoryStore {
    pub fn with_opportunities(opportunities: Vec<Opportunity>) -> Self {
        Self {
            opportunities: Mutex::new(opportunities),
            ..Self::default()
        }
    }

    pub fn set_opportunities(&self, opportunities: Vec<Opportunity>) {
        *self.opportunities.lock().unwrap() = opportunities;
    }

    pub fn set_profile(&self, profile: UserProfile) {
        self.profiles.lock().unwrap().insert(profile.id, profile);
    }

    pub fn set_preferences(&self, user_id: UserId, prefs: Preferences) {
        self.preferences.lock().unwrap().insert(user_id, prefs);
    }

    /// Next `list_opportunities` calls fail with these errors, in order.
    pub fn fail_fetches(&self, errors: impl IntoIterator<Item = StoreError>) {
        self.fetch_faults.lock().unwrap().extend(errors);
    }

    pub fn fail_upserts(&self, errors: impl IntoIterator<Item = StoreError>) {
        self.upsert_faults.lock().unwrap().extend(errors);
    }

    pub fn swipes_for(&self, user_id: UserId) -> Vec<Swipe> {
        let mut swipes: Vec<Swipe> = self
            .swipes
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        swipes.sort_by_key(|s| s.opportunity_id);
        swipes
    }

    pub fn insert_swipe(&self, swipe: Swipe) {
        self.swipes
            .lock()
            .unwrap()
            .insert((swipe.user_id, swipe.opportunity_id), swipe);
    }
}

#[async_trait]
impl OpportunityStore for MemoryStore {
    async fn list_opportunities(
        &self,
        filter: &OpportunityFilter,
    ) -> Result<Vec<Opportunity>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        if let Some(err) = self.fetch_faults.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self
            .opportunities
            .lock()
            .unwrap()
            .iter()
            .filter(|o| filter.matches(o))
            .take(filter.limit)
            .cloned()
            .collect())
    }

    async fn get_opportunity(&self, id: OpportunityId) -> Result<Opportunity, StoreError> {
        self.opportunities
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("opportunity {id}")))
    }

    async fn list_swipes(&self, user_id: UserId) -> Result<Vec<Swipe>, StoreError> {
        Ok(self.swipes_for(user_id))
    }

    async fn find_swipe(
        &self,
        user_id: UserId,
        opportunity_id: OpportunityId,
    ) -> Result<Option<Swipe>, StoreError> {
        Ok(self
            .swipes
            .lock()
            .unwrap()
            .get(&(user_id, opportunity_id))
            .cloned())
    }

    async fn count_swipes_since(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        Ok(self
            .swipes
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id && s.created_at >= since)
            .count() as i64)
    }

    async fn upsert_swipe(&self, record: &SwipeUpsert) -> Result<Swipe, StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.upsert_faults.lock().unwrap().pop_front() {
            return Err(err);
        }
        let mut swipes = self.swipes.lock().unwrap();
        let swipe = swipes
            .entry((record.user_id, record.opportunity_id))
            .and_modify(|s| {
                s.action = record.action;
                s.updated_at = record.updated_at;
            })
            .or_insert_with(|| Swipe {
                id: self.next_swipe_id.fetch_add(1, Ordering::SeqCst) as SwipeId + 1,
                user_id: record.user_id,
                opportunity_id: record.opportunity_id,
                action: record.action,
                created_at: record.updated_at,
                updated_at: record.updated_at,
            });
        Ok(swipe.clone())
    }

    async fn delete_swipe(&self, user_id: UserId, swipe_id: SwipeId) -> Result<bool, StoreError> {
        let mut swipes = self.swipes.lock().unwrap();
        let before = swipes.len();
        swipes.retain(|_, s| !(s.id == swipe_id && s.user_id == user_id));
        Ok(swipes.len() < before)
    }

    async fn get_preferences(&self, user_id: UserId) -> Result<Preferences, StoreError> {
        Ok(self
            .preferences
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_profile(&self, user_id: UserId) -> Result<UserProfile, StoreError> {
        self.profiles
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("profile for user {user_id}")))
    }
}
