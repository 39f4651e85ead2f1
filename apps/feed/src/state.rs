use std::sync::Arc;

use crate::config::FeedSettings;
use crate::decision::persister::ActionPersister;
use crate::decision::registry::SessionRegistry;
use crate::feed::cache::FeedCache;
use crate::feed::loader::FeedLoader;
use crate::scoring::MatchScorer;
use crate::store::OpportunityStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OpportunityStore>,
    /// Pluggable match scorer. Default: RuleBasedScorer.
    pub scorer: Arc<dyn MatchScorer>,
    pub loader: Arc<FeedLoader>,
    pub persister: Arc<ActionPersister>,
    pub sessions: SessionRegistry,
    pub feed: FeedSettings,
}

impl AppState {
    pub fn new(
        store: Arc<dyn OpportunityStore>,
        cache: Arc<dyn FeedCache>,
        scorer: Arc<dyn MatchScorer>,
        feed: FeedSettings,
    ) -> Self {
        let loader = Arc::new(FeedLoader::new(
            store.clone(),
            cache,
            scorer.clone(),
            feed.clone(),
        ));
        let persister = Arc::new(ActionPersister::new(store.clone(), feed.daily_swipe_limit));
        Self {
            store,
            scorer,
            loader,
            persister,
            sessions: SessionRegistry::default(),
            feed,
        }
    }
}
