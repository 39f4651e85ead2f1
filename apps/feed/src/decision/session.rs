//! One user's feed session: the surface the presentation layer talks to.
//!
//! Loads and persistence writes run concurrently with gestures but never
//! block them. Failures surface as `FeedEvent`s on the session's channel.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::FeedSettings;
use crate::decision::machine::{DecisionStateMachine, DeckState, Rejected, Transition};
use crate::decision::persister::{ActionPersister, SwipeCommit};
use crate::feed::loader::{FeedLoader, LoadError, Liveness};
use crate::models::opportunity::{FeedCard, OpportunityId};
use crate::models::preferences::Preferences;
use crate::models::profile::{UserId, UserProfile};
use crate::models::swipe::SwipeDirection;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    QueueExhausted,
    /// `retryable` errors replace the deck with a retry screen; the rest are toasts.
    Error { message: String, retryable: bool },
}

pub struct FeedSession {
    user_id: UserId,
    profile: UserProfile,
    machine: Mutex<DecisionStateMachine>,
    loader: Arc<FeedLoader>,
    persister: Arc<ActionPersister>,
    events: mpsc::UnboundedSender<FeedEvent>,
    liveness: Liveness,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl FeedSession {
    pub fn new(
        profile: UserProfile,
        loader: Arc<FeedLoader>,
        persister: Arc<ActionPersister>,
        settings: &FeedSettings,
    ) -> (Self, mpsc::UnboundedReceiver<FeedEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            user_id: profile.id,
            profile,
            machine: Mutex::new(DecisionStateMachine::new(
                settings.undo_depth,
                settings.settle_window,
            )),
            loader,
            persister,
            events,
            liveness: Liveness::default(),
            in_flight: Mutex::new(Vec::new()),
        };
        (session, rx)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Cache hydration followed by a refresh from the source.
    pub async fn load(&self, prefs: &Preferences) {
        self.hydrate().await;
        self.refresh(prefs).await;
    }

    /// Shows the cached queue, if any, before any network activity.
    /// Returns whether cached cards are on screen.
    pub async fn hydrate(&self) -> bool {
        if !self.liveness.is_alive() {
            return false;
        }
        self.machine().begin_loading();
        let cards = self.loader.hydrate(self.user_id, &self.profile).await;
        if cards.is_empty() || !self.liveness.is_alive() {
            return false;
        }
        self.machine().load(cards);
        true
    }

    pub async fn refresh(&self, prefs: &Preferences) {
        if !self.liveness.is_alive() {
            return;
        }
        let previous = self.machine().begin_loading();

        let result = self
            .loader
            .refresh(self.user_id, prefs, &self.profile, &self.liveness)
            .await;

        if !self.liveness.is_alive() {
            return;
        }

        match result {
            Ok(cards) => {
                let exhausted = self.machine().load(cards);
                if exhausted {
                    self.emit(FeedEvent::QueueExhausted);
                }
            }
            Err(LoadError::Cancelled) => {}
            Err(e) => {
                let mut machine = self.machine();
                let event = if machine.active_card().is_some() {
                    warn!("Refresh failed for user {}, keeping cached feed: {e}", self.user_id);
                    FeedEvent::Error {
                        message: "Couldn't refresh your feed. Showing saved results.".to_string(),
                        retryable: false,
                    }
                } else if previous == DeckState::Exhausted {
                    warn!("Refresh failed for user {} after the queue ran out: {e}", self.user_id);
                    machine.cancel_loading(previous);
                    FeedEvent::Error {
                        message: "Couldn't refresh your feed.".to_string(),
                        retryable: false,
                    }
                } else {
                    warn!("Feed load failed for user {}: {e}", self.user_id);
                    let message = "Failed to load feed".to_string();
                    machine.fail(message.clone(), true);
                    FeedEvent::Error {
                        message,
                        retryable: true,
                    }
                };
                drop(machine);
                self.emit(event);
            }
        }
    }

    /// Runs `refresh` in the background. `flush` waits for it.
    pub fn spawn_refresh(self: &Arc<Self>, prefs: Preferences) {
        let session = self.clone();
        let handle = tokio::spawn(async move { session.refresh(&prefs).await });
        self.track(handle);
    }

    pub fn state(&self) -> DeckState {
        self.machine().state().clone()
    }

    pub fn active_card(&self) -> Option<FeedCard> {
        self.machine().active_card().cloned()
    }

    /// Ignored while the previous card is still leaving the stack.
    pub fn swipe(&self, direction: SwipeDirection) -> bool {
        let result = self.machine().swipe(direction, Instant::now());
        self.after_gesture(result)
    }

    pub fn apply_explicit(&self, opportunity_id: OpportunityId) -> bool {
        let result = self.machine().apply_explicit(opportunity_id, Instant::now());
        self.after_gesture(result)
    }

    /// Restores the previous card. Makes no store call.
    pub fn undo(&self) -> bool {
        let undone = self.machine().undo();
        if undone {
            debug!("User {} undid last swipe", self.user_id);
        }
        undone
    }

    pub fn settle(&self) {
        self.machine().settle();
    }

    /// Stops any in-flight load from touching session state. Writes already
    /// spawned still run to completion.
    pub fn teardown(&self) {
        info!("Tearing down feed session for user {}", self.user_id);
        self.liveness.shut_down();
    }

    /// Waits for every spawned refresh and persistence write.
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.in_flight());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Persistence task for user {} panicked: {e}", self.user_id);
            }
        }
    }

    fn after_gesture(&self, result: Result<Transition, Rejected>) -> bool {
        match result {
            Ok(transition) => {
                if transition.exhausted {
                    self.emit(FeedEvent::QueueExhausted);
                }
                self.spawn_commit(transition);
                true
            }
            Err(rejected) => {
                debug!("Ignoring gesture from user {}: {rejected}", self.user_id);
                false
            }
        }
    }

    fn spawn_commit(&self, transition: Transition) {
        let commit = SwipeCommit {
            user_id: self.user_id,
            opportunity_id: transition.intent.opportunity_id,
            action: transition.intent.action,
        };
        let persister = self.persister.clone();
        let events = self.events.clone();
        let liveness = self.liveness.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = persister.commit(&commit).await {
                warn!(
                    "Failed to persist {} on opportunity {} for user {}: {e}",
                    commit.action, commit.opportunity_id, commit.user_id
                );
                let toast = FeedEvent::Error {
                    message: format!("Failed to record swipe: {e}"),
                    retryable: false,
                };
                if liveness.is_alive() && events.send(toast).is_err() {
                    debug!("No listener for feed events of user {}", commit.user_id);
                }
            }
        });
        self.track(handle);
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut in_flight = self.in_flight();
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    fn emit(&self, event: FeedEvent) {
        if self.events.send(event).is_err() {
            debug!("No listener for feed events of user {}", self.user_id);
        }
    }

    fn machine(&self) -> MutexGuard<'_, DecisionStateMachine> {
        self.machine.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn in_flight(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }
}
