//! Live feed sessions keyed by id, shared by the HTTP handlers.
//!
//! Sessions a client never closes are torn down by `evict_idle`, which the
//! sweeper task runs on an interval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::decision::session::{FeedEvent, FeedSession};

pub struct SessionHandle {
    pub session: Arc<FeedSession>,
    events: Mutex<mpsc::UnboundedReceiver<FeedEvent>>,
    last_seen: std::sync::Mutex<Instant>,
}

impl SessionHandle {
    pub fn new(session: FeedSession, events: mpsc::UnboundedReceiver<FeedEvent>) -> Self {
        Self {
            session: Arc::new(session),
            events: Mutex::new(events),
            last_seen: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Everything emitted since the last drain, oldest first.
    pub async fn drain_events(&self) -> Vec<FeedEvent> {
        let mut rx = self.events.lock().await;
        let mut drained = Vec::new();
        while let Ok(event) = rx.try_recv() {
            drained.push(event);
        }
        drained
    }

    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last_seen = *self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        now.saturating_duration_since(last_seen)
    }
}

#[derive(Default, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionHandle>>>>,
}

impl SessionRegistry {
    pub async fn insert(&self, handle: SessionHandle) -> (Uuid, Arc<SessionHandle>) {
        let id = Uuid::new_v4();
        let handle = Arc::new(handle);
        self.sessions.write().await.insert(id, handle.clone());
        (id, handle)
    }

    /// Looks a session up and marks it as in use.
    pub async fn get(&self, id: Uuid) -> Option<Arc<SessionHandle>> {
        let handle = self.sessions.read().await.get(&id).cloned()?;
        handle.touch();
        Some(handle)
    }

    pub async fn remove(&self, id: Uuid) -> Option<Arc<SessionHandle>> {
        self.sessions.write().await.remove(&id)
    }

    /// Drops every session untouched for at least `idle`, letting its pending
    /// writes finish. Returns how many were evicted.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let now = Instant::now();
        let (evicted, live) = {
            let mut sessions = self.sessions.write().await;
            let stale: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, h)| h.idle_for(now) >= idle)
                .map(|(id, _)| *id)
                .collect();
            let evicted: Vec<Arc<SessionHandle>> = stale
                .iter()
                .filter_map(|id| sessions.remove(id))
                .collect();
            (evicted, sessions.len())
        };

        for handle in &evicted {
            handle.session.teardown();
            handle.session.flush().await;
        }
        if !evicted.is_empty() {
            info!("Evicted {} idle feed sessions, {live} still open", evicted.len());
        }
        evicted.len()
    }

    /// Runs `evict_idle` every `every` until the runtime shuts down.
    pub fn spawn_sweeper(&self, idle: Duration, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                registry.evict_idle(idle).await;
            }
        })
    }
}
