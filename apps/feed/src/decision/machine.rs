//! The card deck as an explicit state machine. Gesture code only calls
//! `swipe`, `apply_explicit`, `undo` and `settle`; it never touches the queue
//! or the index directly.
//!
//! The queue is consumed from the end: a fresh load starts at `len - 1`.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::decision::undo::{UndoBuffer, UndoEntry};
use crate::models::opportunity::{FeedCard, OpportunityId};
use crate::models::swipe::{SwipeAction, SwipeDirection};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeckState {
    Empty,
    Loading,
    Ready { index: usize },
    Exhausted,
    Failed { message: String, retryable: bool },
}

/// What the persister should write for a committed decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistIntent {
    pub opportunity_id: OpportunityId,
    pub action: SwipeAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub intent: PersistIntent,
    /// The swipe consumed the last card.
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Rejected {
    #[error("no active card")]
    NoActiveCard,

    #[error("previous swipe is still settling")]
    Settling,

    #[error("opportunity {0} is not the active card")]
    NotActive(OpportunityId),
}

#[derive(Debug)]
pub struct DecisionStateMachine {
    state: DeckState,
    cards: Vec<FeedCard>,
    undo: UndoBuffer,
    /// Decided in this session; kept out of any queue loaded later.
    decided: HashSet<OpportunityId>,
    settling_since: Option<Instant>,
    settle_window: Duration,
}

impl DecisionStateMachine {
    pub fn new(undo_depth: usize, settle_window: Duration) -> Self {
        Self {
            state: DeckState::Empty,
            cards: Vec::new(),
            undo: UndoBuffer::new(undo_depth),
            decided: HashSet::new(),
            settling_since: None,
            settle_window,
        }
    }

    pub fn state(&self) -> &DeckState {
        &self.state
    }

    pub fn cards(&self) -> &[FeedCard] {
        &self.cards
    }

    pub fn has_cards(&self) -> bool {
        !self.cards.is_empty()
    }

    pub fn active_card(&self) -> Option<&FeedCard> {
        match self.state {
            DeckState::Ready { index } => self.cards.get(index),
            _ => None,
        }
    }

    /// Cards already on screen stay up while a refresh runs. Returns the state
    /// to go back to if the load is abandoned.
    pub fn begin_loading(&mut self) -> DeckState {
        let previous = self.state.clone();
        if !matches!(self.state, DeckState::Ready { .. }) {
            self.state = DeckState::Loading;
        }
        previous
    }

    /// Leaves `Loading` for the state held before `begin_loading`. No effect
    /// once a load or failure has replaced it.
    pub fn cancel_loading(&mut self, previous: DeckState) {
        if self.state == DeckState::Loading {
            self.state = previous;
        }
    }

    /// Replaces the queue. Returns `true` when nothing is left to show.
    pub fn load(&mut self, cards: Vec<FeedCard>) -> bool {
        self.cards = cards
            .into_iter()
            .filter(|c| !self.decided.contains(&c.id()))
            .collect();
        self.undo.clear();
        self.settling_since = None;

        match self.cards.len() {
            0 => {
                self.state = DeckState::Exhausted;
                true
            }
            n => {
                self.state = DeckState::Ready { index: n - 1 };
                false
            }
        }
    }

    /// Terminal load failure with nothing to show.
    pub fn fail(&mut self, message: impl Into<String>, retryable: bool) {
        self.state = DeckState::Failed {
            message: message.into(),
            retryable,
        };
    }

    pub fn swipe(&mut self, direction: SwipeDirection, now: Instant) -> Result<Transition, Rejected> {
        self.advance(direction.action(), now)
    }

    /// The explicit "Apply" affordance: a right swipe recorded as `Interested`.
    pub fn apply_explicit(
        &mut self,
        opportunity_id: OpportunityId,
        now: Instant,
    ) -> Result<Transition, Rejected> {
        match self.active_card().map(FeedCard::id) {
            Some(active) if active == opportunity_id => self.advance(SwipeAction::Interested, now),
            Some(_) => Err(Rejected::NotActive(opportunity_id)),
            None => Err(Rejected::NoActiveCard),
        }
    }

    /// View-layer reversal of the most recent swipe. The persisted decision is
    /// left alone; a different swipe afterwards overwrites it.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.undo.pop() else {
            return false;
        };
        let still_there = self
            .cards
            .get(entry.previous_index)
            .is_some_and(|c| c.id() == entry.opportunity_id);
        if !still_there {
            return false;
        }

        self.decided.remove(&entry.opportunity_id);
        self.settling_since = None;
        self.state = DeckState::Ready {
            index: entry.previous_index,
        };
        true
    }

    /// Exit transition finished; the next gesture is accepted.
    pub fn settle(&mut self) {
        self.settling_since = None;
    }

    pub fn is_settling(&self, now: Instant) -> bool {
        self.settling_since
            .is_some_and(|since| now.duration_since(since) < self.settle_window)
    }

    fn advance(&mut self, action: SwipeAction, now: Instant) -> Result<Transition, Rejected> {
        let DeckState::Ready { index } = self.state else {
            return Err(Rejected::NoActiveCard);
        };
        if self.is_settling(now) {
            return Err(Rejected::Settling);
        }
        let opportunity_id = self.cards[index].id();

        self.undo.push(UndoEntry {
            opportunity_id,
            previous_index: index,
        });
        self.decided.insert(opportunity_id);
        self.settling_since = Some(now);

        let exhausted = index == 0;
        self.state = if exhausted {
            DeckState::Exhausted
        } else {
            DeckState::Ready { index: index - 1 }
        };

        Ok(Transition {
            intent: PersistIntent {
                opportunity_id,
                action,
            },
            exhausted,
        })
    }
}
