//! Practice session state machine.
//!
//! A session walks the due queue computed at start, one phrase at a time:
//! prompt, then pronunciation, then unit-by-unit reveal of the target text,
//! then a rating. Ratings are the only point where phrases are mutated.

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::phrase::{Phrase, PhraseId, Rating};
use crate::reveal::{mask, RevealUnits};
use crate::scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum RevealState {
    Loading,
    ShowPrompt,
    ShowPronunciation,
    Revealing,
    RatingReady,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Due queue computed
    Loaded,
    Reveal,
    Rate(Rating),
}

/// Reveal progress of the current phrase and what lies behind it in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionInput {
    pub revealed: usize,
    pub total_units: usize,
    /// Whether a phrase is queued after the current one has been handled.
    pub has_next: bool,
}

/// Pure transition function: `(state, event) -> (state, revealed count)`.
///
/// Events that do not apply to `state` leave it and the count unchanged.
pub fn transition(
    state: RevealState,
    event: SessionEvent,
    input: TransitionInput,
) -> (RevealState, usize) {
    use RevealState::*;

    match (state, event) {
        (Loading, SessionEvent::Loaded) => {
            if input.has_next {
                (ShowPrompt, 0)
            } else {
                (Empty, 0)
            }
        }
        (ShowPrompt, SessionEvent::Reveal) => (ShowPronunciation, input.revealed),
        (ShowPronunciation, SessionEvent::Reveal) => {
            if input.total_units == 0 {
                (RatingReady, 0)
            } else {
                (Revealing, 0)
            }
        }
        (Revealing, SessionEvent::Reveal) => {
            let revealed = (input.revealed + 1).min(input.total_units);
            if revealed == input.total_units {
                (RatingReady, revealed)
            } else {
                (Revealing, revealed)
            }
        }
        (RatingReady, SessionEvent::Rate(_)) => {
            if input.has_next {
                (ShowPrompt, 0)
            } else {
                (Empty, 0)
            }
        }
        (state, _) => (state, input.revealed),
    }
}

/// Shown once the queue is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptySummary {
    pub next_due_at: Option<DateTime<Utc>>,
    /// No phrases at all, as opposed to all caught up
    pub collection_empty: bool,
}

/// Snapshot of a session handed to hosts after every operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub reveal_state: RevealState,
    pub current: Option<PhraseId>,
    pub revealed_unit_count: usize,
    pub total_units: usize,
    /// Queued phrases including the current one
    pub remaining: usize,
    pub empty: Option<EmptySummary>,
}

impl SessionState {
    pub fn is_finished(&self) -> bool {
        self.reveal_state == RevealState::Empty
    }
}

pub struct Session<'a> {
    phrases: &'a mut [Phrase],
    unit_rule: &'a dyn RevealUnits,
    due_queue: Vec<usize>,
    reveal_state: RevealState,
    revealed_unit_count: usize,
    units: Vec<String>,
    reviewed: Vec<PhraseId>,
    last_now: DateTime<Utc>,
}

impl<'a> Session<'a> {
    /// Computes the due queue once and moves to the first phrase, if any.
    pub fn start(
        phrases: &'a mut [Phrase],
        now: DateTime<Utc>,
        unit_rule: &'a dyn RevealUnits,
    ) -> Self {
        let due_queue = scheduler::due_indices(phrases, now);
        info!(
            "session started: {} due of {} phrases",
            due_queue.len(),
            phrases.len()
        );

        let mut session = Self {
            phrases,
            unit_rule,
            due_queue,
            reveal_state: RevealState::Loading,
            revealed_unit_count: 0,
            units: Vec::new(),
            reviewed: Vec::new(),
            last_now: now,
        };
        session.apply(SessionEvent::Loaded);
        session
    }

    /// Advances the reveal by one step. No-op outside the reveal states.
    pub fn advance_reveal(&mut self) -> SessionState {
        self.apply(SessionEvent::Reveal);
        self.state()
    }

    /// Rates the current phrase once every unit is revealed, then moves on.
    ///
    /// The rated phrase leaves the queue for the rest of this session even
    /// when its new due time falls within it.
    pub fn submit_rating(&mut self, rating: Rating, now: DateTime<Utc>) -> SessionState {
        if self.reveal_state != RevealState::RatingReady {
            debug!("rating ignored in state {}", self.reveal_state);
            return self.state();
        }
        let Some(idx) = self.current_index() else {
            return self.state();
        };

        scheduler::apply_rating(&mut self.phrases[idx], rating, now);
        let id = self.phrases[idx].id;
        self.reviewed.push(id);
        self.last_now = now;

        let phrases = &*self.phrases;
        self.due_queue.retain(|&queued| phrases[queued].id != id);

        self.apply(SessionEvent::Rate(rating));
        if self.reveal_state == RevealState::Empty {
            info!("session finished: {} phrases reviewed", self.reviewed.len());
        }
        self.state()
    }

    pub fn state(&self) -> SessionState {
        let empty = (self.reveal_state == RevealState::Empty).then(|| EmptySummary {
            next_due_at: scheduler::next_due_time(&*self.phrases, self.last_now),
            collection_empty: self.phrases.is_empty(),
        });

        SessionState {
            reveal_state: self.reveal_state,
            current: self.current_phrase().map(|p| p.id),
            revealed_unit_count: self.revealed_unit_count,
            total_units: self.units.len(),
            remaining: self.due_queue.len(),
            empty,
        }
    }

    pub fn reveal_state(&self) -> RevealState {
        self.reveal_state
    }

    pub fn current_phrase(&self) -> Option<&Phrase> {
        self.current_index().map(|idx| &self.phrases[idx])
    }

    /// Units with the unrevealed ones replaced by `placeholder`.
    pub fn masked_units(&self, placeholder: &str) -> Vec<String> {
        mask(&self.units, self.revealed_unit_count, placeholder)
    }

    /// Phrases rated so far, in rating order.
    pub fn reviewed(&self) -> &[PhraseId] {
        &self.reviewed
    }

    pub fn phrases(&self) -> &[Phrase] {
        &*self.phrases
    }

    fn current_index(&self) -> Option<usize> {
        match self.reveal_state {
            RevealState::Loading | RevealState::Empty => None,
            _ => self.due_queue.first().copied(),
        }
    }

    fn apply(&mut self, event: SessionEvent) {
        let has_next = !self.due_queue.is_empty();
        let input = TransitionInput {
            revealed: self.revealed_unit_count,
            total_units: self.units.len(),
            has_next,
        };
        let before = self.reveal_state;
        let (state, revealed) = transition(before, event, input);

        if before != state && state == RevealState::ShowPrompt {
            self.units = self
                .due_queue
                .first()
                .map(|&idx| self.unit_rule.units(&self.phrases[idx].target_text))
                .unwrap_or_default();
        } else if state == RevealState::Empty {
            self.units.clear();
        }

        self.reveal_state = state;
        self.revealed_unit_count = revealed;
    }
}
