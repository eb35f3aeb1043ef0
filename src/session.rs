// cartela/src/session.rs
// Session controller: owns the call sequence, the card store and the pattern
// configuration, and moves between idle, running, paused and exhausted.

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::board::CalledSet;
use crate::card::{Card, CardStore};
use crate::defs::{MIN_CALLS_FOR_CHECK, Number};
use crate::errors::{GameError, SessionError};
use crate::logging::{LogLevel, log_with_context};
use crate::pattern::PatternConfig;
use crate::pouch::CallSequence;
use crate::score::Evaluation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Exhausted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Result of a check request: the card as stored and its evaluation
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub card: Card,
    pub evaluation: Evaluation,
    /// The check paused a running session
    pub paused: bool,
}

fn new_session_id() -> String {
    let mut rng = rand::rng();
    format!("session_{:08x}", rng.random::<u32>())
}

pub struct SessionController {
    id: String,
    created_at: SystemTime,
    state: SessionState,
    sequence: CallSequence,
    cards: CardStore,
    patterns: PatternConfig,
}

impl SessionController {
    pub fn new(cards: CardStore, patterns: PatternConfig) -> Self {
        Self::with_sequence(cards, patterns, CallSequence::generate())
    }

    pub fn with_sequence(cards: CardStore, patterns: PatternConfig, sequence: CallSequence) -> Self {
        SessionController {
            id: new_session_id(),
            created_at: SystemTime::now(),
            state: SessionState::Idle,
            sequence,
            cards,
            patterns,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at_string(&self) -> String {
        let datetime: DateTime<Utc> = self.created_at.into();
        datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sequence(&self) -> &CallSequence {
        &self.sequence
    }

    pub fn cards(&self) -> &CardStore {
        &self.cards
    }

    pub fn patterns(&self) -> &PatternConfig {
        &self.patterns
    }

    pub fn set_patterns(&mut self, patterns: PatternConfig) {
        self.patterns = patterns;
    }

    pub fn call_count(&self) -> usize {
        self.sequence.cursor()
    }

    pub fn current_number(&self) -> Option<Number> {
        self.sequence.current()
    }

    pub fn can_check(&self) -> bool {
        self.call_count() >= MIN_CALLS_FOR_CHECK
    }

    pub fn can_start(&self) -> bool {
        matches!(self.state, SessionState::Idle | SessionState::Exhausted)
    }

    fn log(&self, message: &str) {
        log_with_context(LogLevel::Info, &self.id, message);
    }

    fn invalid(&self, action: &'static str) -> GameError {
        SessionError::InvalidTransition { from: self.state, action }.into()
    }

    /// Begin calling from the first ball and reveal it immediately.
    pub fn start(&mut self) -> Result<Option<Number>, GameError> {
        match self.state {
            SessionState::Idle | SessionState::Exhausted => {}
            _ => return Err(self.invalid("start")),
        }
        if self.sequence.is_exhausted() || self.sequence.is_empty() {
            self.sequence = CallSequence::generate();
        }
        self.sequence.rewind();
        self.state = SessionState::Running;
        self.log("Calling started");
        Ok(self.tick())
    }

    pub fn pause(&mut self) -> Result<(), GameError> {
        if self.state != SessionState::Running {
            return Err(self.invalid("pause"));
        }
        self.state = SessionState::Paused;
        self.log(&format!("Paused after {} calls", self.call_count()));
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), GameError> {
        if self.state != SessionState::Paused {
            return Err(self.invalid("resume"));
        }
        self.state = SessionState::Running;
        self.log("Resumed");
        Ok(())
    }

    /// Timer step. Reveals the next ball only while running.
    pub fn tick(&mut self) -> Option<Number> {
        if self.state != SessionState::Running {
            return None;
        }
        let number = self.sequence.advance();
        if self.sequence.is_exhausted() {
            self.state = SessionState::Exhausted;
            self.log("All numbers called");
        }
        number
    }

    /// Back to idle with a fresh, uncalled sequence.
    pub fn reset(&mut self) {
        self.sequence = CallSequence::generate();
        self.state = SessionState::Idle;
        self.log("Session reset");
    }

    /// Evaluate a card against the numbers called so far. Pauses a running session first.
    pub fn check(&mut self, card_id: &str) -> Result<CheckOutcome, GameError> {
        if !self.can_check() {
            return Err(SessionError::CheckUnavailable {
                called: self.call_count(),
                required: MIN_CALLS_FOR_CHECK,
            }
            .into());
        }
        let paused = self.state == SessionState::Running;
        if paused {
            self.pause()?;
        }

        let card = self.cards.get_card(card_id)?.clone();
        let called = CalledSet::from_numbers(self.sequence.called());
        let evaluation = Evaluation::evaluate(&card, &called, &self.patterns);
        self.log(&format!(
            "Card {} checked: {} of {} lines, {}",
            card.id,
            evaluation.eligible_count,
            evaluation.required_lines,
            if evaluation.is_winner { "winner" } else { "no win" }
        ));
        Ok(CheckOutcome { card, evaluation, paused })
    }

    pub fn session_info(&self) -> String {
        format!(
            "Session[id={}, created={}, state={}, called={}, cards={}, active={}]",
            self.id,
            self.created_at_string(),
            self.state,
            self.call_count(),
            self.cards.len(),
            self.cards.active_ids().len()
        )
    }
}
