//! The combat state machine.
//!
//! One `CombatState` value is the entire shared document: every operation
//! reads the current value and rewrites it in place, and the hosting layer
//! replicates the whole document last-writer-wins to every client.
//!
//! # State Diagram
//!
//! ```text
//!              start
//! ┌──────────┐──────▶┌───────────┐
//! │ Inactive │       │  Drawing  │◀────────────────┐
//! └──────────┘◀──┐   └─────┬─────┘                 │
//!       ▲        │         │ start_round           │ new_round
//!       │        │         ▼                       │
//!       │        │   ┌───────────┐  act (last) ┌───┴───────────┐
//!       │        │   │  Active   │────────────▶│ RoundComplete │
//!       │        │   └─────┬─────┘             └───────┬───────┘
//!       │        │         │ act / swap                │
//!       │        │         ▼                           │
//!       │        │    (same phase)                     │
//!       │        └─────────┴───────────────────────────┘
//!       └──────────────────── end (from any phase)
//! ```
//!
//! The wait/swap sub-protocol lives inside the Active phase and never changes
//! the phase itself; only card values, statuses, and the turn index move.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::deck;
use super::participant::{Participant, ParticipantStatus, RosterPlayer, TokenInfo};

/// Room-metadata key the combat document is stored under. Clearing the key
/// ends combat for every client.
pub const METADATA_KEY: &str = "com.dragonbane-initiative/combat-state";

/// Combat macro-phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombatPhase {
    /// Participants are drawing initiative cards
    #[default]
    Drawing,
    /// Turns are being taken in card order
    Active,
    /// Every participant has acted; waiting for the next round
    RoundComplete,
}

impl CombatPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drawing => "drawing",
            Self::Active => "active",
            Self::RoundComplete => "round_complete",
        }
    }
}

/// The replicated combat document.
///
/// `Default` is the inactive, empty value every client falls back to when the
/// document is absent. `current_turn_index` points into the derived
/// [`turn order`](CombatState::turn_order), never into `participants`
/// directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatState {
    /// Whether a combat is in progress
    pub is_active: bool,

    /// Current macro-phase
    pub phase: CombatPhase,

    /// 0 before the first combat, incremented each new round
    pub round_number: u32,

    /// Entries in add order; turn order is derived, not stored
    pub participants: Vec<Participant>,

    /// Index into the derived turn-order view
    pub current_turn_index: usize,

    /// Cards allocated to some participant this round
    pub drawn_cards: BTreeSet<u8>,

    /// When this combat was started
    pub started_at: Option<DateTime<Utc>>,
}

impl CombatState {
    /// The inactive empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The derived turn-order view: participants holding a card, ascending by
    /// card value. Recomputed on every call; callers must never cache it
    /// across a mutation.
    pub fn turn_order(&self) -> Vec<&Participant> {
        let mut order: Vec<&Participant> = self
            .participants
            .iter()
            .filter(|p| p.has_card())
            .collect();
        order.sort_by_key(|p| p.initiative_card.unwrap_or(0));
        order
    }

    /// The participant whose turn it is, per the freshly derived turn order.
    pub fn current_participant(&self) -> Option<&Participant> {
        self.turn_order().get(self.current_turn_index).copied()
    }

    /// Look up a participant by ID.
    pub fn get_participant(&self, id: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Check whether every participant holds a card.
    pub fn all_cards_drawn(&self) -> bool {
        self.participants.iter().all(Participant::has_card)
    }

    /// Start a new combat from the selected tokens.
    ///
    /// Replaces the whole document: round 1, empty card pool, one pending
    /// participant per token (resolution rules in
    /// [`Participant::from_token`]).
    pub fn start(
        &mut self,
        tokens: &[TokenInfo],
        roster: &[RosterPlayer],
    ) -> Result<(), CombatError> {
        if tokens.is_empty() {
            return Err(CombatError::EmptySelection);
        }

        *self = Self {
            is_active: true,
            phase: CombatPhase::Drawing,
            round_number: 1,
            participants: tokens
                .iter()
                .map(|t| Participant::from_token(t, roster))
                .collect(),
            current_turn_index: 0,
            drawn_cards: BTreeSet::new(),
            started_at: Some(Utc::now()),
        };
        Ok(())
    }

    /// Draw a card for one participant.
    ///
    /// Silent no-op when the participant is gone or already holds a card (the
    /// condition has already resolved itself from the caller's perspective).
    pub fn draw_card(&mut self, id: Uuid, rng: &mut StdRng) -> Result<(), CombatError> {
        if self.phase != CombatPhase::Drawing {
            return Err(CombatError::InvalidPhase);
        }

        let Some(pos) = self.participants.iter().position(|p| p.id == id) else {
            return Ok(());
        };
        if self.participants[pos].has_card() {
            return Ok(());
        }

        let card = deck::draw(&mut self.drawn_cards, rng).ok_or(CombatError::DeckExhausted)?;
        self.participants[pos].initiative_card = Some(card);
        Ok(())
    }

    /// Draw cards for every participant without one, against a single
    /// incrementally-updated pool.
    ///
    /// Checked up front: either every undrawn participant gets a card or the
    /// document is left untouched.
    pub fn draw_all(&mut self, rng: &mut StdRng) -> Result<(), CombatError> {
        if self.phase != CombatPhase::Drawing {
            return Err(CombatError::InvalidPhase);
        }

        let undrawn = self
            .participants
            .iter()
            .filter(|p| !p.has_card())
            .count();
        if undrawn > deck::remaining(&self.drawn_cards).len() {
            return Err(CombatError::DeckExhausted);
        }

        for p in &mut self.participants {
            if p.initiative_card.is_none() {
                if let Some(card) = deck::draw(&mut self.drawn_cards, rng) {
                    p.initiative_card = Some(card);
                }
            }
        }
        Ok(())
    }

    /// Begin taking turns. Requires every participant to hold a card; the
    /// lowest card acts first.
    pub fn start_round(&mut self) -> Result<(), CombatError> {
        if self.phase != CombatPhase::Drawing {
            return Err(CombatError::InvalidPhase);
        }
        if !self.all_cards_drawn() {
            return Err(CombatError::CardsOutstanding);
        }

        let first = self.turn_order().first().map(|p| p.id);
        for p in &mut self.participants {
            p.status = if Some(p.id) == first {
                ParticipantStatus::Active
            } else {
                ParticipantStatus::Pending
            };
        }
        self.phase = CombatPhase::Active;
        self.current_turn_index = 0;
        Ok(())
    }

    /// The current participant takes their turn.
    ///
    /// Marks them acted and activates the next in turn order, or flips to
    /// `RoundComplete` when they were last. No-op when the turn order is
    /// empty.
    pub fn act(&mut self) -> Result<(), CombatError> {
        if self.phase != CombatPhase::Active {
            return Err(CombatError::InvalidPhase);
        }

        let order: Vec<Uuid> = self.turn_order().into_iter().map(|p| p.id).collect();
        let Some(&current_id) = order.get(self.current_turn_index) else {
            return Ok(());
        };

        let next_index = self.current_turn_index + 1;
        let round_complete = next_index >= order.len();

        for p in &mut self.participants {
            if p.id == current_id {
                p.status = ParticipantStatus::Acted;
            } else if !round_complete && order[next_index] == p.id {
                p.status = ParticipantStatus::Active;
            }
        }

        if round_complete {
            self.phase = CombatPhase::RoundComplete;
            self.current_turn_index = 0;
        } else {
            self.current_turn_index = next_index;
        }
        Ok(())
    }

    /// Participants the current actor may swap initiative with: anyone who
    /// has not acted or waited and holds a strictly higher card (acts later
    /// this round).
    pub fn valid_swap_targets(&self) -> Vec<&Participant> {
        let order = self.turn_order();
        let Some(current) = order.get(self.current_turn_index) else {
            return Vec::new();
        };
        let current_id = current.id;
        let current_card = current.initiative_card.unwrap_or(0);

        order
            .into_iter()
            .filter(|p| {
                p.id != current_id
                    && p.status != ParticipantStatus::Acted
                    && p.status != ParticipantStatus::Waited
                    && p.initiative_card.unwrap_or(0) > current_card
            })
            .collect()
    }

    /// Resolve a wait: the current actor exchanges cards with the target.
    ///
    /// The waiter takes the target's higher card and is marked waited; the
    /// target takes the waiter's lower card and acts immediately. The turn
    /// index is re-derived from the new sort by locating the active
    /// participant, since the card exchange changes the order.
    pub fn execute_swap(&mut self, target_id: Uuid) -> Result<(), CombatError> {
        if self.phase != CombatPhase::Active {
            return Err(CombatError::InvalidPhase);
        }
        let Some(current) = self.current_participant() else {
            return Ok(());
        };
        let current_id = current.id;

        if self.get_participant(target_id).is_none() {
            // Target removed by another client; nothing left to swap with.
            return Ok(());
        }
        if !self.valid_swap_targets().iter().any(|p| p.id == target_id) {
            return Err(CombatError::InvalidSwapTarget);
        }

        let waiter_card = self
            .get_participant(current_id)
            .and_then(|p| p.initiative_card);
        let target_card = self
            .get_participant(target_id)
            .and_then(|p| p.initiative_card);
        let (Some(waiter_card), Some(target_card)) = (waiter_card, target_card) else {
            return Ok(());
        };

        for p in &mut self.participants {
            if p.id == current_id {
                p.initiative_card = Some(target_card);
                p.status = ParticipantStatus::Waited;
            } else if p.id == target_id {
                p.initiative_card = Some(waiter_card);
                p.status = ParticipantStatus::Active;
            }
        }

        let index = self
            .turn_order()
            .iter()
            .position(|p| p.status == ParticipantStatus::Active)
            .unwrap_or(0);
        self.current_turn_index = index;
        Ok(())
    }

    /// Move from a completed round back to drawing: cards and statuses clear,
    /// the pool resets, and the round number increments.
    pub fn new_round(&mut self) -> Result<(), CombatError> {
        if self.phase != CombatPhase::RoundComplete {
            return Err(CombatError::InvalidPhase);
        }

        for p in &mut self.participants {
            p.initiative_card = None;
            p.status = ParticipantStatus::Pending;
        }
        self.phase = CombatPhase::Drawing;
        self.round_number += 1;
        self.current_turn_index = 0;
        self.drawn_cards.clear();
        Ok(())
    }

    /// End combat, resetting the document to the inactive empty value.
    pub fn end(&mut self) {
        *self = Self::default();
    }

    /// Check the document's data-integrity invariants.
    ///
    /// A failure here means some operation corrupted the shared document; the
    /// only safe recovery is a full combat reset via [`CombatState::end`].
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let mut held = BTreeSet::new();
        for p in &self.participants {
            if let Some(card) = p.initiative_card {
                if !(deck::LOWEST_CARD..=deck::HIGHEST_CARD).contains(&card) {
                    return Err(IntegrityError::CardOutOfRange(card));
                }
                if !held.insert(card) {
                    return Err(IntegrityError::DuplicateCard(card));
                }
            }
        }
        if held != self.drawn_cards {
            return Err(IntegrityError::PoolMismatch);
        }

        let len = self.turn_order().len();
        if self.current_turn_index != 0 && self.current_turn_index >= len {
            return Err(IntegrityError::IndexOutOfBounds {
                index: self.current_turn_index,
                len,
            });
        }
        Ok(())
    }

    /// Serialize to the JSON value stored under [`METADATA_KEY`].
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Deserialize the document read from room metadata.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Errors surfaced to the initiating client as warnings. No variant leaves
/// the document modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatError {
    EmptySelection,
    InvalidPhase,
    DeckExhausted,
    CardsOutstanding,
    NoSwapTargets,
    InvalidSwapTarget,
    AlreadyInCombat,
}

impl fmt::Display for CombatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySelection => write!(f, "Select tokens to add to combat"),
            Self::InvalidPhase => write!(f, "Invalid combat phase for this action"),
            Self::DeckExhausted => write!(f, "No initiative cards remaining"),
            Self::CardsOutstanding => write!(f, "Every participant must draw a card first"),
            Self::NoSwapTargets => write!(f, "No valid swap targets"),
            Self::InvalidSwapTarget => write!(f, "That participant cannot swap initiative"),
            Self::AlreadyInCombat => write!(f, "Selected tokens are already in combat"),
        }
    }
}

impl std::error::Error for CombatError {}

/// Data-integrity faults. Unlike [`CombatError`], these indicate the shared
/// document itself is corrupt and needs a full reset, not a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityError {
    DuplicateCard(u8),
    CardOutOfRange(u8),
    PoolMismatch,
    IndexOutOfBounds { index: usize, len: usize },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCard(card) => {
                write!(f, "Card {} is held by more than one participant", card)
            }
            Self::CardOutOfRange(card) => write!(f, "Card {} is outside the deck", card),
            Self::PoolMismatch => {
                write!(f, "Drawn-card pool does not match the cards participants hold")
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "Turn index {} out of bounds for turn order of {}", index, len)
            }
        }
    }
}

impl std::error::Error for IntegrityError {}
