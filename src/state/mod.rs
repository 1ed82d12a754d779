//! State management module for the draw-initiative tracker.
//!
//! This module provides the core state types and operations:
//!
//! - `participant` - Combat participants and host-boundary input types
//! - `deck` - The ten-card initiative deck and drawn-card pool
//! - `combat` - The replicated `CombatState` document and its state machine
//! - `registry` - Participant registry reducers (add, ferocity, rename,
//!   remove, token-removal sweep)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ClientSession (per client)                │
//! │                                                                  │
//! │  role / player_id          pending_swap (local-only gesture)     │
//! │                                                                  │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                    CombatState (document)                  │  │
//! │  │                                                            │  │
//! │  │  phase: Drawing ──▶ Active ──▶ RoundComplete ──▶ Drawing   │  │
//! │  │                                                            │  │
//! │  │  participants (add order)     drawn_cards (1..=10 pool)    │  │
//! │  │  current_turn_index ──▶ derived turn order (sorted fresh)  │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! │            ▲                              │                      │
//! │            │ sync (metadata change)       │ to_value (write)     │
//! └────────────┼──────────────────────────────┼──────────────────────┘
//!              │     shared room document     ▼
//!              └──── last-writer-wins, broadcast to all clients ─────
//! ```
//!
//! Every operation reads the locally cached document, computes the next
//! value, and the host replaces the whole document in the shared store. The
//! core holds no state of its own beyond that cache and the client-local
//! swap gesture.

pub mod combat;
pub mod deck;
pub mod participant;
pub mod registry;

// Re-export commonly used types
pub use combat::{CombatError, CombatPhase, CombatState, IntegrityError, METADATA_KEY};
pub use deck::{DECK_SIZE, HIGHEST_CARD, LOWEST_CARD};
pub use participant::{
    Controller, Participant, ParticipantStatus, RosterPlayer, TokenInfo, FALLBACK_NAME,
};
pub use registry::ReconcileOutcome;

use uuid::Uuid;

/// The binary role the host assigns each client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Gm,
    Player,
}

/// One client's view of the combat: the cached replicated document plus the
/// ephemeral per-client state that is deliberately not part of it.
///
/// The "who wants to wait" gesture lives here and only here; it is abandoned
/// without a network round trip when cancelled.
#[derive(Debug, Clone)]
pub struct ClientSession {
    /// Role the host assigned this client
    pub role: Role,

    /// This client's player identifier
    pub player_id: String,

    /// Locally cached copy of the shared document
    pub combat: CombatState,

    /// Current actor mid-swap, if any (client-local, never replicated)
    pending_swap: Option<Uuid>,
}

impl ClientSession {
    pub fn new(role: Role, player_id: String) -> Self {
        Self {
            role,
            player_id,
            combat: CombatState::default(),
            pending_swap: None,
        }
    }

    /// Handle a document-change broadcast. `None` means the key was cleared
    /// (combat ended); the cache falls back to the inactive default.
    ///
    /// A pending swap gesture survives only while its participant is still
    /// the current actor in the new document.
    pub fn sync(&mut self, document: Option<CombatState>) {
        self.combat = document.unwrap_or_default();
        if let Some(pending) = self.pending_swap {
            let still_current = self.combat.current_participant().map(|p| p.id) == Some(pending);
            if !still_current {
                self.pending_swap = None;
            }
        }
    }

    pub fn is_gm(&self) -> bool {
        self.role == Role::Gm
    }

    /// Check whether this client may take turns for a participant. The GM
    /// always qualifies.
    pub fn can_control(&self, participant: &Participant) -> bool {
        if self.is_gm() {
            return true;
        }
        participant.controlled_by.player_id() == Some(self.player_id.as_str())
    }

    /// Whether this client may run the GM-only operations (start, end,
    /// draw-all, round control, registry changes).
    pub fn may_manage_combat(&self) -> bool {
        self.is_gm()
    }

    /// Whether this client may act for the current participant.
    pub fn may_take_current_turn(&self) -> bool {
        self.combat
            .current_participant()
            .is_some_and(|p| self.can_control(p))
    }

    /// Begin the wait gesture for the current actor.
    ///
    /// Fails when no eligible swap target exists; no-op when there is no
    /// current actor.
    pub fn begin_swap(&mut self) -> Result<(), CombatError> {
        let Some(current) = self.combat.current_participant() else {
            return Ok(());
        };
        let current_id = current.id;
        if self.combat.valid_swap_targets().is_empty() {
            return Err(CombatError::NoSwapTargets);
        }
        self.pending_swap = Some(current_id);
        Ok(())
    }

    /// Abandon the wait gesture. Purely local; nothing is written.
    pub fn cancel_swap(&mut self) {
        self.pending_swap = None;
    }

    /// The participant currently mid-swap, if any.
    pub fn pending_swap(&self) -> Option<Uuid> {
        self.pending_swap
    }

    /// Resolve the pending wait against a chosen target. No-op unless a
    /// gesture is pending; the gesture is kept on failure so the client can
    /// pick another target or cancel.
    pub fn complete_swap(&mut self, target_id: Uuid) -> Result<(), CombatError> {
        if self.pending_swap.is_none() {
            return Ok(());
        }
        self.combat.execute_swap(target_id)?;
        self.pending_swap = None;
        Ok(())
    }
}
