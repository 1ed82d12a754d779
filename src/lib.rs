//! Dragonbane Initiative State Library
//!
//! This crate provides the combat state machine for a Dragonbane-style
//! draw-initiative tracker shared by a GM and players over a replicated room
//! document.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Combat State Machine** - Phases (drawing, active, round complete),
//!   turn progression in card order, random card draws from a shared ten-card
//!   deck, and the wait/swap mechanic.
//!
//! - **Participant Registry** - Building participants from selected scene
//!   tokens, ferocity duplicates, GM renames, removal, and the sweep that
//!   reconciles combat when tokens disappear.
//!
//! - **Client Session** - Per-client glue: role and controller checks, the
//!   cached document, and the client-local swap gesture.
//!
//! # Design Principles
//!
//! 1. **One shared document** - `CombatState` is the whole source of truth.
//!    Every operation rewrites it atomically; the hosting platform replaces
//!    it in the room store last-writer-wins and broadcasts to all clients.
//!
//! 2. **Turn order is derived, never stored** - Participants sort ascending
//!    by card on every read. Any mutation that can reorder or remove entries
//!    re-derives the turn index against the fresh sort.
//!
//! 3. **Fully commit or no-op** - Fallible operations either apply completely
//!    or leave the document untouched; stale participant references resolve
//!    as silent no-ops.
//!
//! 4. **No networking** - This crate is pure state. Reading and writing the
//!    room document, notifications, and rendering belong to the host.
//!
//! # Example
//!
//! ```rust
//! use dragonbane_initiative_state::state::{CombatPhase, CombatState, RosterPlayer, TokenInfo};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut combat = CombatState::new();
//!
//! let tokens = vec![
//!     TokenInfo::new("token-goblin".to_string(), "Goblin".to_string(), None),
//!     TokenInfo::new("token-kara".to_string(), String::new(), Some("player-1".to_string())),
//! ];
//! let roster = vec![RosterPlayer::new("player-1".to_string(), "Kara".to_string())];
//!
//! combat.start(&tokens, &roster).unwrap();
//! combat.draw_all(&mut rng).unwrap();
//! combat.start_round().unwrap();
//! assert_eq!(combat.phase, CombatPhase::Active);
//!
//! combat.act().unwrap();
//! combat.act().unwrap();
//! assert_eq!(combat.phase, CombatPhase::RoundComplete);
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
