//! Participant registry operations.
//!
//! Reducers over the same combat document as the state machine: adding
//! entries mid-combat, ferocity duplicates, GM renames, manual removal, and
//! the token-removal sweep driven by the host's scene subscription.

use std::collections::HashSet;

use uuid::Uuid;

use super::combat::{CombatError, CombatPhase, CombatState};
use super::participant::{Participant, RosterPlayer, TokenInfo};

impl CombatState {
    /// Append participants for tokens not already in combat.
    ///
    /// Tokens whose reference is already represented are skipped (by token
    /// reference, not participant id, so ferocity duplicates don't block a
    /// re-add). Existing turn state is untouched. Returns how many entries
    /// were appended.
    pub fn add_participants(
        &mut self,
        tokens: &[TokenInfo],
        roster: &[RosterPlayer],
    ) -> Result<usize, CombatError> {
        if tokens.is_empty() {
            return Err(CombatError::EmptySelection);
        }

        let new_entries: Vec<Participant> = {
            let existing: HashSet<&str> = self
                .participants
                .iter()
                .map(|p| p.token_id.as_str())
                .collect();
            tokens
                .iter()
                .filter(|t| !existing.contains(t.token_id.as_str()))
                .map(|t| Participant::from_token(t, roster))
                .collect()
        };

        if new_entries.is_empty() {
            return Err(CombatError::AlreadyInCombat);
        }

        let count = new_entries.len();
        self.participants.extend(new_entries);
        Ok(count)
    }

    /// Give a token an extra initiative entry by cloning an existing
    /// participant (fresh identity, no card, pending). Silent no-op for a
    /// stale id.
    pub fn add_ferocity(&mut self, id: Uuid) {
        let dup = match self.get_participant(id) {
            Some(p) => p.ferocity_clone(),
            None => return,
        };
        self.participants.push(dup);
    }

    /// Set or clear a participant's custom name. Drawing phase only; the
    /// input is trimmed and an empty result reverts to the derived name.
    /// Silent no-op for a stale id.
    pub fn rename_participant(&mut self, id: Uuid, new_name: &str) -> Result<(), CombatError> {
        if self.phase != CombatPhase::Drawing {
            return Err(CombatError::InvalidPhase);
        }
        if let Some(p) = self.participants.iter_mut().find(|p| p.id == id) {
            p.set_custom_name(new_name);
        }
        Ok(())
    }

    /// Remove one participant, returning their card to the pool.
    ///
    /// The turn index is adjusted positionally: removing someone earlier in
    /// the pre-removal turn order shifts the index down by one, leaving the
    /// acting participant unaffected. Returns the removed entry, or `None`
    /// for a stale id.
    pub fn remove_participant(&mut self, id: Uuid) -> Option<Participant> {
        let pos = self.participants.iter().position(|p| p.id == id)?;
        let sorted_pos = self.turn_order().iter().position(|p| p.id == id);

        let removed = self.participants.remove(pos);
        if let Some(card) = removed.initiative_card {
            self.drawn_cards.remove(&card);
        }

        if let Some(i) = sorted_pos {
            if i < self.current_turn_index {
                self.current_turn_index -= 1;
            }
        }

        // Removing the tail of the order can strand the index past the end;
        // clamp it to the last valid position.
        let len = self.turn_order().len();
        if self.current_turn_index >= len {
            self.current_turn_index = len.saturating_sub(1);
        }

        Some(removed)
    }

    /// Sweep out every participant whose backing token no longer exists.
    ///
    /// Unlike [`remove_participant`](Self::remove_participant), several
    /// entries can vanish at once here, so positional offsetting is
    /// unreliable. The active participant is captured by id before removal
    /// and relocated by id in the post-removal order; if they were removed
    /// too, the index clamps to the last valid position.
    pub fn reconcile_token_removal(&mut self, live_token_ids: &HashSet<String>) -> ReconcileOutcome {
        let any_orphaned = self
            .participants
            .iter()
            .any(|p| !live_token_ids.contains(&p.token_id));
        if !any_orphaned {
            return ReconcileOutcome::default();
        }

        let active_id = self.current_participant().map(|p| p.id);

        let (kept, removed): (Vec<Participant>, Vec<Participant>) =
            std::mem::take(&mut self.participants)
                .into_iter()
                .partition(|p| live_token_ids.contains(&p.token_id));
        self.participants = kept;

        for p in &removed {
            if let Some(card) = p.initiative_card {
                self.drawn_cards.remove(&card);
            }
        }

        let new_index = {
            let order = self.turn_order();
            match active_id.and_then(|id| order.iter().position(|p| p.id == id)) {
                Some(i) => i,
                None => self.current_turn_index.min(order.len().saturating_sub(1)),
            }
        };
        self.current_turn_index = new_index;

        ReconcileOutcome { removed }
    }
}

/// Result of a token-removal sweep. The host raises one notification per
/// removed participant.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Participants whose tokens disappeared, in add order
    pub removed: Vec<Participant>,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::participant::ParticipantStatus;
    use pretty_assertions::assert_eq;

    fn token(i: usize) -> TokenInfo {
        TokenInfo::new(format!("token-{}", i), format!("Monster {}", i), None)
    }

    fn combat_with_cards(cards: &[u8]) -> CombatState {
        let mut state = CombatState::new();
        let tokens: Vec<TokenInfo> = (0..cards.len()).map(token).collect();
        state.start(&tokens, &[]).unwrap();
        for (p, &card) in state.participants.iter_mut().zip(cards) {
            p.initiative_card = Some(card);
            state.drawn_cards.insert(card);
        }
        state.start_round().unwrap();
        state
    }

    #[test]
    fn test_add_participants_skips_tokens_already_present() {
        let mut state = CombatState::new();
        state.start(&[token(0), token(1)], &[]).unwrap();

        let added = state
            .add_participants(&[token(1), token(2)], &[])
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(state.participants.len(), 3);
        assert_eq!(state.participants[2].token_id, "token-2");
    }

    #[test]
    fn test_add_participants_preserves_turn_state() {
        let mut state = combat_with_cards(&[2, 5]);
        state.act().unwrap();

        state.add_participants(&[token(9)], &[]).unwrap();

        assert_eq!(state.current_turn_index, 1);
        assert_eq!(state.participants[0].status, ParticipantStatus::Acted);
        assert_eq!(state.participants[2].initiative_card, None);
    }

    #[test]
    fn test_add_participants_rejects_full_duplicates() {
        let mut state = CombatState::new();
        state.start(&[token(0)], &[]).unwrap();

        assert_eq!(
            state.add_participants(&[token(0)], &[]),
            Err(CombatError::AlreadyInCombat)
        );
        assert_eq!(
            state.add_participants(&[], &[]),
            Err(CombatError::EmptySelection)
        );
        assert_eq!(state.participants.len(), 1);
    }

    #[test]
    fn test_add_ferocity_appends_clone() {
        let mut state = CombatState::new();
        state.start(&[token(0)], &[]).unwrap();
        let id = state.participants[0].id;

        state.add_ferocity(id);

        assert_eq!(state.participants.len(), 2);
        assert_eq!(state.participants[1].token_id, "token-0");
        assert_ne!(state.participants[1].id, id);
        assert_eq!(state.participants[1].initiative_card, None);

        // Stale id is a silent no-op
        state.add_ferocity(Uuid::new_v4());
        assert_eq!(state.participants.len(), 2);
    }

    #[test]
    fn test_rename_trims_and_clears() {
        let mut state = CombatState::new();
        state.start(&[token(0)], &[]).unwrap();
        let id = state.participants[0].id;
        let derived = state.participants[0].name.clone();

        state.rename_participant(id, "  The Boss ").unwrap();
        assert_eq!(state.participants[0].display_name(), "The Boss");

        state.rename_participant(id, "").unwrap();
        assert_eq!(state.participants[0].custom_name, None);
        assert_eq!(state.participants[0].display_name(), derived);
    }

    #[test]
    fn test_rename_only_during_drawing() {
        let mut state = combat_with_cards(&[2, 5]);
        let id = state.participants[0].id;

        assert_eq!(
            state.rename_participant(id, "Nope"),
            Err(CombatError::InvalidPhase)
        );
        assert_eq!(state.participants[0].custom_name, None);
    }

    #[test]
    fn test_remove_before_current_shifts_index_down() {
        // Sorted cards [2, 5, 8], index 1 (card 5 active)
        let mut state = combat_with_cards(&[2, 5, 8]);
        state.act().unwrap();
        assert_eq!(state.current_participant().unwrap().initiative_card, Some(5));

        let card2 = state.participants[0].id;
        let removed = state.remove_participant(card2).unwrap();

        assert_eq!(removed.initiative_card, Some(2));
        assert_eq!(state.current_turn_index, 0);
        assert_eq!(state.current_participant().unwrap().initiative_card, Some(5));
        assert!(!state.drawn_cards.contains(&2));
    }

    #[test]
    fn test_remove_after_current_leaves_index() {
        let mut state = combat_with_cards(&[2, 5, 8]);
        state.act().unwrap();

        let card8 = state.participants[2].id;
        state.remove_participant(card8).unwrap();

        assert_eq!(state.current_turn_index, 1);
        assert_eq!(state.current_participant().unwrap().initiative_card, Some(5));
    }

    #[test]
    fn test_remove_last_active_clamps_index() {
        let mut state = combat_with_cards(&[2, 5]);
        state.act().unwrap(); // card 5 active at index 1

        let card5 = state.participants[1].id;
        state.remove_participant(card5).unwrap();

        assert_eq!(state.current_turn_index, 0);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_remove_stale_id_is_noop() {
        let mut state = combat_with_cards(&[2, 5]);
        let before = state.clone();

        assert_eq!(state.remove_participant(Uuid::new_v4()), None);
        assert_eq!(state, before);
    }

    #[test]
    fn test_reconcile_relocates_active_by_identity() {
        // P1 card 1 active, P2 card 2, P3 card 3; P2's token disappears.
        let mut state = combat_with_cards(&[1, 2, 3]);
        let p1 = state.participants[0].id;

        let live: HashSet<String> = ["token-0", "token-2"]
            .into_iter()
            .map(String::from)
            .collect();
        let outcome = state.reconcile_token_removal(&live);

        assert_eq!(outcome.removed.len(), 1);
        assert_eq!(outcome.removed[0].initiative_card, Some(2));
        assert_eq!(state.participants.len(), 2);
        assert_eq!(state.current_participant().unwrap().id, p1);
        assert_eq!(state.current_turn_index, 0);
        assert!(!state.drawn_cards.contains(&2));
    }

    #[test]
    fn test_reconcile_shifts_index_to_follow_active() {
        // Card 2 is active at index 1; the card-1 token disappears, so the
        // active participant must end up at index 0 of the new order.
        let mut state = combat_with_cards(&[1, 2, 3]);
        state.act().unwrap();
        let active = state.current_participant().unwrap().id;

        let live: HashSet<String> = ["token-1", "token-2"]
            .into_iter()
            .map(String::from)
            .collect();
        state.reconcile_token_removal(&live);

        assert_eq!(state.current_turn_index, 0);
        assert_eq!(state.current_participant().unwrap().id, active);
    }

    #[test]
    fn test_reconcile_clamps_when_active_removed() {
        let mut state = combat_with_cards(&[1, 2, 3]);
        state.act().unwrap();
        state.act().unwrap(); // card 3 active at index 2

        let live: HashSet<String> = ["token-0"].into_iter().map(String::from).collect();
        let outcome = state.reconcile_token_removal(&live);

        assert_eq!(outcome.removed.len(), 2);
        assert_eq!(state.current_turn_index, 0);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_reconcile_noop_when_all_tokens_live() {
        let mut state = combat_with_cards(&[1, 2]);
        let before = state.clone();

        let live: HashSet<String> = ["token-0", "token-1"]
            .into_iter()
            .map(String::from)
            .collect();
        let outcome = state.reconcile_token_removal(&live);

        assert!(outcome.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn test_reconcile_removes_all_ferocity_entries_for_a_token() {
        let mut state = CombatState::new();
        state.start(&[token(0), token(1)], &[]).unwrap();
        let id = state.participants[0].id;
        state.add_ferocity(id);

        let live: HashSet<String> = ["token-1"].into_iter().map(String::from).collect();
        let outcome = state.reconcile_token_removal(&live);

        assert_eq!(outcome.removed.len(), 2);
        assert_eq!(state.participants.len(), 1);
        assert_eq!(state.participants[0].token_id, "token-1");
    }
}
