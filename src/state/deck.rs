//! The initiative card deck.
//!
//! Dragonbane initiative uses ten cards numbered 1 through 10; lower cards act
//! first. Cards drawn this round live in `CombatState::drawn_cards`; this
//! module owns the pool arithmetic so the draw-and-record step is one atomic
//! mutation.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::Rng;

/// Lowest card value in the deck.
pub const LOWEST_CARD: u8 = 1;

/// Highest card value in the deck.
pub const HIGHEST_CARD: u8 = 10;

/// Total number of cards, and therefore the most participants that can hold
/// a card in one round.
pub const DECK_SIZE: usize = (HIGHEST_CARD - LOWEST_CARD + 1) as usize;

/// Cards not yet drawn this round, ascending.
pub fn remaining(drawn: &BTreeSet<u8>) -> Vec<u8> {
    (LOWEST_CARD..=HIGHEST_CARD)
        .filter(|c| !drawn.contains(c))
        .collect()
}

/// Draw one card uniformly at random from the undrawn pool, recording it as
/// drawn. Returns `None` when the deck is exhausted, leaving `drawn`
/// untouched.
pub fn draw(drawn: &mut BTreeSet<u8>, rng: &mut StdRng) -> Option<u8> {
    let pool = remaining(drawn);
    if pool.is_empty() {
        return None;
    }
    let card = pool[rng.random_range(0..pool.len())];
    drawn.insert(card);
    Some(card)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_remaining_excludes_drawn() {
        let drawn: BTreeSet<u8> = [1, 5, 10].into_iter().collect();
        assert_eq!(remaining(&drawn), vec![2, 3, 4, 6, 7, 8, 9]);
    }

    #[test]
    fn test_full_deck_remaining() {
        let drawn = BTreeSet::new();
        assert_eq!(remaining(&drawn).len(), DECK_SIZE);
    }

    #[test]
    fn test_draws_are_distinct_until_exhausted() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut drawn = BTreeSet::new();
        let mut cards = Vec::new();

        for _ in 0..DECK_SIZE {
            let card = draw(&mut drawn, &mut rng).unwrap();
            assert!((LOWEST_CARD..=HIGHEST_CARD).contains(&card));
            cards.push(card);
        }

        let distinct: BTreeSet<u8> = cards.iter().copied().collect();
        assert_eq!(distinct.len(), DECK_SIZE);
        assert_eq!(drawn, distinct);

        // Eleventh draw fails without mutating the pool
        assert_eq!(draw(&mut drawn, &mut rng), None);
        assert_eq!(drawn.len(), DECK_SIZE);
    }

    #[test]
    fn test_draw_deterministic_with_seed() {
        let mut rng1 = StdRng::seed_from_u64(99);
        let mut rng2 = StdRng::seed_from_u64(99);
        let mut drawn1 = BTreeSet::new();
        let mut drawn2 = BTreeSet::new();

        for _ in 0..DECK_SIZE {
            assert_eq!(draw(&mut drawn1, &mut rng1), draw(&mut drawn2, &mut rng2));
        }
    }
}
