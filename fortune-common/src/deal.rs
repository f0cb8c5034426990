use crate::board::{Board, CASCADE_COUNT, Cascade, DEAL_DEPTH};
use crate::card::Card;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// The cascade dealt empty in a fresh game.
const EMPTY_CASCADE_INDEX: usize = 5;

impl Board {
    /// Deals the full 70-card deck into ten cascades of seven, leaving the
    /// middle cascade empty. The shuffle is driven by a ChaCha8 stream
    /// seeded from `seed`, so equal seeds produce equal boards on every
    /// platform.
    pub fn deal_from_seed(seed: u64) -> Self {
        let mut deck: Vec<Card> = Card::deck().collect();
        deck.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

        let mut chunks = deck.chunks(DEAL_DEPTH);
        let cascades: [Cascade; CASCADE_COUNT] = std::array::from_fn(|i| {
            if i == EMPTY_CASCADE_INDEX {
                Cascade::new()
            } else {
                chunks.next().into_iter().flatten().copied().collect()
            }
        });
        Board::from_layout(cascades, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::DECK_SIZE;

    #[test]
    fn test_deal_shape() {
        let board = Board::deal_from_seed(0);
        assert_eq!(board.cascades().len(), CASCADE_COUNT);
        assert!(board.cascades()[EMPTY_CASCADE_INDEX].is_empty());
        for (i, cascade) in board.cascades().iter().enumerate() {
            if i != EMPTY_CASCADE_INDEX {
                assert_eq!(cascade.len(), DEAL_DEPTH);
            }
        }
        assert_eq!(board.cell(), None);
        assert_eq!(board.foundation_card_count(), 0);
        assert_eq!(
            board.cascades().iter().map(|c| c.len()).sum::<usize>(),
            DECK_SIZE
        );
    }

    #[test]
    fn test_deal_is_deterministic() {
        assert_eq!(Board::deal_from_seed(1), Board::deal_from_seed(1));
        assert_eq!(Board::deal_from_seed(2), Board::deal_from_seed(2));
        assert_ne!(Board::deal_from_seed(1), Board::deal_from_seed(2));
    }
}
