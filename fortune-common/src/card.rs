use anyhow::{Result, bail};

use std::fmt;

pub const ACE_RANK: u8 = 1;
pub const MINOR_MIN_RANK: u8 = 2;
pub const JACK_RANK: u8 = 11;
pub const QUEEN_RANK: u8 = 12;
pub const KING_RANK: u8 = 13;
pub const ARCANA_MIN_RANK: u8 = 0;
pub const ARCANA_MAX_RANK: u8 = 21;
/// 22 arcana cards plus four minor suits of 12 cards each.
pub const DECK_SIZE: usize = 70;

const SUIT_LETTERS: [char; 4] = ['R', 'G', 'B', 'Y'];
const MINOR_RANKS: [&str; 12] = [
    "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Suit {
    Red = 0,
    Green = 1,
    Blue = 2,
    Yellow = 3,
    /// The major suit; 22 cards ranked 0-21.
    Arcana = 4,
}

impl Suit {
    pub const MINORS: [Suit; 4] = [Suit::Red, Suit::Green, Suit::Blue, Suit::Yellow];

    pub fn is_minor(self) -> bool {
        self != Suit::Arcana
    }

    pub fn index(self) -> usize {
        self as usize
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Suit::Red,
            1 => Suit::Green,
            2 => Suit::Blue,
            3 => Suit::Yellow,
            4 => Suit::Arcana,
            _ => unreachable!("invalid suit bits {bits}"),
        }
    }
}

/// A single card, packed as `rank | (suit << 5)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card(u8);

impl Card {
    /// Creates a card, rejecting ranks outside the suit's band
    /// (0-21 for the arcana, 2-13 for minor suits).
    pub fn new(rank: u8, suit: Suit) -> Result<Self> {
        let valid = match suit {
            Suit::Arcana => rank <= ARCANA_MAX_RANK,
            _ => (MINOR_MIN_RANK..=KING_RANK).contains(&rank),
        };
        if !valid {
            bail!("Invalid rank {rank} for suit {suit:?}");
        }
        Ok(Self::from_parts(rank, suit))
    }

    pub(crate) fn from_parts(rank: u8, suit: Suit) -> Self {
        Card(rank | ((suit as u8) << 5))
    }

    pub fn rank(self) -> u8 {
        self.0 & 0x1f
    }

    pub fn suit(self) -> Suit {
        Suit::from_bits(self.0 >> 5)
    }

    /// The packed representation; also the equality and hash key.
    pub fn value(self) -> u8 {
        self.0
    }

    /// True iff `self` may be placed on `other` in a cascade: same suit and
    /// ranks differing by exactly one, in either direction.
    pub fn can_place_on(self, other: Card) -> bool {
        self.suit() == other.suit() && self.rank().abs_diff(other.rank()) == 1
    }

    /// The full 70-card deck in a fixed, stable order: arcana 0-21 first,
    /// then each minor suit 2-13.
    pub fn deck() -> impl Iterator<Item = Card> {
        let arcana =
            (ARCANA_MIN_RANK..=ARCANA_MAX_RANK).map(|rank| Card::from_parts(rank, Suit::Arcana));
        let minors = Suit::MINORS
            .into_iter()
            .flat_map(|suit| (MINOR_MIN_RANK..=KING_RANK).map(move |rank| Card::from_parts(rank, suit)));
        arcana.chain(minors)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.suit() {
            Suit::Arcana => write!(f, "{}", self.rank()),
            suit => write!(
                f,
                "{}{}",
                MINOR_RANKS[self.rank() as usize - MINOR_MIN_RANK as usize],
                SUIT_LETTERS[suit.index()]
            ),
        }
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Card({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_suit_round_trip() {
        for suit in Suit::MINORS {
            for rank in MINOR_MIN_RANK..=KING_RANK {
                let card = Card::new(rank, suit).unwrap();
                assert_eq!(card.rank(), rank);
                assert_eq!(card.suit(), suit);
            }
        }
        for rank in ARCANA_MIN_RANK..=ARCANA_MAX_RANK {
            let card = Card::new(rank, Suit::Arcana).unwrap();
            assert_eq!(card.rank(), rank);
            assert_eq!(card.suit(), Suit::Arcana);
        }
    }

    #[test]
    fn test_invalid_ranks() {
        assert!(Card::new(0, Suit::Red).is_err());
        assert!(Card::new(ACE_RANK, Suit::Green).is_err());
        assert!(Card::new(KING_RANK + 1, Suit::Blue).is_err());
        assert!(Card::new(ARCANA_MAX_RANK + 1, Suit::Arcana).is_err());
    }

    #[test]
    fn test_can_place_on() {
        let five = Card::new(5, Suit::Red).unwrap();
        let four = Card::new(4, Suit::Red).unwrap();
        let six = Card::new(6, Suit::Red).unwrap();
        assert!(five.can_place_on(four));
        assert!(five.can_place_on(six));
        assert!(four.can_place_on(five));
        assert!(!five.can_place_on(five));
        assert!(!five.can_place_on(Card::new(7, Suit::Red).unwrap()));
        assert!(!five.can_place_on(Card::new(4, Suit::Green).unwrap()));
        assert!(!five.can_place_on(Card::new(4, Suit::Arcana).unwrap()));
    }

    #[test]
    fn test_deck() {
        let deck: Vec<Card> = Card::deck().collect();
        assert_eq!(deck.len(), DECK_SIZE);
        let mut values: Vec<u8> = deck.iter().map(|c| c.value()).collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), DECK_SIZE);
        assert_eq!(deck[0], Card::new(0, Suit::Arcana).unwrap());
        assert_eq!(deck[21], Card::new(21, Suit::Arcana).unwrap());
        assert_eq!(deck[22], Card::new(2, Suit::Red).unwrap());
        assert_eq!(deck[69], Card::new(KING_RANK, Suit::Yellow).unwrap());
    }

    #[test]
    fn test_display() {
        assert_eq!(Card::new(0, Suit::Arcana).unwrap().to_string(), "0");
        assert_eq!(Card::new(21, Suit::Arcana).unwrap().to_string(), "21");
        assert_eq!(Card::new(10, Suit::Green).unwrap().to_string(), "10G");
        assert_eq!(Card::new(QUEEN_RANK, Suit::Blue).unwrap().to_string(), "QB");
    }
}
