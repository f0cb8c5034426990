use crate::card::{ACE_RANK, ARCANA_MAX_RANK, Card, JACK_RANK, KING_RANK, MINOR_MIN_RANK, QUEEN_RANK, Suit};
use crate::move_::Move;

use anyhow::{Context, Result, bail};
use smallvec::SmallVec;

use std::fmt;
use std::hash::{Hash, Hasher};

pub const CASCADE_COUNT: usize = 11;
/// Cards per cascade in a fresh deal; ten cascades of seven plus one empty.
pub const DEAL_DEPTH: usize = 7;

pub type Cascade = SmallVec<[Card; 24]>;

/// Sort key used to canonicalize cascade order: the bottom card's packed
/// value, with empty cascades sorting last.
pub fn cascade_rank(cascade: &[Card]) -> u8 {
    cascade.first().map_or(u8::MAX, |card| card.value())
}

/// The full game state: eleven ordered cascades (bottom to top), a single
/// optional cell card, and foundation progress counters.
///
/// The counters are derived from the cards present, so a board constructed
/// from a partial deck treats the absent cards as already removed. Equality
/// and hashing cover the cell and the cascade sequences only; the counters
/// follow from them.
#[derive(Debug, Clone)]
pub struct Board {
    cascades: [Cascade; CASCADE_COUNT],
    cell: Option<Card>,
    minor_fdns: [u8; 4],
    arcana_low: i8,
    arcana_high: i8,
}

impl Board {
    /// Builds a board from an explicit cascade layout and an optional held
    /// card. Fails on a wrong cascade count or a duplicated card.
    pub fn new(cascades: Vec<Vec<Card>>, cell: Option<Card>) -> Result<Self> {
        if cascades.len() != CASCADE_COUNT {
            bail!("Expected {CASCADE_COUNT} cascades, got {}", cascades.len());
        }
        let mut seen = [false; 256];
        let mut mark = |card: Card| -> Result<()> {
            let index = card.value() as usize;
            if seen[index] {
                bail!("Duplicate card {card}");
            }
            seen[index] = true;
            Ok(())
        };
        for &card in cascades.iter().flatten() {
            mark(card)?;
        }
        if let Some(card) = cell {
            mark(card)?;
        }

        let cascades: [Cascade; CASCADE_COUNT] =
            std::array::from_fn(|i| cascades[i].iter().copied().collect());
        Ok(Self::from_layout(cascades, cell))
    }

    pub(crate) fn from_layout(cascades: [Cascade; CASCADE_COUNT], cell: Option<Card>) -> Self {
        let mut board = Board {
            cascades,
            cell,
            minor_fdns: [ACE_RANK; 4],
            arcana_low: -1,
            arcana_high: ARCANA_MAX_RANK as i8 + 1,
        };
        board.update_foundations();
        board
    }

    pub fn cascades(&self) -> &[Cascade] {
        &self.cascades
    }

    pub fn cell(&self) -> Option<Card> {
        self.cell
    }

    /// Rank of the highest card removed to this minor suit's foundation;
    /// `ACE_RANK` when none has been.
    pub fn minor_foundation(&self, suit: Suit) -> u8 {
        self.minor_fdns[suit.index()]
    }

    /// The arcana foundation's `(low, high)` pointers. The low pile has
    /// consumed ranks up to `low`, the high pile down to `high`; the
    /// foundation is complete when they are equal.
    pub fn arcana_foundation(&self) -> (i8, i8) {
        (self.arcana_low, self.arcana_high)
    }

    pub fn is_won(&self) -> bool {
        self.arcana_low == self.arcana_high
            && self.minor_fdns.iter().all(|&fdn| fdn == KING_RANK)
    }

    /// Number of cards the foundation counters account for; together with
    /// the cards still in play this always totals the full deck.
    pub fn foundation_card_count(&self) -> usize {
        let minors: usize = self
            .minor_fdns
            .iter()
            .map(|&fdn| (fdn - ACE_RANK) as usize)
            .sum();
        let arcana = if self.arcana_low == self.arcana_high {
            ARCANA_MAX_RANK as usize + 1
        } else {
            (self.arcana_low + 1) as usize
                + (ARCANA_MAX_RANK as i8 - self.arcana_high + 1).max(0) as usize
        };
        minors + arcana
    }

    /// True iff `card` may be removed to the foundation right now. An arcana
    /// card is accepted when its rank extends either the low or the high
    /// pile. A minor card is accepted only when the cell is empty and its
    /// rank is exactly one above its suit's counter.
    pub fn can_remove(&self, card: Card) -> bool {
        if card.suit() == Suit::Arcana {
            let rank = card.rank() as i8;
            return rank == self.arcana_low + 1 || rank == self.arcana_high - 1;
        }
        if self.cell.is_some() {
            return false;
        }
        card.rank() == self.minor_fdns[card.suit().index()] + 1
    }

    /// All syntactically legal moves from the current state, lazily.
    ///
    /// Cascade-to-cascade transfers are taken from the top-aligned adjacent
    /// run and applied one card at a time, which reverses the moved cards;
    /// since adjacency is symmetric it is the source's top card that must be
    /// placeable on the target's top.
    pub fn enumerate_moves(&self) -> impl Iterator<Item = Move> + '_ {
        let between_cascades = (0..CASCADE_COUNT).flat_map(move |i| {
            let run = self.run_length(&self.cascades[i]);
            let top = self.cascades[i].last().copied();
            (0..CASCADE_COUNT)
                .filter(move |&j| j != i)
                .filter(move |&j| match top {
                    Some(card) => self.cascades[j]
                        .last()
                        .is_none_or(|&target| card.can_place_on(target)),
                    None => false,
                })
                .flat_map(move |j| {
                    (1..=run)
                        .rev()
                        .map(move |k| Move::unchecked(i as i8, j as i8, k as u8))
                })
        });

        let from_cell = self.cell.into_iter().flat_map(move |card| {
            (0..CASCADE_COUNT)
                .filter(move |&j| {
                    self.cascades[j]
                        .last()
                        .is_none_or(|&target| card.can_place_on(target))
                })
                .map(|j| Move::unchecked(Move::CELL, j as i8, 1))
        });

        let to_cell = (0..CASCADE_COUNT)
            .filter(move |&i| self.cell.is_none() && !self.cascades[i].is_empty())
            .map(|i| Move::unchecked(i as i8, Move::CELL, 1));

        between_cascades.chain(from_cell).chain(to_cell)
    }

    /// The forced moves: single cards from cascade tops or the cell that the
    /// foundation currently accepts.
    pub fn enumerate_auto_moves(&self) -> impl Iterator<Item = Move> + '_ {
        let from_cascades = (0..CASCADE_COUNT).filter_map(move |i| {
            let &top = self.cascades[i].last()?;
            self.can_remove(top)
                .then(|| Move::unchecked(i as i8, Move::FOUNDATION, 1))
        });
        let from_cell = self
            .cell
            .filter(|&card| self.can_remove(card))
            .map(|_| Move::unchecked(Move::CELL, Move::FOUNDATION, 1));
        from_cascades.chain(from_cell)
    }

    /// Applies `mov` in place. Preconditions are the caller's duty; the
    /// solver only applies moves it generated.
    pub fn apply_move(&mut self, mov: Move) {
        let (from, to) = (mov.from(), mov.to());
        if from >= 0 && to >= 0 {
            let (from, to) = (from as usize, to as usize);
            let count = mov.count() as usize;
            debug_assert!(self.cascades[from].len() >= count);
            for _ in 0..count {
                if let Some(card) = self.cascades[from].pop() {
                    self.cascades[to].push(card);
                }
            }
        } else if to == Move::FOUNDATION {
            if from == Move::CELL {
                debug_assert!(self.cell.is_some());
                if let Some(card) = self.cell.take() {
                    self.remove_to_foundation(card);
                }
            } else {
                debug_assert!(!self.cascades[from as usize].is_empty());
                if let Some(card) = self.cascades[from as usize].pop() {
                    self.remove_to_foundation(card);
                }
            }
        } else if from == Move::CELL {
            debug_assert!(self.cell.is_some());
            if let Some(card) = self.cell.take() {
                self.cascades[to as usize].push(card);
            }
        } else {
            debug_assert!(self.cell.is_none());
            debug_assert!(!self.cascades[from as usize].is_empty());
            if let Some(card) = self.cascades[from as usize].pop() {
                self.cell = Some(card);
            }
        }
    }

    /// Applies auto-moves until none remain.
    pub fn apply_auto_moves(&mut self) {
        loop {
            let moves: SmallVec<[Move; CASCADE_COUNT + 1]> =
                self.enumerate_auto_moves().collect();
            if moves.is_empty() {
                break;
            }
            for mov in moves {
                self.apply_move(mov);
            }
        }
    }

    /// Reorders cascades by ascending lead value so that states differing
    /// only by which physical cascade holds which pile collapse to one
    /// representative. Once the arcana piles have met, their numeric
    /// position no longer affects legality, so both pointers are reset to a
    /// fixed sentinel as well.
    pub fn normalize_order(&mut self) {
        self.cascades.sort_by_key(|cascade| cascade_rank(cascade));
        if self.arcana_low == self.arcana_high {
            self.arcana_low = ARCANA_MAX_RANK as i8;
            self.arcana_high = ARCANA_MAX_RANK as i8;
        }
    }

    pub fn normalize(&mut self) {
        self.apply_auto_moves();
        self.normalize_order();
    }

    /// Heuristic used to order the search frontier. Prefers fewer cards in
    /// cascades, rewards empty cascades and coherent top runs, penalizes an
    /// occupied cell, and subtracts the path length.
    pub fn score(&self, step: u32) -> i32 {
        let mut score = 0;
        for cascade in &self.cascades {
            let run = self.run_length(cascade) as i32;
            score -= cascade.len() as i32;
            score += if cascade.is_empty() {
                20
            } else if run == cascade.len() as i32 {
                run * 2
            } else {
                run
            };
        }
        if self.cell.is_some() {
            score -= 10;
        }
        score - step as i32
    }

    /// Length of the top-aligned run of mutually adjacent cards.
    fn run_length(&self, cascade: &[Card]) -> usize {
        let Some((&top, rest)) = cascade.split_last() else {
            return 0;
        };
        let mut previous = top;
        let mut length = 1;
        for &card in rest.iter().rev() {
            if !previous.can_place_on(card) {
                break;
            }
            previous = card;
            length += 1;
        }
        length
    }

    fn remove_to_foundation(&mut self, card: Card) {
        if card.suit() == Suit::Arcana {
            let rank = card.rank() as i8;
            debug_assert!(rank == self.arcana_low + 1 || rank == self.arcana_high - 1);
            if rank == self.arcana_low + 1 {
                self.arcana_low += 1;
            }
            if rank == self.arcana_high - 1 {
                self.arcana_high -= 1;
            }
        } else {
            let index = card.suit().index();
            debug_assert_eq!(card.rank(), self.minor_fdns[index] + 1);
            self.minor_fdns[index] += 1;
        }
    }

    fn update_foundations(&mut self) {
        let mut minor_min = [None::<u8>; 4];
        let mut arcana_min = None::<u8>;
        let mut arcana_max = None::<u8>;
        for card in self.cascades.iter().flatten().chain(self.cell.iter()) {
            let rank = card.rank();
            match card.suit() {
                Suit::Arcana => {
                    arcana_min = Some(arcana_min.map_or(rank, |min| min.min(rank)));
                    arcana_max = Some(arcana_max.map_or(rank, |max| max.max(rank)));
                }
                suit => {
                    let slot = &mut minor_min[suit.index()];
                    *slot = Some(slot.map_or(rank, |min| min.min(rank)));
                }
            }
        }
        for (fdn, min) in self.minor_fdns.iter_mut().zip(minor_min) {
            *fdn = min.map_or(KING_RANK, |rank| rank - 1);
        }
        match (arcana_min, arcana_max) {
            (Some(min), Some(max)) => {
                self.arcana_low = min as i8 - 1;
                self.arcana_high = max as i8 + 1;
            }
            _ => {
                self.arcana_low = ARCANA_MAX_RANK as i8;
                self.arcana_high = ARCANA_MAX_RANK as i8;
            }
        }
    }

    /// Parses the text layout format: whitespace-separated tokens laid out
    /// row-major over eleven columns, `-` marking an empty position. A minor
    /// card is `<rank><R|G|B|Y>` with rank 2-10, J, Q or K; an arcana card
    /// is a bare 0-21. When the token count leaves a remainder of one, the
    /// trailing token is the held cell.
    pub fn parse(text: &str) -> Result<Self> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut tokens = tokens.as_slice();

        let mut cell = None;
        if tokens.len() % CASCADE_COUNT == 1 {
            if let Some((&cell_token, rest)) = tokens.split_last() {
                cell = parse_card(cell_token)
                    .with_context(|| format!("Could not parse cell card '{cell_token}'"))?;
                tokens = rest;
            }
        }

        let mut cascades: Vec<Vec<Card>> = vec![Vec::new(); CASCADE_COUNT];
        for (index, &token) in tokens.iter().enumerate() {
            let column = index % CASCADE_COUNT;
            let row = index / CASCADE_COUNT;
            let card = parse_card(token).with_context(|| {
                format!("Could not parse card '{token}' in column {column}, row {row}")
            })?;
            if let Some(card) = card {
                if cascades[column].len() < row {
                    bail!("Unexpected card '{token}' below a gap in column {column}, row {row}");
                }
                cascades[column].push(card);
            }
        }

        Self::new(cascades, cell)
    }

    /// Writes the board back in the text layout format accepted by
    /// [`Board::parse`].
    pub fn to_layout_string(&self) -> String {
        let rows = self.cascades.iter().map(|c| c.len()).max().unwrap_or(0);
        let mut out = String::new();
        for row in 0..rows {
            for (column, cascade) in self.cascades.iter().enumerate() {
                if column > 0 {
                    out.push(' ');
                }
                let token = match cascade.get(row) {
                    Some(card) => card.to_string(),
                    None => "-".to_string(),
                };
                out.push_str(&format!("{token:>3}"));
            }
            out.push('\n');
        }
        if let Some(card) = self.cell {
            out.push_str(&card.to_string());
            out.push('\n');
        }
        out
    }
}

fn parse_card(token: &str) -> Result<Option<Card>> {
    if token == "-" {
        return Ok(None);
    }
    let last = token.chars().last().context("Empty card token")?;
    let suit = match last.to_ascii_uppercase() {
        'R' => Some(Suit::Red),
        'G' => Some(Suit::Green),
        'B' => Some(Suit::Blue),
        'Y' => Some(Suit::Yellow),
        _ => None,
    };
    let card = match suit {
        Some(suit) => {
            let rank_token = &token[..token.len() - last.len_utf8()];
            let rank = match rank_token.to_ascii_uppercase().as_str() {
                "J" => JACK_RANK,
                "Q" => QUEEN_RANK,
                "K" => KING_RANK,
                digits => {
                    let rank: u8 = digits.parse().context("Invalid rank")?;
                    if !(MINOR_MIN_RANK..=10).contains(&rank) {
                        bail!("Invalid rank {rank}");
                    }
                    rank
                }
            };
            Card::new(rank, suit)?
        }
        None => {
            let rank: u8 = token.parse().context("Invalid rank")?;
            Card::new(rank, Suit::Arcana)?
        }
    };
    Ok(Some(card))
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell && self.cascades == other.cascades
    }
}

impl Eq for Board {}

impl Hash for Board {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cell.hash(state);
        for cascade in &self.cascades {
            cascade.hash(state);
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self
            .cell
            .map_or_else(|| "-".to_string(), |card| card.to_string());
        let fdns = Suit::MINORS
            .iter()
            .map(|&suit| {
                let fdn = self.minor_fdns[suit.index()];
                let token = if fdn < MINOR_MIN_RANK {
                    "-".to_string()
                } else {
                    Card::from_parts(fdn, suit).to_string()
                };
                format!("{token:>4}")
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            f,
            "{:>4} {:>4}     {cell:>4}       {fdns}",
            self.arcana_low, self.arcana_high
        )?;

        let rows = self.cascades.iter().map(|c| c.len()).max().unwrap_or(0);
        for row in 0..rows {
            for cascade in &self.cascades {
                let token = match cascade.get(row) {
                    Some(card) => card.to_string(),
                    None => "-".to_string(),
                };
                write!(f, "{token:>4}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
