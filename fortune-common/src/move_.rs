use crate::board::CASCADE_COUNT;

use anyhow::{Result, bail};

use std::fmt;

/// A transfer of one or more cards between two locations. Cascades are
/// numbered from 0; the cell and the foundation use negative sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    from: i8,
    to: i8,
    count: u8,
}

impl Move {
    pub const CELL: i8 = -1;
    pub const FOUNDATION: i8 = -2;

    /// Creates a move, validating its endpoints: `from` must be a cascade
    /// index or the cell, `to` a cascade index, the cell, or the foundation,
    /// and the two must differ. Only cascade-to-cascade transfers may carry
    /// more than one card.
    pub fn new(from: i8, to: i8, count: u8) -> Result<Self> {
        if from <= Self::FOUNDATION || from >= CASCADE_COUNT as i8 {
            bail!("Invalid move source {from}");
        }
        if to < Self::FOUNDATION || to >= CASCADE_COUNT as i8 {
            bail!("Invalid move target {to}");
        }
        if to == from {
            bail!("Move source and target are both cascade {from}");
        }
        if count == 0 {
            bail!("A move must carry at least one card");
        }
        if count > 1 && (from < 0 || to < 0) {
            bail!("Only cascade-to-cascade moves may carry more than one card");
        }
        Ok(Move { from, to, count })
    }

    pub fn single(from: i8, to: i8) -> Result<Self> {
        Self::new(from, to, 1)
    }

    pub(crate) fn unchecked(from: i8, to: i8, count: u8) -> Self {
        Move { from, to, count }
    }

    pub fn from(self) -> i8 {
        self.from
    }

    pub fn to(self) -> i8 {
        self.to
    }

    pub fn count(self) -> u8 {
        self.count
    }

    /// Rewrites cascade endpoints through `f`, leaving the cell and
    /// foundation sentinels unchanged. `f` must be a permutation of the
    /// cascade indices so that the move invariants are preserved.
    pub fn map_cascades(self, mut f: impl FnMut(usize) -> usize) -> Move {
        let from = if self.from >= 0 {
            f(self.from as usize) as i8
        } else {
            self.from
        };
        let to = if self.to >= 0 {
            f(self.to as usize) as i8
        } else {
            self.to
        };
        Move {
            from,
            to,
            count: self.count,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = |index: i8| match index {
            Self::CELL => "cell".to_string(),
            Self::FOUNDATION => "foundation".to_string(),
            _ => format!("cascade {index}"),
        };
        if self.count == 1 {
            write!(f, "Move card from {} to {}", location(self.from), location(self.to))
        } else {
            write!(
                f,
                "Move {} cards from {} to {}",
                self.count,
                location(self.from),
                location(self.to)
            )
        }
    }
}
