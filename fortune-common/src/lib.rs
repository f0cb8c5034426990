//! Common types and rules for the Fortune solitaire: cards, moves, and the
//! board state model shared by the solver and the CLI.

pub mod board;
pub mod card;
mod deal;
pub mod move_;

pub use crate::board::{Board, CASCADE_COUNT, cascade_rank};
pub use crate::card::{Card, Suit};
pub use crate::move_::Move;
