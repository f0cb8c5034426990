//! Best-first graph search over Fortune solitaire boards, with canonicalized
//! deduplication and anytime improvement of the found solution.

mod normalize;
mod result;
mod solver;

pub use crate::normalize::BoardNormalization;
pub use crate::result::{SolveResult, SolveStatus};
pub use crate::solver::{Progress, SolveControl, SolveOptions, Solver, solve};
