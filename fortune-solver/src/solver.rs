use crate::normalize::BoardNormalization;
use crate::result::{SolveResult, SolveStatus};

use ahash::AHashMap;
use fortune_common::{Board, Move};
use smallvec::SmallVec;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

const REPORT_INTERVAL: u32 = 1000;

/// Tunable parameters for a solve run.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Maximum number of search iterations before giving up.
    pub max_iterations: u32,
    /// Maximum number of moves a solution may have; longer paths are not
    /// explored.
    pub max_steps: u32,
    /// Return the first solution found instead of spending the remaining
    /// budget searching for a shorter one.
    pub stop_at_first: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iterations: 500_000,
            max_steps: 100,
            stop_at_first: false,
        }
    }
}

/// Cooperative cancellation flag, checked once per search iteration. May be
/// shared with another thread through an `Arc`.
#[derive(Debug, Default)]
pub struct SolveControl {
    cancelled: AtomicBool,
}

impl SolveControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Relaxed)
    }
}

/// Periodic search progress, passed to the progress callback.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub iteration: u32,
    /// Length of the best solution found so far, if any.
    pub best_move_count: Option<u32>,
}

struct Node {
    previous: Option<Board>,
    mov: Option<Move>,
    step: u32,
}

#[derive(Clone, PartialEq, Eq)]
struct Frontier {
    score: i32,
    step: u32,
    board: Board,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.cmp(&other.score)
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn solve(board: Board, options: &SolveOptions) -> SolveResult {
    Solver::new(board).solve(options)
}

/// Greedy best-first search over canonicalized boards.
///
/// Successor states are deduplicated by their canonical form (auto-moves
/// applied, cascades reordered); the visited table is the source of truth
/// and stale frontier entries are dropped on dequeue. After a solution is
/// found the admission bound tightens to one move less, so the search keeps
/// improving the solution until the budget or the frontier runs out.
pub struct Solver {
    start: Board,
    visited: AHashMap<Board, Node>,
    queue: BinaryHeap<Frontier>,
}

impl Solver {
    pub fn new(start: Board) -> Self {
        Self {
            start,
            visited: AHashMap::new(),
            queue: BinaryHeap::new(),
        }
    }

    pub fn solve(&mut self, options: &SolveOptions) -> SolveResult {
        self.solve_with(options, None, |_| {})
    }

    /// Runs the search with an optional cancellation flag and a progress
    /// callback. Cancellation returns the best solution known so far, if
    /// any.
    pub fn solve_with(
        &mut self,
        options: &SolveOptions,
        control: Option<&SolveControl>,
        mut on_progress: impl FnMut(Progress),
    ) -> SolveResult {
        self.visited.clear();
        self.queue.clear();

        // Auto-moves only; the root keeps the caller's cascade order so the
        // first solution move translates through the identity permutation.
        let mut root = self.start.clone();
        root.apply_auto_moves();
        self.queue.push(Frontier {
            score: root.score(0),
            step: 0,
            board: root.clone(),
        });
        self.visited.insert(
            root,
            Node {
                previous: None,
                mov: None,
                step: 0,
            },
        );

        let mut best: Option<Vec<Move>> = None;
        let mut bound = options.max_steps;
        let mut iteration = 0;
        let mut moves: SmallVec<[Move; 64]> = SmallVec::new();

        while iteration < options.max_iterations {
            if control.is_some_and(|c| c.is_cancelled()) {
                break;
            }

            let Some(entry) = self.queue.pop() else {
                return match best {
                    Some(moves) => SolveResult::solved(moves, iteration),
                    None => SolveResult::unsolved(SolveStatus::NoSolution, iteration),
                };
            };
            iteration += 1;
            if iteration % REPORT_INTERVAL == 0 {
                on_progress(Progress {
                    iteration,
                    best_move_count: best.as_ref().map(|moves| moves.len() as u32),
                });
            }

            // A shorter path to this state may have been recorded after the
            // entry was enqueued.
            if self
                .visited
                .get(&entry.board)
                .is_some_and(|node| node.step < entry.step)
            {
                continue;
            }

            if entry.board.is_won() {
                if best
                    .as_ref()
                    .is_none_or(|moves| (entry.step as usize) < moves.len())
                {
                    best = Some(self.assemble_moves(&entry.board));
                    bound = bound.min(entry.step.saturating_sub(1));
                    if options.stop_at_first {
                        break;
                    }
                }
                continue;
            }

            moves.clear();
            moves.extend(entry.board.enumerate_moves());
            for &mov in &moves {
                let mut next = entry.board.clone();
                next.apply_move(mov);
                next.normalize();
                let step = entry.step + 1;

                let admit = match self.visited.get(&next) {
                    Some(node) => step < node.step,
                    None => step <= bound,
                };
                if !admit {
                    continue;
                }

                let score = next.score(step);
                self.visited.insert(
                    next.clone(),
                    Node {
                        previous: Some(entry.board.clone()),
                        mov: Some(mov),
                        step,
                    },
                );
                self.queue.push(Frontier {
                    score,
                    step,
                    board: next,
                });
            }
        }

        match best {
            Some(moves) => SolveResult::solved(moves, iteration),
            None => SolveResult::unsolved(SolveStatus::ReachedMaxIterations, iteration),
        }
    }

    /// Walks the predecessor chain back from the winning canonical board,
    /// then replays the path forward against un-normalized boards, pushing
    /// the cascade permutation through `BoardNormalization` so the emitted
    /// moves are valid for the caller's original layout.
    fn assemble_moves(&self, end: &Board) -> Vec<Move> {
        let mut chain = Vec::new();
        let mut board = end;
        while let Some(node) = self.visited.get(board) {
            let (Some(previous), Some(mov)) = (node.previous.as_ref(), node.mov) else {
                break;
            };
            chain.push((previous, mov));
            board = previous;
        }
        chain.reverse();

        let mut norm = BoardNormalization::new();
        let mut moves = Vec::with_capacity(chain.len());
        for (previous, mov) in chain {
            moves.push(norm.translate(mov));
            let mut replayed = previous.clone();
            replayed.apply_move(mov);
            replayed.apply_auto_moves();
            norm.advance(&replayed);
        }
        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fortune_common::card::{KING_RANK, QUEEN_RANK};
    use fortune_common::{CASCADE_COUNT, Card, Suit};

    const STANDARD_DEAL: &str = "
        13 5Y  3B 6G QG - 6B  21 QB  3G 10
        KG  2  QR 4R 3Y - 8Y 10G 7G  3R 4Y
        5R  9  2Y KB 5B - JR   1 19  11 6R
        9Y 4B 10Y 8G 8B - JG   4  0  QY 2B
        16  7  7B 5G  8 - 4G  2G 2R  6Y 14
        JY 15  KY 9R 18 -  3  8R 7Y  20 12
        9B KR 10R  6 7R -  5  17 JB 10B 9G";

    const SPARSE_DEAL: &str = "
        7B   -  3Y  6G  5B  KY 10R  QB   -  5G   -
         -   -  KR  7G  4B  QY  JB  KB   -  21   -
         -   -   -  8G   -  JY 10B   -   -  8B   -
         -   -   -  9G   - 10Y  9B   -   -  3B   -
         -   -   - 10G   -  9Y   -   -   -  2Y   -
         -   -   -  JG   -  8Y   -   -   -  6B   -
         -   -   -  QG   -  7Y   -   -   -  QR   -
         -   -   -  KG   -  6Y   -   -   -  JR   -
         -   -   -   -   -  5Y   -   -   -   -   -
         -   -   -   -   -  4Y   -   -   -   -   -";

    fn replay(board: &Board, moves: &[Move]) -> Board {
        let mut replayed = board.clone();
        replayed.apply_auto_moves();
        for &mov in moves {
            replayed.apply_move(mov);
            replayed.apply_auto_moves();
        }
        replayed
    }

    fn arcana_ladder() -> Board {
        let mut cascades: Vec<Vec<Card>> = (0..CASCADE_COUNT)
            .map(|i| vec![Card::new(i as u8, Suit::Arcana).unwrap()])
            .collect();
        cascades[0].push(Card::new(QUEEN_RANK, Suit::Blue).unwrap());
        cascades[0].push(Card::new(KING_RANK, Suit::Blue).unwrap());
        Board::new(cascades, None).unwrap()
    }

    #[test]
    fn test_solve_arcana_ladder() {
        let board = arcana_ladder();
        let result = Solver::new(board.clone()).solve(&SolveOptions::default());
        assert_eq!(result.status, SolveStatus::Solved);

        // Freeing the buried 0 takes a single move; everything else is
        // forced, and the anytime search settles on the one-move solution.
        let moves = result.moves.unwrap();
        assert_eq!(moves.len(), 1);
        assert!(replay(&board, &moves).is_won());
    }

    #[test]
    fn test_solve_standard_deal() {
        let board = Board::parse(STANDARD_DEAL).unwrap();
        let options = SolveOptions {
            max_iterations: 200_000,
            max_steps: 70,
            stop_at_first: true,
        };
        let result = Solver::new(board.clone()).solve(&options);
        assert_eq!(result.status, SolveStatus::Solved);

        let moves = result.moves.unwrap();
        assert!(moves.len() < 70);
        assert!(replay(&board, &moves).is_won());
    }

    #[test]
    fn test_solve_sparse_deal() {
        let board = Board::parse(SPARSE_DEAL).unwrap();
        let options = SolveOptions {
            max_iterations: 200_000,
            max_steps: 70,
            stop_at_first: true,
        };
        let result = Solver::new(board.clone()).solve(&options);
        assert_eq!(result.status, SolveStatus::Solved);

        let moves = result.moves.unwrap();
        assert!(moves.len() < 70);
        assert!(replay(&board, &moves).is_won());
    }

    #[test]
    fn test_zero_iteration_budget() {
        let result = Solver::new(arcana_ladder()).solve(&SolveOptions {
            max_iterations: 0,
            ..Default::default()
        });
        assert_eq!(result.status, SolveStatus::ReachedMaxIterations);
        assert_eq!(result.iterations, 0);
        assert!(result.moves.is_none());
    }

    #[test]
    fn test_no_solution_within_step_bound() {
        let result = Solver::new(arcana_ladder()).solve(&SolveOptions {
            max_steps: 0,
            ..Default::default()
        });
        assert_eq!(result.status, SolveStatus::NoSolution);
        assert!(result.moves.is_none());
    }

    #[test]
    fn test_cancellation_before_first_iteration() {
        let control = SolveControl::new();
        control.cancel();
        let result = Solver::new(arcana_ladder()).solve_with(
            &SolveOptions::default(),
            Some(&control),
            |_| {},
        );
        assert_eq!(result.status, SolveStatus::ReachedMaxIterations);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_solved_start_yields_empty_move_list() {
        let board = Board::new(vec![Vec::new(); CASCADE_COUNT], None).unwrap();
        let result = Solver::new(board).solve(&SolveOptions::default());
        assert_eq!(result.status, SolveStatus::Solved);
        assert_eq!(result.moves.unwrap().len(), 0);
    }
}
