use anyhow::{Result, bail};
use fortune_common::Board;
use fortune_solver::{SolveOptions, SolveResult, SolveStatus, Solver, solve};

use std::{
    io::{IsTerminal, Write, stderr},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

pub fn do_solve(board: Board, options: &SolveOptions) -> Result<()> {
    println!("{board}");
    let timer = Instant::now();
    let result = solve_with_spinner(board.clone(), options);
    let elapsed_str = format_elapsed(timer.elapsed());

    match result.status {
        SolveStatus::Solved => {
            let moves = result.moves.unwrap_or_default();
            println!(
                "✓ Solved in {} moves — Time: {elapsed_str}, Iterations: {}\n",
                moves.len(),
                result.iterations
            );
            let mut replayed = board;
            replayed.apply_auto_moves();
            for (index, mov) in moves.iter().enumerate() {
                println!("{:>3}. {mov}", index + 1);
                replayed.apply_move(*mov);
                replayed.apply_auto_moves();
            }
            if !replayed.is_won() {
                bail!("Replaying the solution did not reach a won board.");
            }
            Ok(())
        }
        SolveStatus::NoSolution => bail!(
            "No solution with at most {} moves (searched {} iterations in {elapsed_str}).",
            options.max_steps,
            result.iterations
        ),
        SolveStatus::ReachedMaxIterations => bail!(
            "Gave up after {} iterations ({elapsed_str}); retry with a larger --max-iterations.",
            result.iterations
        ),
    }
}

pub fn run_benchmark(count: u64, options: &SolveOptions) -> Result<()> {
    let next_seed = AtomicU64::new(0);
    let results: Mutex<Vec<SolveResult>> = Mutex::new(Vec::with_capacity(count as usize));
    let threads = std::thread::available_parallelism().map_or(1, |n| n.get());

    // Independent solves share nothing; only the result sink is guarded.
    std::thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                loop {
                    let seed = next_seed.fetch_add(1, Ordering::Relaxed);
                    if seed >= count {
                        break;
                    }
                    let board = Board::deal_from_seed(seed);
                    let result = solve(board, options);
                    println!("{seed:>5}  {}", summarize(&result));
                    results.lock().unwrap().push(result);
                }
            });
        }
    });

    let results = results.into_inner().unwrap();
    let solved = results.iter().filter(|r| r.is_solved()).count();
    let iterations: u64 = results.iter().map(|r| r.iterations as u64).sum();
    let moves: usize = results
        .iter()
        .map(|r| r.moves.as_ref().map_or(0, |m| m.len()))
        .sum();
    println!("\nSolved {solved}/{count} — Total iterations: {iterations}, Total moves: {moves}");
    Ok(())
}

fn summarize(result: &SolveResult) -> String {
    match result.status {
        SolveStatus::Solved => format!(
            "Solved in {} moves ({} iterations)",
            result.moves.as_ref().map_or(0, |m| m.len()),
            result.iterations
        ),
        SolveStatus::NoSolution => format!("No solution ({} iterations)", result.iterations),
        SolveStatus::ReachedMaxIterations => {
            format!("Reached max iterations ({})", result.iterations)
        }
    }
}

fn solve_with_spinner(board: Board, options: &SolveOptions) -> SolveResult {
    if !stderr().is_terminal() {
        return Solver::new(board).solve(options);
    }

    let spinning = Arc::new(AtomicBool::new(true));
    let iterations = Arc::new(AtomicU32::new(0));
    let best = Arc::new(AtomicU32::new(0));

    let handle = {
        let spinning = Arc::clone(&spinning);
        let iterations = Arc::clone(&iterations);
        let best = Arc::clone(&best);

        std::thread::spawn(move || {
            let spinner_chars = ['|', '/', '-', '\\'];
            let mut i = 0;
            let stderr = stderr();
            let mut handle = stderr.lock();

            let _ = write!(handle, "\x1b[?25l"); // hide cursor
            let _ = handle.flush();

            while spinning.load(Ordering::Relaxed) {
                let spinner_char = spinner_chars[i % spinner_chars.len()];
                let n = iterations.load(Ordering::Relaxed);
                let b = best.load(Ordering::Relaxed);
                let best_str = if b == 0 {
                    String::new()
                } else {
                    format!(", best: {b} moves")
                };
                let _ = write!(
                    handle,
                    "\r\x1b[2K{spinner_char} Solving… {n} iterations{best_str}"
                );
                let _ = handle.flush();
                std::thread::sleep(Duration::from_millis(100));
                i += 1;
            }

            let _ = write!(handle, "\r\x1b[2K\r\x1b[?25h"); // clear line and show cursor
            let _ = handle.flush();
        })
    };

    let result = Solver::new(board).solve_with(options, None, |progress| {
        iterations.store(progress.iteration, Ordering::Relaxed);
        best.store(progress.best_move_count.unwrap_or(0), Ordering::Relaxed);
    });
    spinning.store(false, Ordering::Relaxed);
    let _ = handle.join();
    result
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 90 {
        let ms = elapsed.subsec_millis();
        format!("{secs}.{ms:03}s")
    } else {
        let minutes = secs / 60;
        let secs = secs % 60;
        format!("{minutes}m {secs}s")
    }
}
