mod utils;

use crate::utils::*;

use anyhow::{Context, Result, bail};
use clap::Parser;
use fortune_common::Board;
use fortune_solver::SolveOptions;

use std::{
    io::{IsTerminal, Read, stdin},
    path::PathBuf,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Deal a pseudo-random board from a seed
    #[arg(short, long, value_name = "SEED")]
    seed: Option<u64>,
    /// Max search iterations before giving up
    #[arg(short = 'i', long, default_value_t = 500_000, value_name = "NUM")]
    max_iterations: u32,
    /// Max number of moves a solution may have
    #[arg(short = 'm', long, default_value_t = 100, value_name = "NUM")]
    max_steps: u32,
    /// Stop at the first found solution (may not be the shortest)
    #[arg(short, long)]
    first: bool,
    /// Preview the initial board without solving
    #[arg(short, long)]
    preview: bool,
    /// Solve the boards dealt from seeds 0..N and print a summary
    #[arg(long, value_name = "N", conflicts_with_all = ["seed", "file", "preview"])]
    benchmark: Option<u64>,
    /// Path to a board layout file
    file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = SolveOptions {
        max_iterations: cli.max_iterations,
        max_steps: cli.max_steps,
        stop_at_first: cli.first,
    };

    if let Some(count) = cli.benchmark {
        return run_benchmark(count, &options);
    }

    let board = if let Some(file) = &cli.file {
        let content = std::fs::read_to_string(file)?;
        Board::parse(&content).context("Failed to parse board")?
    } else if let Some(seed) = cli.seed {
        Board::deal_from_seed(seed)
    } else if !stdin().is_terminal() {
        let mut content = String::new();
        stdin()
            .read_to_string(&mut content)
            .context("Failed to read from stdin")?;
        Board::parse(&content).context("Failed to parse board")?
    } else {
        bail!("No board layout `file`, stdin, or `--seed` provided.");
    };

    if cli.preview {
        println!("{board}");
        return Ok(());
    }

    do_solve(board, &options)
}
