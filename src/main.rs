use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use csv::Writer;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gridworld_dp::render::{AgentView, GridView};
use gridworld_dp::{
    Algorithm, AlgorithmConfig, AlgorithmKind, GridConfig, GridWorld, VisualizationKind,
    DEFAULT_MAX_STEPS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Which {
    Pi,
    Vi,
    Both,
}

#[derive(Debug, Parser)]
#[command(about = "Solve a stochastic gridworld with policy or value iteration")]
struct Args {
    /// JSON file with `grid` and `algorithm` sections
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    size: Option<usize>,
    /// Seed for both the environment and the algorithms
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    gamma: Option<f64>,
    #[arg(long)]
    theta: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: usize,
    #[arg(long, value_enum, default_value_t = Which::Both)]
    algorithm: Which,
    /// Let the agent follow each solved policy for at most this many moves
    #[arg(long)]
    episode_moves: Option<usize>,
    /// Write the per-step convergence history to this CSV file
    #[arg(long)]
    history: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    grid: GridConfig,
    algorithm: AlgorithmConfig,
}

#[derive(Debug, Serialize)]
struct HistoryRow {
    algorithm: String,
    step: usize,
    delta: f64,
    policy_stable: bool,
}

fn load_config(args: &Args) -> Result<(GridConfig, AlgorithmConfig)> {
    let FileConfig {
        mut grid,
        mut algorithm,
    } = match &args.config {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?
        }
        None => FileConfig::default(),
    };

    if let Some(size) = args.size {
        grid.size = size;
    }
    if let Some(seed) = args.seed {
        grid.seed = seed;
        algorithm.seed = seed;
    }
    if let Some(gamma) = args.gamma {
        algorithm.gamma = gamma;
    }
    if let Some(theta) = args.theta {
        algorithm.theta = theta;
    }
    Ok((grid, algorithm))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let (grid_config, algorithm_config) = load_config(&args)?;
    let mut env = GridWorld::new(&grid_config).context("building the grid")?;
    info!(size = env.size(), seed = grid_config.seed, "environment ready");
    println!("{}", GridView::new(&env, None, VisualizationKind::Rewards));

    let kinds: &[AlgorithmKind] = match args.algorithm {
        Which::Pi => &[AlgorithmKind::PolicyIteration],
        Which::Vi => &[AlgorithmKind::ValueIteration],
        Which::Both => &[AlgorithmKind::PolicyIteration, AlgorithmKind::ValueIteration],
    };

    let mut history = Vec::new();
    let mut solved = Vec::new();
    for &kind in kinds {
        let mut alg = Algorithm::new(kind, &env, &algorithm_config)?;
        let outcome = alg.run_with(&env, args.max_steps, |step, report| {
            history.push(HistoryRow {
                algorithm: kind.to_string(),
                step,
                delta: report.delta,
                policy_stable: report.policy_stable,
            })
        })?;

        let status = if outcome.is_converged() { "converged" } else { "stopped" };
        println!(
            "{}: {} after {} steps (delta {:.3e})",
            kind,
            status,
            outcome.steps(),
            outcome.delta()
        );
        println!("{}", GridView::new(&env, Some(&alg), VisualizationKind::StateValues));
        println!("{}", GridView::new(&env, Some(&alg), VisualizationKind::Policy));

        if let Some(max_moves) = args.episode_moves {
            let episode = alg.run_episode(&mut env, max_moves)?;
            println!(
                "episode: {} moves, reward {:.1}, reached goal: {}",
                episode.moves, episode.reward, episode.reached_terminal
            );
            println!("{}", AgentView(&env));
        }
        solved.push(alg);
    }

    if let [first, second] = solved.as_slice() {
        let gap = (&first.values() - &second.values())
            .iter()
            .fold(0.0_f64, |acc, d| acc.max(d.abs()));
        println!("max |V_{} - V_{}| = {:.3e}", first.kind(), second.kind(), gap);
    }

    if let Some(path) = &args.history {
        let mut wtr = Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
        for row in &history {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        info!(rows = history.len(), path = %path.display(), "history written");
    }
    Ok(())
}
