use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use maze_chase::engine::{Simulation, SimulationOptions, StepError};
use maze_chase::maze::MazeDefinition;
use maze_chase::rng::Rng;
use maze_chase::types::{Direction, GhostState, Outcome};
use serde::Serialize;
use serde_json::{json, Value};

/// Headless soak runner: plays the built-in maze with a scripted player and
/// prints one JSON line per run, so engine changes can be eyeballed for
/// balance and checked for determinism without a front end.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Seed for the first run; later runs increment it. Random if omitted.
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long, default_value_t = 1)]
    runs: u32,
    /// Safety cap per run.
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u64,
    #[arg(long)]
    pursuit_bias: Option<f32>,
    #[arg(long)]
    frightened_scatter: Option<f32>,
    /// Also emit a log line per runtime event.
    #[arg(long)]
    emit_events: bool,
}

#[derive(Clone, Debug, Serialize)]
struct RunResultLine {
    run: u32,
    seed: u32,
    ticks: u64,
    score: u32,
    outcome: Outcome,
    #[serde(rename = "pelletsRemaining")]
    pellets_remaining: u32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: usize,
    #[serde(rename = "powerPelletsEaten")]
    power_pellets_eaten: usize,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine<'a> {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: &'a str,
    event: &'a str,
    seed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let base_seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    let mut outcomes: Vec<RunResultLine> = Vec::new();

    for run in 0..cli.runs {
        let seed = base_seed.wrapping_add(run);
        let mut options = SimulationOptions {
            seed,
            ..SimulationOptions::default()
        };
        if let Some(bias) = cli.pursuit_bias {
            options.pursuit_bias = bias;
        }
        if let Some(scatter) = cli.frightened_scatter {
            options.frightened_scatter = scatter;
        }

        emit_log("info", "run_started", seed, None, json!({ "run": run }));
        let result = play_run(run, seed, options, cli.max_ticks, cli.emit_events);
        emit_log(
            "info",
            "run_finished",
            seed,
            Some(result.ticks),
            json!({
                "outcome": result.outcome,
                "score": result.score,
                "pelletsRemaining": result.pellets_remaining,
            }),
        );
        println!(
            "{}",
            serde_json::to_string(&result).expect("run result should serialize")
        );
        outcomes.push(result);
    }

    let stalled = outcomes
        .iter()
        .filter(|result| result.outcome == Outcome::InProgress)
        .count();
    emit_log(
        "info",
        "batch_finished",
        base_seed,
        None,
        json!({
            "runs": outcomes.len(),
            "won": outcomes.iter().filter(|r| r.outcome == Outcome::Won).count(),
            "lost": outcomes.iter().filter(|r| r.outcome == Outcome::Lost).count(),
            "stalled": stalled,
        }),
    );
    if stalled > 0 {
        std::process::exit(1);
    }
}

fn play_run(
    run: u32,
    seed: u32,
    options: SimulationOptions,
    max_ticks: u64,
    emit_events: bool,
) -> RunResultLine {
    let definition = MazeDefinition::classic();
    let mut sim = match Simulation::new(&definition, options) {
        Ok(sim) => sim,
        Err(error) => {
            emit_log(
                "error",
                "maze_rejected",
                seed,
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };
    let mut policy_rng = Rng::new(seed ^ 0x9e37_79b9);
    let mut ticks = 0u64;
    let mut ghosts_eaten = 0usize;
    let mut power_pellets_eaten = 0usize;

    while ticks < max_ticks {
        let requested = choose_player_direction(&sim, &mut policy_rng);
        match sim.step(requested) {
            Ok(result) => {
                ticks = result.tick;
                ghosts_eaten += result.ghosts_eaten.len();
                if result.power_pellet_eaten {
                    power_pellets_eaten += 1;
                }
                if emit_events {
                    for event in &result.events {
                        emit_log(
                            "debug",
                            "runtime_event",
                            seed,
                            Some(result.tick),
                            json!({ "event": event }),
                        );
                    }
                }
                if result.outcome.is_terminal() {
                    break;
                }
            }
            Err(StepError::RunAlreadyFinished) => break,
        }
    }

    let state = sim.run_state();
    RunResultLine {
        run,
        seed,
        ticks,
        score: state.score,
        outcome: state.outcome,
        pellets_remaining: state.pellets_remaining,
        ghosts_eaten,
        power_pellets_eaten,
    }
}

/// Scripted player: walk toward the nearest pellet, weight moves that stay
/// clear of dangerous ghosts, add a little noise so runs differ by seed.
fn choose_player_direction(sim: &Simulation, rng: &mut Rng) -> Direction {
    let snapshot = sim.snapshot();
    let player = snapshot.player;

    let mut pellets = snapshot.pellets.clone();
    pellets.extend(snapshot.power_pellets.iter().copied());
    let nearest_pellet = pellets
        .iter()
        .min_by_key(|(px, py)| manhattan(player.x, player.y, *px, *py))
        .copied();

    let threats: Vec<(i32, i32)> = snapshot
        .ghosts
        .iter()
        .filter(|ghost| matches!(ghost.state, GhostState::Chase | GhostState::LeavingHome))
        .map(|ghost| (ghost.x, ghost.y))
        .collect();

    let mut best = Direction::None;
    let mut best_score = f32::NEG_INFINITY;
    for dir in [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ] {
        let (dx, dy) = dir.delta();
        let nx = player.x + dx;
        let ny = player.y + dy;
        if sim.grid().is_wall(nx, ny, None) {
            continue;
        }
        let mut score = 0.0f32;
        if let Some((px, py)) = nearest_pellet {
            let before = manhattan(player.x, player.y, px, py);
            let after = manhattan(nx, ny, px, py);
            score += (before - after) as f32;
        }
        if let Some(threat) = threats
            .iter()
            .map(|(gx, gy)| manhattan(nx, ny, *gx, *gy))
            .min()
        {
            if threat <= 3 {
                score -= (4 - threat) as f32 * 5.0;
            }
        }
        score += rng.next_f32() * 0.5;
        if score > best_score {
            best_score = score;
            best = dir;
        }
    }
    best
}

fn manhattan(ax: i32, ay: i32, bx: i32, by: i32) -> i32 {
    (ax - bx).abs() + (ay - by).abs()
}

fn emit_log(level: &str, event: &str, seed: u32, tick: Option<u64>, details: Value) {
    let line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level,
        event,
        seed,
        tick,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&line).expect("log line should serialize")
    );
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
