use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use corn_maze_engine::dispatch::Action;
use corn_maze_engine::local_service::{LocalMazeService, LocalMazeServiceOptions};
use corn_maze_engine::session::{MazeSession, MoveFeedback, SessionOptions, SessionPhase};
use corn_maze_engine::types::Direction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};

const DIRECTIONS: [Direction; 4] = [
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
];

const PAUSE_CHECK_INTERVAL: u32 = 25;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Run a single maze instead of the built-in scenario list.
    #[arg(long)]
    maze: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_steps: Option<u32>,
    /// Add simulated service latency to each call.
    #[arg(long)]
    latency: bool,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    maze_id: String,
    seed: u64,
    max_steps: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    #[serde(rename = "mazeId")]
    maze_id: String,
    seed: u64,
    steps: u32,
    score: i32,
    #[serde(rename = "elapsedSeconds")]
    elapsed_seconds: u64,
    completed: bool,
    #[serde(rename = "knowledgeCount")]
    knowledge_count: usize,
    #[serde(rename = "challengeCount")]
    challenge_count: usize,
    #[serde(rename = "rewardsSeen")]
    rewards_seen: usize,
    #[serde(rename = "rejectedMoves")]
    rejected_moves: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    scenarios: Vec<ScenarioResultLine>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let mut results = Vec::new();
    let mut anomaly_count = 0usize;

    for scenario in scenarios {
        info!(
            scenario = %scenario.name,
            maze = %scenario.maze_id,
            seed = scenario.seed,
            "scenario started"
        );
        let result = run_scenario(&scenario, cli.latency).await;
        for anomaly in &result.anomalies {
            warn!(scenario = %scenario.name, anomaly = %anomaly, "anomaly detected");
        }
        anomaly_count += result.anomalies.len();
        println!(
            "{}",
            serde_json::to_string(&result).expect("scenario result should serialize")
        );
        results.push(result);
    }

    let summary = RunSummary {
        scenario_count: results.len(),
        anomaly_count,
        scenarios: results,
    };
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            warn!(path = %path.to_string_lossy(), error = %error, "summary write failed");
            std::process::exit(2);
        }
    }

    info!(
        scenarios = summary.scenario_count,
        anomalies = summary.anomaly_count,
        "run finished"
    );
    if summary.anomaly_count > 0 {
        std::process::exit(1);
    }
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    });
    let max_steps = cli.max_steps.unwrap_or(2_000).clamp(1, 100_000);

    if let Some(maze_id) = cli.maze.as_ref() {
        return vec![Scenario {
            name: format!("custom-{maze_id}"),
            maze_id: maze_id.clone(),
            seed,
            max_steps,
        }];
    }

    vec![
        Scenario {
            name: "quick-meadow".to_string(),
            maze_id: "meadow".to_string(),
            seed,
            max_steps,
        },
        Scenario {
            name: "soak-orchard".to_string(),
            maze_id: "orchard".to_string(),
            seed: seed.wrapping_add(1),
            max_steps,
        },
    ]
}

async fn run_scenario(scenario: &Scenario, latency: bool) -> ScenarioResultLine {
    let options = LocalMazeServiceOptions {
        latency_ms: if latency { Some((5, 40)) } else { None },
        seed: scenario.seed,
    };
    let service = Arc::new(LocalMazeService::new(options));
    let mut anomalies = Vec::new();
    let mut anomaly_seen = HashSet::new();

    let session = match MazeSession::start(
        service,
        "sim-walker",
        &scenario.maze_id,
        SessionOptions::default(),
    )
    .await
    {
        Ok(session) => session,
        Err(error) => {
            return ScenarioResultLine {
                scenario: scenario.name.clone(),
                maze_id: scenario.maze_id.clone(),
                seed: scenario.seed,
                steps: 0,
                score: 0,
                elapsed_seconds: 0,
                completed: false,
                knowledge_count: 0,
                challenge_count: 0,
                rewards_seen: 0,
                rejected_moves: 0,
                anomalies: vec![format!("session start failed: {error}")],
            };
        }
    };

    let maze = session.maze().await;
    let mut rng = StdRng::seed_from_u64(scenario.seed);
    let mut rewards_seen = 0usize;
    let mut rejected_moves = 0u32;
    let mut completed = false;
    let mut previous = session.progress().await;

    for attempt in 0..scenario.max_steps {
        if attempt > 0 && attempt % PAUSE_CHECK_INTERVAL == 0 {
            exercise_pause_resume(&session, &mut anomalies, &mut anomaly_seen).await;
        }

        let direction = DIRECTIONS[rng.random_range(0..DIRECTIONS.len())];
        let feedback = session.attempt_move(direction).await;
        match feedback {
            MoveFeedback::Ignored => {
                push_anomaly(
                    &mut anomalies,
                    &mut anomaly_seen,
                    "move ignored while playing".to_string(),
                );
            }
            MoveFeedback::Rejected { .. } => {
                rejected_moves += 1;
            }
            MoveFeedback::Failed { message } => {
                push_anomaly(
                    &mut anomalies,
                    &mut anomaly_seen,
                    format!("move failed: {message}"),
                );
            }
            MoveFeedback::Accepted { action } => {
                let progress = session.progress().await;
                if progress.steps_count != previous.steps_count + 1 {
                    push_anomaly(
                        &mut anomalies,
                        &mut anomaly_seen,
                        format!(
                            "steps jumped from {} to {}",
                            previous.steps_count, progress.steps_count
                        ),
                    );
                }
                if progress.score < previous.score {
                    push_anomaly(
                        &mut anomalies,
                        &mut anomaly_seen,
                        format!("score dropped from {} to {}", previous.score, progress.score),
                    );
                }
                if !maze.is_walkable(progress.current_position) {
                    push_anomaly(
                        &mut anomalies,
                        &mut anomaly_seen,
                        format!(
                            "avatar on a non-walkable cell ({}, {})",
                            progress.current_position.x, progress.current_position.y
                        ),
                    );
                }
                if progress.acquired_knowledge.len() < previous.acquired_knowledge.len()
                    || progress.completed_challenges.len() < previous.completed_challenges.len()
                {
                    push_anomaly(
                        &mut anomalies,
                        &mut anomaly_seen,
                        "acquired id set shrank".to_string(),
                    );
                }
                previous = progress;

                match action {
                    Action::OpenKnowledge(_) | Action::OpenChallenge(_) => {
                        session.close_modal().await;
                    }
                    Action::ShowReward(_) => {
                        rewards_seen += 1;
                    }
                    Action::Complete => {
                        completed = true;
                    }
                    Action::Continue => {}
                }
                if completed {
                    break;
                }
            }
        }
    }

    if completed {
        let after = session.attempt_move(Direction::North).await;
        if after != MoveFeedback::Ignored {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_seen,
                "move accepted after completion".to_string(),
            );
        }
        if session.phase().await != SessionPhase::Completed {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_seen,
                "phase is not completed after goal".to_string(),
            );
        }
    }

    let progress = session.progress().await;
    ScenarioResultLine {
        scenario: scenario.name.clone(),
        maze_id: scenario.maze_id.clone(),
        seed: scenario.seed,
        steps: progress.steps_count,
        score: progress.score,
        elapsed_seconds: session.elapsed_seconds().await,
        completed,
        knowledge_count: progress.acquired_knowledge.len(),
        challenge_count: progress.completed_challenges.len(),
        rewards_seen,
        rejected_moves,
        anomalies,
    }
}

async fn exercise_pause_resume(
    session: &MazeSession,
    anomalies: &mut Vec<String>,
    anomaly_seen: &mut HashSet<String>,
) {
    let elapsed_before = session.elapsed_seconds().await;
    if !session.pause().await {
        push_anomaly(
            anomalies,
            anomaly_seen,
            "pause refused while playing".to_string(),
        );
        return;
    }
    if session.attempt_move(Direction::North).await != MoveFeedback::Ignored {
        push_anomaly(
            anomalies,
            anomaly_seen,
            "move not ignored while paused".to_string(),
        );
    }
    if !session.resume().await {
        push_anomaly(anomalies, anomaly_seen, "resume refused".to_string());
    }
    let elapsed_after = session.elapsed_seconds().await;
    if elapsed_after < elapsed_before {
        push_anomaly(
            anomalies,
            anomaly_seen,
            format!("elapsed went backwards: {elapsed_before} -> {elapsed_after}"),
        );
    }
}

fn push_anomaly(anomalies: &mut Vec<String>, seen: &mut HashSet<String>, message: String) {
    if seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}
