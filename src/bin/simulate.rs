use clap::Parser;
use maze_chase::constants::TICK_MS;
use maze_chase::engine::GameEngine;
use maze_chase::grid::BlockSet;
use maze_chase::log::{default_session_id, emit_log, now_ms};
use maze_chase::pathfinding::shortest_path;
use maze_chase::render::{draw_frame, TextSink};
use maze_chase::rng::Rng;
use maze_chase::types::{
    CellCode, Direction, GameConfig, GameEvent, InputCommand, Mode, SessionStatus, Snapshot,
};
use maze_chase::world::classic_world;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 3)]
    runs: u32,
    /// Hard stop per run, in ticks.
    #[arg(long, default_value_t = 60 * 60 * 10)]
    max_ticks: u64,
    /// Override the ghosts' pursuit probability (0.0..=1.0).
    #[arg(long)]
    pursuit: Option<f32>,
    #[arg(long)]
    session_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
    /// Print the final board of every run to stderr.
    #[arg(long)]
    render: bool,
}

#[derive(Clone, Debug, Serialize)]
struct RunResultLine {
    run: u32,
    seed: u32,
    status: SessionStatus,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    ticks: u64,
    score: i32,
    #[serde(rename = "pickupsEaten")]
    pickups_eaten: usize,
    #[serde(rename = "pickupsLeft")]
    pickups_left: usize,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    #[serde(rename = "ghostsRevived")]
    ghosts_revived: u32,
    #[serde(rename = "powerModes")]
    power_modes: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct RunOutcome {
    result: RunResultLine,
    anomaly_records: Vec<AnomalyRecord>,
    board: String,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "runCount")]
    run_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "averageScore")]
    average_score: i32,
    #[serde(rename = "statusCounts")]
    status_counts: BTreeMap<String, usize>,
    runs: Vec<RunResultLine>,
}

/// Values carried from one snapshot to the next for consistency checks.
#[derive(Clone, Debug, Default)]
struct Watch {
    score: i32,
    pickups_left: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    let base_seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));
    let run_started_at_ms = now_ms();
    let session_id = cli
        .session_id
        .clone()
        .unwrap_or_else(|| default_session_id("sim", base_seed, run_started_at_ms));
    let mut config = GameConfig::default();
    if let Some(pursuit) = cli.pursuit {
        config.pursuit_probability = pursuit;
    }
    let config = config.sanitized();

    let mut results = Vec::new();
    let mut status_counts = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for run in 0..cli.runs.max(1) {
        let seed = base_seed.wrapping_add(run);
        emit_log(
            "info",
            "run_started",
            &session_id,
            Some(seed),
            None,
            json!({
                "run": run,
                "config": config,
                "maxTicks": cli.max_ticks,
            }),
        );

        let outcome = run_session(run, seed, &config, cli.max_ticks, &session_id);
        for anomaly in &outcome.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &session_id,
                Some(seed),
                Some(anomaly.tick),
                json!({ "message": anomaly.message }),
            );
        }
        total_anomalies += outcome.anomaly_records.len();
        *status_counts
            .entry(status_key(outcome.result.status))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "run_finished",
            &session_id,
            Some(seed),
            Some(outcome.result.ticks),
            json!({
                "status": outcome.result.status,
                "score": outcome.result.score,
                "pickupsLeft": outcome.result.pickups_left,
                "anomalyCount": outcome.anomaly_records.len(),
            }),
        );
        if cli.render {
            eprintln!("{}", outcome.board);
        }

        match serde_json::to_string(&outcome.result) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("[simulate] failed to serialize run result: {err}"),
        }
        results.push(outcome.result);
    }

    let summary = build_run_summary(
        session_id.clone(),
        run_started_at_ms,
        now_ms(),
        results,
        status_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &session_id,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "simulation_finished",
        &session_id,
        None,
        None,
        json!({
            "runCount": summary.run_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "averageScore": summary.average_score,
            "statusCounts": summary.status_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if total_anomalies > 0 {
        std::process::exit(1);
    }
}

fn run_session(
    run: u32,
    seed: u32,
    config: &GameConfig,
    max_ticks: u64,
    session_id: &str,
) -> RunOutcome {
    let mut engine = GameEngine::new(classic_world(), config.clone(), seed);
    let mut autopilot = Rng::new(seed ^ 0x5eed);
    let mut watch = Watch::default();
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut ghosts_revived = 0;

    while !engine.is_ended() {
        if let Some(dir) = choose_player_direction(&engine, &mut autopilot) {
            engine.receive_input(InputCommand::Turn(dir));
        }
        engine.step(TICK_MS);
        let snapshot = engine.build_snapshot(true);

        for message in collect_snapshot_anomalies(&engine, &snapshot, &mut watch) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        for event in &snapshot.events {
            match event {
                GameEvent::GhostRevived { .. } => ghosts_revived += 1,
                GameEvent::PowerModeStarted { until_ms } => emit_log(
                    "info",
                    "power_mode_started",
                    session_id,
                    Some(seed),
                    Some(snapshot.tick),
                    json!({ "untilMs": until_ms }),
                ),
                GameEvent::PlayerDied { by } => emit_log(
                    "info",
                    "player_died",
                    session_id,
                    Some(seed),
                    Some(snapshot.tick),
                    json!({ "by": by, "score": snapshot.score }),
                ),
                _ => {}
            }
        }

        if snapshot.tick >= max_ticks {
            engine.receive_input(InputCommand::Quit);
            engine.step(TICK_MS);
            break;
        }
    }

    let summary = engine.build_summary();
    let snapshot = engine.build_snapshot(false);
    let mut sink = TextSink::new(engine.world.grid.rows(), engine.world.grid.cols());
    draw_frame(&engine.world.grid, &snapshot, &mut sink);

    RunOutcome {
        result: RunResultLine {
            run,
            seed,
            status: summary.status,
            duration_ms: summary.duration_ms,
            ticks: summary.ticks,
            score: summary.score,
            pickups_eaten: summary.pickups_eaten,
            pickups_left: summary.pickups_left,
            ghosts_eaten: summary.ghosts_eaten,
            ghosts_revived,
            power_modes: summary.power_modes,
            anomalies,
        },
        anomaly_records,
        board: sink.render(),
    }
}

/// Heads for the nearest pickup, with an occasional random turn so runs differ.
fn choose_player_direction(engine: &GameEngine, rng: &mut Rng) -> Option<Direction> {
    let player = engine.player();
    if player.mode == Mode::Dead || !player.is_aligned() {
        return None;
    }
    let grid = &engine.world.grid;
    let here = player.middle_tile(grid.cols());
    if rng.chance(0.05) {
        let open: Vec<Direction> = player.available_directions(grid);
        return rng.pick(&open);
    }

    let pickups: Vec<_> = grid.pickups().map(|(tile, _)| tile).collect();
    let path = shortest_path(grid, &pickups, here, BlockSet::CONFINED)?;
    // the path runs from the nearest pickup to the player
    let next = path.iter().rev().nth(1)?;
    here.direction_to(*next)
}

fn collect_snapshot_anomalies(
    engine: &GameEngine,
    snapshot: &Snapshot,
    watch: &mut Watch,
) -> Vec<String> {
    let mut anomalies = Vec::new();
    let board_width = engine.world.board_width();
    let board_height = engine.world.board_height();

    if snapshot.score < watch.score {
        anomalies.push(format!("score went down: {} -> {}", watch.score, snapshot.score));
    }
    watch.score = snapshot.score;

    if let Some(previous) = watch.pickups_left {
        if snapshot.pickups_left > previous {
            anomalies.push(format!(
                "pickups reappeared: {previous} -> {}",
                snapshot.pickups_left
            ));
        }
    }
    watch.pickups_left = Some(snapshot.pickups_left);

    if snapshot.status == SessionStatus::Running && snapshot.pickups_left == 0 {
        anomalies.push("no pickups left but session still running".to_string());
    }
    if snapshot.power_left_ms > engine.config.power_duration_ms {
        anomalies.push(format!("power mode too long: {}ms", snapshot.power_left_ms));
    }

    for entity in &snapshot.entities {
        if entity.x < 0 || entity.x >= board_width || entity.y < 0 || entity.y >= board_height {
            anomalies.push(format!(
                "entity {} off board at ({}, {})",
                entity.id.0, entity.x, entity.y
            ));
            continue;
        }
        if engine.world.grid.cell_at(entity.tile.row, entity.tile.col) == Ok(CellCode::Wall) {
            anomalies.push(format!(
                "entity {} inside a wall at {:?}",
                entity.id.0, entity.tile
            ));
        }
    }
    anomalies
}

fn status_key(status: SessionStatus) -> String {
    match status {
        SessionStatus::Running => "running",
        SessionStatus::Won => "won",
        SessionStatus::Lost => "lost",
        SessionStatus::Quit => "quit",
    }
    .to_string()
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn build_run_summary(
    session_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    runs: Vec<RunResultLine>,
    status_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let run_count = runs.len();
    let (average_duration_ms, average_score) = if run_count == 0 {
        (0, 0)
    } else {
        let total_duration: u64 = runs.iter().map(|run| run.duration_ms).sum();
        let total_score: i64 = runs.iter().map(|run| i64::from(run.score)).sum();
        (
            total_duration / run_count as u64,
            (total_score / run_count as i64) as i32,
        )
    };
    RunSummary {
        session_id,
        started_at_ms,
        finished_at_ms,
        run_count,
        anomaly_count,
        average_duration_ms,
        average_score,
        status_counts,
        runs,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
