use chrono::{DateTime, Utc};
use clap::Parser;
use dungeon_labyrinth::autopilot::Autopilot;
use dungeon_labyrinth::engine::{EngineError, GameEngine, GameEngineOptions};
use dungeon_labyrinth::pathfinding::player_walkable;
use dungeon_labyrinth::types::{
    ConfigError, GameConfig, GameOverReason, RuntimeEvent, Snapshot, StepOutcome,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_FLOORS: u32 = 3;
const DEFAULT_MAX_TICKS: u64 = 60 * 60 * 5;
const DEFAULT_DT: f32 = 1.0 / 60.0;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    seed: Option<u32>,
    /// Floors to clear before a scenario counts as finished.
    #[arg(long)]
    floors: Option<u32>,
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(long)]
    dt: Option<f32>,
    /// JSON file with `GameConfig` overrides.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum ConfigLoadError {
    #[error("failed to read config: {0}")]
    Read(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u32,
    #[serde(rename = "startFloor")]
    start_floor: u32,
    floors: u32,
    #[serde(rename = "maxTicks")]
    max_ticks: u64,
    dt: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum ScenarioEnd {
    Caught,
    Timeout,
    FloorTarget,
    TickLimit,
}

impl From<GameOverReason> for ScenarioEnd {
    fn from(reason: GameOverReason) -> Self {
        match reason {
            GameOverReason::Caught => ScenarioEnd::Caught,
            GameOverReason::Timeout => ScenarioEnd::Timeout,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
struct EventCounts {
    #[serde(rename = "keysCollected")]
    keys_collected: u32,
    #[serde(rename = "realKeys")]
    real_keys: u32,
    #[serde(rename = "doorsUnlocked")]
    doors_unlocked: u32,
    #[serde(rename = "doorsRejected")]
    doors_rejected: u32,
    #[serde(rename = "powerupsSpawned")]
    powerups_spawned: u32,
    #[serde(rename = "powerupsCollected")]
    powerups_collected: u32,
    #[serde(rename = "powerupsActivated")]
    powerups_activated: u32,
    #[serde(rename = "floorsAdvanced")]
    floors_advanced: u32,
}

impl EventCounts {
    fn record(&mut self, event: &RuntimeEvent) {
        match event {
            RuntimeEvent::KeyCollected { real } => {
                self.keys_collected += 1;
                if *real {
                    self.real_keys += 1;
                }
            }
            RuntimeEvent::DoorUnlocked => self.doors_unlocked += 1,
            RuntimeEvent::DoorRejected => self.doors_rejected += 1,
            RuntimeEvent::PowerupSpawned { .. } => self.powerups_spawned += 1,
            RuntimeEvent::PowerupCollected { .. } => self.powerups_collected += 1,
            RuntimeEvent::PowerupActivated { .. } => self.powerups_activated += 1,
            RuntimeEvent::FloorAdvanced { .. } => self.floors_advanced += 1,
            _ => {}
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    #[serde(rename = "startFloor")]
    start_floor: u32,
    #[serde(rename = "reachedFloor")]
    reached_floor: u32,
    end: ScenarioEnd,
    ticks: u64,
    #[serde(rename = "simSeconds")]
    sim_seconds: f64,
    #[serde(flatten)]
    counts: EventCounts,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageSimSeconds")]
    average_sim_seconds: f64,
    #[serde(rename = "endCounts")]
    end_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    timestamp: String,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at = Utc::now();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, run_started_at));

    let config = match cli.config.as_deref().map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(error) => {
            emit_log(
                "error",
                "config_load_failed",
                &run_id,
                None,
                None,
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };

    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut end_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_sim_seconds = 0.0f64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "startFloor": scenario.start_floor,
                "floors": scenario.floors,
                "maxTicks": scenario.max_ticks,
                "dt": scenario.dt,
            }),
        );
        let scenario_run = match run_scenario(&scenario, &config) {
            Ok(run) => run,
            Err(error) => {
                emit_log(
                    "error",
                    "scenario_failed",
                    &run_id,
                    Some(&scenario.name),
                    Some(scenario.seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_sim_seconds += scenario_run.result.sim_seconds;
        *end_counts
            .entry(end_key(scenario_run.result.end).to_string())
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.result.ticks),
            json!({
                "end": scenario_run.result.end,
                "reachedFloor": scenario_run.result.reached_floor,
                "simSeconds": scenario_run.result.sim_seconds,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&scenario_run.result).expect("scenario result should serialize")
        );
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        run_id.clone(),
        run_started_at,
        Utc::now(),
        scenario_results,
        end_counts,
        total_anomalies,
        total_sim_seconds,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
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
        "run_finished",
        &run_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageSimSeconds": summary.average_sim_seconds,
            "endCounts": summary.end_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario, config: &GameConfig) -> Result<ScenarioRunResult, EngineError> {
    let mut engine = GameEngine::new(GameEngineOptions {
        seed: scenario.seed,
        config: config.clone(),
        start_floor: scenario.start_floor,
        ..GameEngineOptions::default()
    })?;
    let pilot = Autopilot::default();
    let target_floor = scenario.start_floor + scenario.floors;

    let mut counts = EventCounts::default();
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut end = ScenarioEnd::TickLimit;

    for _ in 0..scenario.max_ticks {
        let input = pilot.next_input(&engine);
        let outcome = engine.step(scenario.dt, input)?;
        let snapshot = engine.build_snapshot(true);
        let messages = collect_snapshot_anomalies(&snapshot)
            .into_iter()
            .chain(collect_engine_anomalies(&engine));
        for message in messages {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        for event in &snapshot.events {
            counts.record(event);
        }

        match outcome {
            StepOutcome::GameOver { reason } => {
                end = reason.into();
                break;
            }
            StepOutcome::FloorAdvanced { floor } if floor >= target_floor => {
                end = ScenarioEnd::FloorTarget;
                break;
            }
            _ => {}
        }
    }

    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            start_floor: scenario.start_floor,
            reached_floor: engine.floor.number,
            end,
            ticks: engine.tick(),
            sim_seconds: (engine.now() * 100.0).round() / 100.0,
            counts,
            anomalies,
        },
        anomaly_records,
    })
}

fn collect_snapshot_anomalies(snapshot: &Snapshot) -> Vec<String> {
    let mut anomalies = Vec::new();
    if !snapshot.time_left.is_finite() || snapshot.time_left < 0.0 {
        anomalies.push(format!("invalid time left: {}", snapshot.time_left));
    }

    let rows: Vec<Vec<char>> = snapshot.tiles.iter().map(|row| row.chars().collect()).collect();
    if rows.len() != snapshot.height as usize
        || rows.iter().any(|row| row.len() != snapshot.width as usize)
    {
        anomalies.push(format!(
            "tile rows do not match {}x{}",
            snapshot.width, snapshot.height
        ));
    } else {
        let closed = |glyph: char| glyph == '#' || glyph == 'B';
        let last_row = rows.len().saturating_sub(1);
        let open_border = rows.iter().enumerate().any(|(y, row)| {
            let last_col = row.len().saturating_sub(1);
            row.iter().enumerate().any(|(x, glyph)| {
                let on_ring = y == 0 || y == last_row || x == 0 || x == last_col;
                on_ring && !closed(*glyph)
            })
        });
        if open_border {
            anomalies.push("outer ring is not closed".to_string());
        }
    }

    let player = &snapshot.player;
    if drifted(player.float_x, player.float_y, player.x, player.y) {
        anomalies.push(format!(
            "player drifted: tile=({}, {}) float=({:.2}, {:.2})",
            player.x, player.y, player.float_x, player.float_y
        ));
    }
    for enemy in &snapshot.enemies {
        if drifted(enemy.float_x, enemy.float_y, enemy.x, enemy.y) {
            anomalies.push(format!("enemy drifted: {}", enemy.id));
        }
    }
    anomalies
}

fn collect_engine_anomalies(engine: &GameEngine) -> Vec<String> {
    let mut anomalies = Vec::new();
    let floor = &engine.floor;
    let tile = engine.player.tile();
    if !floor.grid.at(tile).map(player_walkable).unwrap_or(false) {
        anomalies.push(format!("player on blocked cell: ({}, {})", tile.x, tile.y));
    }
    let door_cell = floor.doors.state.cell();
    if floor
        .doors
        .positions
        .iter()
        .any(|pos| floor.grid.at(*pos) != Some(door_cell))
    {
        anomalies.push(format!("door cells out of sync with {:?}", floor.doors.state));
    }
    anomalies
}

fn drifted(float_x: f32, float_y: f32, x: i32, y: i32) -> bool {
    (float_x - x as f32).abs() >= 1.0 || (float_y - y as f32).abs() >= 1.0
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    let floors = cli.floors.unwrap_or(DEFAULT_FLOORS).max(1);
    let max_ticks = cli.ticks.unwrap_or(DEFAULT_MAX_TICKS).max(1);
    let dt = cli
        .dt
        .filter(|dt| dt.is_finite() && *dt > 0.0)
        .unwrap_or(DEFAULT_DT);

    if cli.single {
        return vec![Scenario {
            name: format!("custom-floors{floors}"),
            seed,
            start_floor: 1,
            floors,
            max_ticks,
            dt,
        }];
    }

    vec![
        Scenario {
            name: "opening-floors".to_string(),
            seed,
            start_floor: 1,
            floors,
            max_ticks,
            dt,
        },
        Scenario {
            name: "deep-floors".to_string(),
            seed: seed.wrapping_add(1),
            start_floor: 6,
            floors,
            max_ticks,
            dt,
        },
    ]
}

fn load_config(path: &Path) -> Result<GameConfig, ConfigLoadError> {
    let text = std::fs::read_to_string(path)?;
    let config: GameConfig = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
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

fn default_run_id(seed: u32, started_at: DateTime<Utc>) -> String {
    format!("sim-{seed}-{}", started_at.timestamp_millis())
}

fn build_run_summary(
    run_id: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    scenarios: Vec<ScenarioResultLine>,
    end_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_sim_seconds: f64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_sim_seconds = if scenario_count == 0 {
        0.0
    } else {
        total_sim_seconds / scenario_count as f64
    };
    RunSummary {
        run_id,
        started_at: started_at.to_rfc3339(),
        finished_at: finished_at.to_rfc3339(),
        scenario_count,
        anomaly_count,
        average_sim_seconds,
        end_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp: Utc::now().to_rfc3339(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

fn end_key(end: ScenarioEnd) -> &'static str {
    match end {
        ScenarioEnd::Caught => "caught",
        ScenarioEnd::Timeout => "timeout",
        ScenarioEnd::FloorTarget => "floor_target",
        ScenarioEnd::TickLimit => "tick_limit",
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_scenario_result(end: ScenarioEnd, sim_seconds: f64) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            start_floor: 1,
            reached_floor: 2,
            end,
            ticks: 600,
            sim_seconds,
            counts: EventCounts::default(),
            anomalies: Vec::new(),
        }
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("simulate").chain(args.iter().copied()))
    }

    #[test]
    fn default_run_id_contains_seed_and_timestamp() {
        let started = DateTime::from_timestamp_millis(123_456_789).expect("valid timestamp");
        assert_eq!(default_run_id(42, started), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_sim_seconds() {
        let started = DateTime::from_timestamp_millis(1_000).expect("valid timestamp");
        let finished = DateTime::from_timestamp_millis(2_000).expect("valid timestamp");
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            started,
            finished,
            vec![
                make_scenario_result(ScenarioEnd::Timeout, 90.0),
                make_scenario_result(ScenarioEnd::FloorTarget, 60.0),
            ],
            BTreeMap::from([
                ("timeout".to_string(), 1usize),
                ("floor_target".to_string(), 1usize),
            ]),
            1,
            150.0,
        );
        assert_eq!(summary.average_sim_seconds, 75.0);
        assert_eq!(summary.scenario_count, 2);
        assert!(summary.started_at.starts_with("1970-01-01T00:00:01"));
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let now = Utc::now().timestamp_millis();
        let target = std::env::temp_dir()
            .join(format!("dungeon-labyrinth-missing-{now}"))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            Utc::now(),
            Utc::now(),
            vec![make_scenario_result(ScenarioEnd::Caught, 12.0)],
            BTreeMap::from([("caught".to_string(), 1usize)]),
            0,
            12.0,
        );
        let result = write_summary(&target, &summary);
        assert!(result.is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(
            &mut anomalies,
            &mut records,
            &mut seen,
            10,
            "same anomaly".to_string(),
        );
        push_anomaly(
            &mut anomalies,
            &mut records,
            &mut seen,
            11,
            "same anomaly".to_string(),
        );

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tick, 10);
        assert_eq!(records[1].tick, 11);
    }

    #[test]
    fn event_counts_split_real_keys() {
        let mut counts = EventCounts::default();
        for event in [
            RuntimeEvent::KeyCollected { real: false },
            RuntimeEvent::KeyCollected { real: true },
            RuntimeEvent::DoorRejected,
            RuntimeEvent::DoorUnlocked,
            RuntimeEvent::FloorAdvanced { floor: 2 },
            RuntimeEvent::DoorRelocked,
        ] {
            counts.record(&event);
        }
        assert_eq!(counts.keys_collected, 2);
        assert_eq!(counts.real_keys, 1);
        assert_eq!(counts.doors_rejected, 1);
        assert_eq!(counts.doors_unlocked, 1);
        assert_eq!(counts.floors_advanced, 1);
    }

    #[test]
    fn resolve_scenarios_honours_single_and_sanitizes_dt() {
        let scenarios = resolve_scenarios(&cli(&["--single", "--seed", "7", "--dt", "-1"]));
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].seed, 7);
        assert_eq!(scenarios[0].dt, DEFAULT_DT);
        assert_eq!(scenarios[0].floors, DEFAULT_FLOORS);

        let scenarios = resolve_scenarios(&cli(&["--seed", "7", "--floors", "2"]));
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[1].seed, 8);
        assert!(scenarios.iter().all(|scenario| scenario.floors == 2));
    }

    #[test]
    fn snapshot_checks_flag_open_border_and_drift() {
        let mut engine = GameEngine::new(GameEngineOptions {
            seed: 5,
            ..GameEngineOptions::default()
        })
        .expect("engine starts");
        let mut snapshot = engine.build_snapshot(false);
        assert!(collect_snapshot_anomalies(&snapshot).is_empty());
        assert!(collect_engine_anomalies(&engine).is_empty());

        snapshot.tiles[0].replace_range(0..1, ".");
        snapshot.player.float_x += 1.5;
        let anomalies = collect_snapshot_anomalies(&snapshot);
        assert_eq!(anomalies.len(), 2, "{anomalies:?}");
    }

    #[test]
    fn run_scenario_stops_at_tick_limit() {
        let scenario = Scenario {
            name: "short".to_string(),
            seed: 9,
            start_floor: 1,
            floors: 1,
            max_ticks: 30,
            dt: DEFAULT_DT,
        };
        let run = run_scenario(&scenario, &GameConfig::default()).expect("scenario runs");
        assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
        if run.result.end == ScenarioEnd::TickLimit {
            assert_eq!(run.result.ticks, 30);
        }
    }
}
