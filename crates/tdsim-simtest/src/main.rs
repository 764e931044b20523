//! tdsim Headless Balance Harness
//!
//! Loads a scenario (the embedded default or a TOML file) and drives the
//! pure engine in-process: validation sweeps, the wave-1 probe, preset
//! batches and the HP-multiplier search. This is the only place that
//! prints, reads files or sets the exit code.
//!
//! Usage:
//!   cargo run -p tdsim-simtest
//!   cargo run -p tdsim-simtest -- --verbose validate
//!   cargo run -p tdsim-simtest -- batch --preset hard --runs 200
//!   cargo run -p tdsim-simtest -- --json search --seed 7

use std::path::{Path as FsPath, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tdsim_logic::batch::{aggregate, run_batch, run_records, run_rng, BatchStats};
use tdsim_logic::catalog::{EnemyCatalog, TowerCatalog, TowerSpec};
use tdsim_logic::combat::{select_target, WaveState};
use tdsim_logic::entity::{level_for_kills, Enemy, Tower};
use tdsim_logic::game::run_game;
use tdsim_logic::kinds::{enemies, towers};
use tdsim_logic::path::Point;
use tdsim_logic::report::PresentationTable;
use tdsim_logic::scenario::{Arena, ProbeReport, Scenario, BASELINE_PRESET};
use tdsim_logic::search::{search, SearchOutcome};
use tdsim_logic::wave::{compose_wave, enemy_count};

// ── Default scenario (same file the tests check against) ────────────────
const DEFAULT_SCENARIO: &str = include_str!("../../../data/balance.toml");

/// Variable name the live game's config loader expects.
const JS_VAR: &str = "ENEMY_TYPES";

#[derive(Parser)]
#[command(name = "tdsim-simtest")]
#[command(about = "Headless tower-defense balance harness", long_about = None)]
#[command(version)]
struct Cli {
    /// Scenario TOML file; the embedded default when omitted
    #[arg(long, global = true)]
    scenario: Option<PathBuf>,

    /// Show every check and raise the default log level to debug
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the invariant sweep (default)
    Validate,

    /// Two basic towers against wave 1
    Probe {
        /// Enemy preset to fight
        #[arg(long, default_value = BASELINE_PRESET)]
        preset: String,
    },

    /// Play a batch of games against one enemy preset
    Batch {
        #[arg(long, default_value = BASELINE_PRESET)]
        preset: String,
        #[arg(long)]
        runs: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Search HP multipliers for the target win rate
    Search {
        #[arg(long)]
        runs: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let scenario = load_scenario(cli.scenario.as_deref())?;
    let out = Output {
        verbose: cli.verbose,
        json: cli.json,
    };

    match cli.command.unwrap_or(Command::Validate) {
        Command::Validate => {
            if !run_sweeps(&scenario, out)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Probe { preset } => probe(&scenario, &preset, out),
        Command::Batch { preset, runs, seed } => batch(&scenario, &preset, runs, seed, out),
        Command::Search { runs, seed } => balance(&scenario, runs, seed, out),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_scenario(path: Option<&FsPath>) -> Result<Scenario> {
    let Some(path) = path else {
        return toml::from_str(DEFAULT_SCENARIO).context("embedded default scenario is invalid");
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    let scenario = toml::from_str(&text)
        .with_context(|| format!("failed to parse scenario {}", path.display()))?;
    info!(path = %path.display(), "scenario loaded");
    Ok(scenario)
}

#[derive(Debug, Clone, Copy)]
struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        let text = serde_json::to_string_pretty(value).context("failed to encode JSON output")?;
        println!("{text}");
        Ok(())
    }
}

// ── Commands ────────────────────────────────────────────────────────────

fn probe(scenario: &Scenario, preset: &str, out: Output) -> Result<()> {
    scenario.validate().context("scenario failed validation")?;
    let arena = scenario.arena()?;
    let enemies = scenario.preset(preset)?;
    let mut rng = ChaCha8Rng::seed_from_u64(scenario.search.seed);
    let report = arena
        .probe(enemies, &[towers::BASIC, towers::BASIC], 1, &mut rng)
        .context("wave-1 probe failed")?;

    if out.json {
        return out.json(&report);
    }
    print_probe(&report);
    Ok(())
}

fn print_probe(report: &ProbeReport) {
    let o = &report.outcome;
    println!("=== Wave {} probe: 2 basic towers ===", report.wave);
    println!("  enemies: {}", report.enemies.join(", "));
    println!(
        "  escaped={}, kills={}, splash_deaths={}, earned={}, frames={}",
        o.escaped, o.kills, o.splash_deaths, o.gold_earned, o.frames
    );
    for (i, kills) in report.tower_kills.iter().enumerate() {
        println!("  tower {i}: {kills} kills");
    }
    if o.diverged {
        println!("  DIVERGED: {} enemies abandoned at the frame ceiling", o.abandoned);
    }
}

#[derive(Serialize)]
struct BatchReport<'a> {
    preset: &'a str,
    seed: u64,
    stats: BatchStats,
}

fn batch(
    scenario: &Scenario,
    preset: &str,
    runs: Option<u32>,
    seed: Option<u64>,
    out: Output,
) -> Result<()> {
    scenario.validate().context("scenario failed validation")?;
    let arena = scenario.arena()?;
    let enemies = scenario.preset(preset)?;
    let runs = runs.unwrap_or(scenario.search.runs);
    let seed = seed.unwrap_or(scenario.search.seed);
    let stats = run_batch(&arena, enemies, runs, seed)
        .with_context(|| format!("batch against preset '{preset}' failed"))?;

    if out.json {
        return out.json(&BatchReport {
            preset,
            seed,
            stats,
        });
    }
    println!("=== Batch: {preset} ({runs} runs, seed {seed}) ===");
    println!("  {}", format_stats(&stats));
    if stats.diverged_runs > 0 {
        println!("  {} runs hit the frame ceiling", stats.diverged_runs);
    }
    Ok(())
}

fn format_stats(stats: &BatchStats) -> String {
    format!(
        "Win: {:.0}%, Waves: {:.1}, Lives: {:.1}",
        stats.win_rate * 100.0,
        stats.avg_waves,
        stats.avg_lives
    )
}

#[derive(Serialize)]
struct SearchReport<'a> {
    search: &'a SearchOutcome,
    presentation: &'a PresentationTable,
}

fn balance(scenario: &Scenario, runs: Option<u32>, seed: Option<u64>, out: Output) -> Result<()> {
    scenario.validate().context("scenario failed validation")?;
    let arena = scenario.arena()?;
    let mut params = scenario.search.clone();
    if let Some(runs) = runs {
        params.runs = runs;
    }
    if let Some(seed) = seed {
        params.seed = seed;
    }
    let outcome = search(&arena, &scenario.enemies, &params).context("balance search failed")?;
    let table = PresentationTable::from_catalog(&outcome.catalog, &scenario.presentation);

    if out.json {
        return out.json(&SearchReport {
            search: &outcome,
            presentation: &table,
        });
    }

    println!("=== Balance search ({} runs per candidate, seed {}) ===", params.runs, params.seed);
    println!(
        "Target: {:.0}% win rate, {:.0} lives; ideal {:.0}-{:.0}%, {:.0}-{:.0} lives",
        params.target.win_rate * 100.0,
        params.target.lives,
        params.ideal.min_win_rate * 100.0,
        params.ideal.max_win_rate * 100.0,
        params.ideal.min_lives,
        params.ideal.max_lives,
    );
    for c in &outcome.candidates {
        println!(
            "  HP x{:.1}: Win {:5.1}%, Lives {:.1}, fitness {:+.3}{}",
            c.multiplier,
            c.stats.win_rate * 100.0,
            c.stats.avg_lives,
            c.fitness,
            if c.ideal { " * IDEAL" } else { "" }
        );
    }

    println!("\n[RECOMMENDED: HP x{:.1}]", outcome.best.multiplier);
    print_catalog(&outcome.catalog);
    println!("\n[JS for the game config]");
    print!("{}", table.to_js(JS_VAR));
    Ok(())
}

fn print_catalog(catalog: &EnemyCatalog) {
    for (kind, spec) in catalog.iter() {
        println!(
            "  {kind}: hp={}, speed={}, reward={}",
            spec.hp, spec.speed, spec.reward
        );
    }
}

// ── Validation sweep ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

type Sweep = fn(&Scenario, &Arena) -> Vec<TestResult>;

const SWEEPS: [(&str, Sweep); 8] = [
    ("Path Movement", validate_path),
    ("Tower Leveling", validate_leveling),
    ("Wave Composition", validate_waves),
    ("Combat Invariants", validate_combat),
    ("Targeting", validate_targeting),
    ("Wave 1 Probe", validate_probe),
    ("Batch Aggregation", validate_batches),
    ("Frame Ceiling", validate_divergence),
];

/// Run every sweep; true when all checks passed.
fn run_sweeps(scenario: &Scenario, out: Output) -> Result<bool> {
    if !out.json {
        println!("=== tdsim Simulation Harness ===\n");
        println!("--- Scenario ---");
    }

    let mut results = validate_scenario(scenario);
    if let Ok(arena) = scenario.arena() {
        for (title, sweep) in SWEEPS {
            if !out.json {
                println!("--- {title} ---");
            }
            results.extend(sweep(scenario, &arena));
        }
    }

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    if out.json {
        out.json(&results)?;
        return Ok(failed == 0);
    }

    println!();
    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || out.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }
    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );
    Ok(failed == 0)
}

// ── 1. Scenario ─────────────────────────────────────────────────────────

fn validate_scenario(scenario: &Scenario) -> Vec<TestResult> {
    let mut results = Vec::new();

    let valid = scenario.validate();
    results.push(check(
        "scenario_valid",
        valid.is_ok(),
        match &valid {
            Ok(()) => "catalogs, path, coverage and search parameters are consistent".into(),
            Err(e) => e.to_string(),
        },
    ));

    results.push(check(
        "scenario_tower_types",
        scenario.towers.len() >= 4,
        format!("{} tower types", scenario.towers.len()),
    ));

    let missing_hints: Vec<&str> = enemies::ALL
        .into_iter()
        .filter(|k| !scenario.presentation.kinds.contains_key(*k))
        .collect();
    results.push(check(
        "scenario_presentation_hints",
        missing_hints.is_empty(),
        if missing_hints.is_empty() {
            "every stock enemy has a color and size".to_string()
        } else {
            format!("falling back to defaults for: {}", missing_hints.join(", "))
        },
    ));

    let presets: Vec<&str> = scenario.presets.keys().map(String::as_str).collect();
    results.push(check(
        "scenario_presets",
        presets.iter().all(|p| scenario.preset(p).is_ok()),
        format!("presets: baseline, {}", presets.join(", ")),
    ));

    results
}

// ── 2. Path Movement ────────────────────────────────────────────────────

fn validate_path(scenario: &Scenario, arena: &Arena) -> Vec<TestResult> {
    let mut results = Vec::new();
    let path = arena.path();

    results.push(check(
        "path_length_positive",
        path.length() > 0.0,
        format!("{} waypoints, length {:.1}", path.waypoints().len(), path.length()),
    ));

    // Every enemy kind stands on the last waypoint within ceil(L / speed)
    // steps, plus one snap step per interior waypoint
    let end = path.waypoints()[path.last_index()];
    let interior = path.waypoints().len().saturating_sub(2) as u32;
    for (kind, spec) in scenario.enemies.iter() {
        let bound = (path.length() / spec.speed).ceil() as u32 + interior;
        let mut position = path.start();
        let mut index = 0;
        let mut steps = 0;
        let mut monotonic = true;
        let mut reached = false;
        while steps < bound {
            let step = path.advance(position, index, spec.speed);
            monotonic &= step.path_index >= index;
            position = step.position;
            index = step.path_index;
            steps += 1;
            if position == end {
                reached = true;
                break;
            }
        }
        results.push(check(
            &format!("path_walk_{kind}"),
            reached && monotonic,
            format!("{steps} steps at speed {} (bound {bound})", spec.speed),
        ));
    }

    results
}

// ── 3. Tower Leveling ───────────────────────────────────────────────────

fn validate_leveling(_scenario: &Scenario, _arena: &Arena) -> Vec<TestResult> {
    [(0, 0), (4, 0), (5, 1), (14, 1), (15, 2), (29, 2), (30, 3), (500, 3)]
        .into_iter()
        .map(|(kills, expected)| {
            let level = level_for_kills(kills);
            check(
                &format!("level_at_{kills}_kills"),
                level == expected,
                format!("{kills} kills → level {level}"),
            )
        })
        .collect()
}

// ── 4. Wave Composition ─────────────────────────────────────────────────

fn validate_waves(scenario: &Scenario, _arena: &Arena) -> Vec<TestResult> {
    let mut results = Vec::new();
    let params = &scenario.game;
    let mut rng = ChaCha8Rng::seed_from_u64(scenario.search.seed);

    let mut bad_counts = Vec::new();
    let mut early_specials = Vec::new();
    for wave in 1..=params.waves {
        let kinds = compose_wave(wave, params.boss_wave, &mut rng);
        if kinds.len() != enemy_count(wave) {
            bad_counts.push(wave);
        }
        if wave < 3 && wave != params.boss_wave && kinds.iter().any(|k| *k != enemies::BASIC) {
            early_specials.push(wave);
        }
    }
    results.push(check(
        "wave_counts",
        bad_counts.is_empty(),
        format!("3 + 2w enemies per wave, mismatches: {bad_counts:?}"),
    ));
    results.push(check(
        "wave_early_all_basic",
        early_specials.is_empty(),
        format!("waves 1-2 spawn only basic, violations: {early_specials:?}"),
    ));

    let boss_wave = compose_wave(params.boss_wave, params.boss_wave, &mut rng);
    results.push(check(
        "wave_boss_last",
        boss_wave.last() == Some(&enemies::BOSS),
        format!("wave {} ends with {:?}", params.boss_wave, boss_wave.last()),
    ));

    let a = compose_wave(7, params.boss_wave, &mut ChaCha8Rng::seed_from_u64(99));
    let b = compose_wave(7, params.boss_wave, &mut ChaCha8Rng::seed_from_u64(99));
    results.push(check(
        "wave_seed_reproducible",
        a == b,
        "same seed → same wave 7",
    ));

    results
}

// ── 5. Combat Invariants ────────────────────────────────────────────────

fn validate_combat(scenario: &Scenario, arena: &Arena) -> Vec<TestResult> {
    let mut results = Vec::new();
    let engine = arena.engine(&scenario.enemies);

    // A full tower line, then every wave stepped frame by frame
    let mut gold = u32::MAX / 2;
    let mut line = Vec::new();
    if let Err(e) = arena.policy().buy(&mut gold, &mut line, arena.towers()) {
        results.push(check("combat_setup", false, e.to_string()));
        return results;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(scenario.search.seed);
    let mut hp_violations = 0;
    let mut cooldown_violations = 0;
    let mut frames = 0u64;
    let mut diverged = 0;
    for wave in 1..=scenario.game.waves {
        let kinds = compose_wave(wave, scenario.game.boss_wave, &mut rng);
        let mut state = match WaveState::new(&engine, &kinds, &line) {
            Ok(state) => state,
            Err(e) => {
                results.push(check("combat_wave_setup", false, e.to_string()));
                return results;
            }
        };
        let mut last_hp: Vec<f64> = Vec::new();
        while !state.is_resolved() && state.frame() < arena.rules().frame_limit {
            state.step(&mut line);
            let hp: Vec<f64> = state.enemies().iter().map(|e| e.hp).collect();
            hp_violations += last_hp.iter().zip(&hp).filter(|(a, b)| b > a).count();
            last_hp = hp;
            for tower in &line {
                let max = arena.towers().get(&tower.kind).map_or(0, |s| s.fire_rate);
                if tower.cooldown > max {
                    cooldown_violations += 1;
                }
            }
        }
        frames += state.frame() as u64;
        if state.finish().diverged {
            diverged += 1;
        }
    }

    results.push(check(
        "combat_hp_non_increasing",
        hp_violations == 0,
        format!("{hp_violations} frame-over-frame hp increases over {frames} frames"),
    ));
    results.push(check(
        "combat_cooldown_bounded",
        cooldown_violations == 0,
        format!("{cooldown_violations} cooldowns above fire rate"),
    ));
    results.push(check(
        "combat_waves_resolve",
        diverged == 0,
        format!("{diverged} of {} waves hit the frame ceiling", scenario.game.waves),
    ));

    results
}

// ── 6. Targeting ────────────────────────────────────────────────────────

fn validate_targeting(scenario: &Scenario, _arena: &Arena) -> Vec<TestResult> {
    let mut results = Vec::new();
    let Ok(bug) = scenario.enemies.get(enemies::BASIC) else {
        results.push(check("targeting_fixture", false, "no basic enemy"));
        return results;
    };
    let at = |x: f64, y: f64| Enemy::spawn(enemies::BASIC, bug, Point::new(x, y));
    let tower = Tower::new(towers::BASIC, Point::new(0.0, 0.0));

    let tied = vec![at(30.0, 40.0), at(50.0, 0.0), at(0.0, -50.0), at(200.0, 0.0)];
    let picks: Vec<_> = (0..10)
        .map(|_| select_target(tower.position, 100.0, &tied))
        .collect();
    results.push(check(
        "targeting_tie_first_spawned",
        picks.iter().all(|p| *p == Some(0)),
        "three enemies at 50 units → first in spawn order",
    ));

    let mut with_dead = tied.clone();
    with_dead[0].retire();
    results.push(check(
        "targeting_skips_dead",
        select_target(tower.position, 100.0, &with_dead) == Some(1),
        "dead nearest enemy is ignored",
    ));

    results.push(check(
        "targeting_range",
        select_target(tower.position, 49.0, &tied).is_none(),
        "nothing within 49 units",
    ));

    results
}

// ── 7. Wave 1 Probe ─────────────────────────────────────────────────────

fn validate_probe(scenario: &Scenario, arena: &Arena) -> Vec<TestResult> {
    let mut rng = ChaCha8Rng::seed_from_u64(scenario.search.seed);
    let report = match arena.probe(
        &scenario.enemies,
        &[towers::BASIC, towers::BASIC],
        1,
        &mut rng,
    ) {
        Ok(r) => r,
        Err(e) => return vec![check("probe_runs", false, e.to_string())],
    };
    let o = report.outcome;
    vec![
        check(
            "probe_resolves",
            !o.diverged,
            format!("wave 1 resolved in {} frames", o.frames),
        ),
        check(
            "probe_accounting",
            o.escaped + o.kills + o.splash_deaths == report.enemies.len() as u32,
            format!(
                "escaped={}, kills={}, splash_deaths={} of {}",
                o.escaped,
                o.kills,
                o.splash_deaths,
                report.enemies.len()
            ),
        ),
        check(
            "probe_tower_kills",
            report.tower_kills.iter().sum::<u32>() == o.kills,
            format!("per tower: {:?}", report.tower_kills),
        ),
    ]
}

// ── 8. Batch Aggregation ────────────────────────────────────────────────

fn validate_batches(scenario: &Scenario, arena: &Arena) -> Vec<TestResult> {
    let mut results = Vec::new();
    let seed = scenario.search.seed;
    let runs = 24;

    let parallel = run_batch(arena, &scenario.enemies, runs, seed);
    let sequential: Result<Vec<_>, _> = (0..runs)
        .map(|i| run_game(arena.setup(&scenario.enemies), &mut run_rng(seed, i)))
        .collect();
    let (parallel, sequential) = match (parallel, sequential) {
        (Ok(p), Ok(s)) => (p, s),
        (Err(e), _) | (_, Err(e)) => {
            results.push(check("batch_runs", false, e.to_string()));
            return results;
        }
    };
    results.push(check(
        "batch_parallel_matches_sequential",
        parallel == aggregate(&sequential),
        format_stats(&parallel),
    ));
    results.push(check(
        "batch_win_rate_bounds",
        (0.0..=1.0).contains(&parallel.win_rate),
        format!("win rate {:.3}", parallel.win_rate),
    ));
    results.push(check(
        "batch_records_ordered",
        run_records(arena, &scenario.enemies, runs, seed).is_ok_and(|r| r == sequential),
        "records come back in run order",
    ));

    // Enemies nobody can stop: zero wins, avg lives guarded to 0
    let hopeless = scenario.enemies.scaled_hp(100.0);
    match run_batch(arena, &hopeless, 8, seed) {
        Ok(stats) => results.push(check(
            "batch_zero_wins_guard",
            stats.wins > 0 || stats.avg_lives == 0.0,
            format!("{} wins, avg lives {:.1}", stats.wins, stats.avg_lives),
        )),
        Err(e) => results.push(check("batch_zero_wins_guard", false, e.to_string())),
    }

    results
}

// ── 9. Frame Ceiling ────────────────────────────────────────────────────

fn validate_divergence(scenario: &Scenario, _arena: &Arena) -> Vec<TestResult> {
    // Harmless towers and a ceiling shorter than the quickest walk
    let mut harmless = scenario.clone();
    let walk = harmless.arena().map_or(0.0, |a| a.path().length());
    let fastest = scenario
        .enemies
        .iter()
        .map(|(_, s)| s.speed)
        .fold(0.0, f64::max);
    harmless.rules.frame_limit = ((walk / fastest) / 2.0) as u32;
    harmless.towers = TowerCatalog::new(
        scenario
            .towers
            .iter()
            .map(|(kind, spec)| {
                let spec = TowerSpec {
                    damage: 0.0,
                    ..spec.clone()
                };
                (kind.to_string(), spec)
            })
            .collect(),
    );

    let arena = match harmless.arena() {
        Ok(a) => a,
        Err(e) => return vec![check("ceiling_setup", false, e.to_string())],
    };
    let mut rng = ChaCha8Rng::seed_from_u64(scenario.search.seed);
    match arena.probe(&harmless.enemies, &[towers::BASIC], 1, &mut rng) {
        Ok(report) => {
            let o = report.outcome;
            vec![
                check(
                    "ceiling_flags_divergence",
                    o.diverged && o.frames == harmless.rules.frame_limit,
                    format!("stopped at frame {} of {}", o.frames, harmless.rules.frame_limit),
                ),
                check(
                    "ceiling_abandoned_uncounted",
                    o.kills == 0 && o.abandoned + o.escaped == report.enemies.len() as u32,
                    format!("{} abandoned, {} escaped", o.abandoned, o.escaped),
                ),
            ]
        }
        Err(e) => vec![check("ceiling_probe", false, e.to_string())],
    }
}
