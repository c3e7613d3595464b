//! Headless Battle Runner
//!
//! Loads a battle scenario from TOML, plays its scripted actions through the
//! combat engine and prints every answer as JSON or text.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use legion_battle::battle::{
    Battle, BattleMap, CombatEngine, Combatant, CreatureCatalog, Legion, MapSpec, PenaltyOptionId,
    StrikeOptions, StrikeOutcome, StrikeResult,
};
use legion_battle::core::config::RulesConfig;
use legion_battle::core::error::{BattleError, Result};
use legion_battle::core::types::{BattlePhase, CombatantId, Side};

/// Headless Battle Runner - scripted battles for rules checking
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Play a scripted battle scenario and print the engine's answers")]
struct Args {
    /// Scenario file (TOML)
    #[arg(long, default_value = "data/scenarios/sample.toml")]
    scenario: PathBuf,

    /// Random seed for deterministic dice, overriding the scenario's
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Enable debug logging of engine internals
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Scenario file layout
#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    /// Map file, relative to the scenario file
    #[serde(default)]
    map_file: Option<PathBuf>,
    /// Inline map, used when no map file is given
    #[serde(default)]
    map: Option<MapSpec>,
    /// Creature catalog file; the standard set when absent
    #[serde(default)]
    catalog: Option<PathBuf>,
    #[serde(default)]
    rules: RulesConfig,
    attacker: LegionSpec,
    defender: LegionSpec,
    #[serde(default)]
    combatants: Vec<CombatantSpec>,
    #[serde(default)]
    start: Option<StartSpec>,
    #[serde(default)]
    actions: Vec<Action>,
}

#[derive(Debug, Deserialize)]
struct LegionSpec {
    marker: String,
    #[serde(default)]
    score: u32,
}

#[derive(Debug, Deserialize)]
struct CombatantSpec {
    /// Name used by actions to refer to this creature
    tag: String,
    creature: String,
    side: Side,
    hex: String,
    #[serde(default)]
    hits: i32,
}

#[derive(Debug, Deserialize)]
struct StartSpec {
    turn: u32,
    active: Side,
    phase: BattlePhase,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    Moves { who: String },
    Move { who: String, to: String },
    Options { who: String, target: String },
    Strike {
        who: String,
        target: String,
        #[serde(default)]
        choice: Option<u32>,
    },
    Carry { target: String, amount: i32 },
    Cancel { who: String },
    Advance,
}

#[derive(Debug, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
enum Report {
    Moves { who: String, hexes: Vec<String> },
    Moved { who: String, to: String },
    Options(StrikeOptions),
    Strike { outcome: StrikeOutcome },
    Carry(StrikeResult),
    Cancelled { who: String, cancelled: bool },
    Phase {
        turn: u32,
        phase: BattlePhase,
        active: Side,
        removed: Vec<CombatantId>,
    },
    Rejected { step: usize, error: String },
}

/// JSON output structure
#[derive(Serialize)]
struct RunResult<'a> {
    scenario: String,
    seed: Option<u64>,
    reports: Vec<Report>,
    combatants: Vec<&'a Combatant>,
    over: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "legion_battle=debug"
    } else {
        "legion_battle=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        tracing::error!(error = %e, "Battle runner failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let contents = fs::read_to_string(&args.scenario)?;
    let mut scenario: Scenario = toml::from_str(&contents)?;
    let base = args.scenario.parent().unwrap_or_else(|| Path::new("."));

    if args.seed.is_some() {
        scenario.rules.dice_seed = args.seed;
    }
    scenario.rules.validate()?;
    tracing::info!(scenario = %scenario.name, "Scenario loaded");

    let map = match (&scenario.map_file, &scenario.map) {
        (Some(path), _) => BattleMap::load(&base.join(path))?,
        (None, Some(spec)) => BattleMap::from_spec(spec)?,
        (None, None) => {
            return Err(BattleError::Config(format!(
                "scenario {} has neither map_file nor map",
                scenario.name
            )))
        }
    };
    let catalog = match &scenario.catalog {
        Some(path) => CreatureCatalog::load(&base.join(path))?,
        None => CreatureCatalog::standard()?,
    };

    let attacker = Legion::new(Side::Attacker, &scenario.attacker.marker)
        .with_score(scenario.attacker.score);
    let defender = Legion::new(Side::Defender, &scenario.defender.marker)
        .with_score(scenario.defender.score);
    let mut battle = Battle::new(map, attacker, defender, scenario.rules.clone());
    if let Some(start) = &scenario.start {
        battle.set_turn(start.turn, start.active, start.phase);
    }

    let mut tags: HashMap<String, CombatantId> = HashMap::new();
    for spec in &scenario.combatants {
        let creature = catalog.require(&spec.creature)?;
        let hex = battle.map.require_label(&spec.hex)?;
        let id = battle.add_combatant(creature, spec.side, hex)?;
        if spec.hits > 0 {
            battle.set_hits(id, spec.hits)?;
        }
        if tags.insert(spec.tag.clone(), id).is_some() {
            return Err(BattleError::Config(format!("duplicate combatant tag {}", spec.tag)));
        }
    }

    let mut engine = CombatEngine::from_rules(battle);
    let mut reports = Vec::with_capacity(scenario.actions.len());
    for (step, action) in scenario.actions.iter().enumerate() {
        match play(&mut engine, &tags, action) {
            Ok(report) => reports.push(report),
            Err(e) => reports.push(Report::Rejected {
                step,
                error: e.to_string(),
            }),
        }
    }

    let battle = engine.battle();
    let result = RunResult {
        scenario: scenario.name.clone(),
        seed: scenario.rules.dice_seed,
        reports,
        combatants: battle.combatants().collect(),
        over: battle.is_over(),
    };

    match args.format.as_str() {
        "json" => print_json(&result)?,
        "text" => print_text(battle, &tags, &result),
        _ => {
            eprintln!("Unknown format '{}', defaulting to json", args.format);
            print_json(&result)?;
        }
    }
    Ok(())
}

fn tag(tags: &HashMap<String, CombatantId>, name: &str) -> Result<CombatantId> {
    tags.get(name)
        .copied()
        .ok_or_else(|| BattleError::Config(format!("unknown combatant tag {}", name)))
}

fn play(
    engine: &mut CombatEngine,
    tags: &HashMap<String, CombatantId>,
    action: &Action,
) -> Result<Report> {
    let report = match action {
        Action::Moves { who } => {
            let moves = engine.legal_moves(tag(tags, who)?, false)?;
            let battle = engine.battle();
            Report::Moves {
                who: who.clone(),
                hexes: moves
                    .into_iter()
                    .map(|hex| battle.hex_label(hex).to_string())
                    .collect(),
            }
        }
        Action::Move { who, to } => {
            let hex = engine.battle().map.require_label(to)?;
            engine.move_combatant(tag(tags, who)?, hex)?;
            Report::Moved {
                who: who.clone(),
                to: to.clone(),
            }
        }
        Action::Options { who, target } => {
            Report::Options(engine.strike_options(tag(tags, who)?, tag(tags, target)?)?)
        }
        Action::Strike {
            who,
            target,
            choice,
        } => Report::Strike {
            outcome: engine.resolve_strike(
                tag(tags, who)?,
                tag(tags, target)?,
                choice.map(PenaltyOptionId),
            )?,
        },
        Action::Carry { target, amount } => {
            Report::Carry(engine.apply_carry(tag(tags, target)?, *amount)?)
        }
        Action::Cancel { who } => Report::Cancelled {
            who: who.clone(),
            cancelled: engine.cancel_pending_strike(tag(tags, who)?),
        },
        Action::Advance => {
            let removed = engine.advance_phase();
            let battle = engine.battle();
            Report::Phase {
                turn: battle.turn,
                phase: battle.phase,
                active: battle.active,
                removed,
            }
        }
    };
    Ok(report)
}

fn print_json(result: &RunResult<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| BattleError::Config(format!("cannot serialize result: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_text(battle: &Battle, tags: &HashMap<String, CombatantId>, result: &RunResult<'_>) {
    let names: HashMap<CombatantId, &str> = tags.iter().map(|(k, v)| (*v, k.as_str())).collect();
    let name = |id: CombatantId| names.get(&id).copied().unwrap_or("?").to_string();

    println!("Battle Scenario: {}", result.scenario);
    println!("=============");
    for report in &result.reports {
        match report {
            Report::Moves { who, hexes } => println!("{} may move to {}", who, hexes.join(" ")),
            Report::Moved { who, to } => println!("{} moves to {}", who, to),
            Report::Options(o) => {
                println!(
                    "{} vs {}: {} dice, strike number {}{}",
                    name(o.striker),
                    name(o.target),
                    o.dice,
                    o.strike_number,
                    if o.rangestrike { " (rangestrike)" } else { "" }
                );
                for option in &o.penalty_options {
                    println!("  [{}] {}", option.id.0, option.label);
                }
            }
            Report::Strike {
                outcome: StrikeOutcome::AwaitingPenaltyChoice(o),
            } => {
                println!("{} must choose a strike penalty:", name(o.striker));
                for option in &o.penalty_options {
                    println!("  [{}] {}", option.id.0, option.label);
                }
            }
            Report::Strike {
                outcome: StrikeOutcome::Resolved(r),
            }
            | Report::Carry(r) => {
                let rolls: String = r.rolls.iter().map(|d| d.to_string()).collect();
                println!(
                    "{} hits {} for {}{} rolls [{}]{}",
                    name(r.striker),
                    name(r.target),
                    r.damage,
                    if r.killed { ", killing it;" } else { ";" },
                    rolls,
                    if r.carry_damage_available > 0 {
                        format!(", {} to carry", r.carry_damage_available)
                    } else {
                        String::new()
                    }
                );
            }
            Report::Cancelled { who, cancelled } => {
                println!("{} strike cancelled: {}", who, cancelled)
            }
            Report::Phase {
                turn,
                phase,
                active,
                removed,
            } => println!(
                "Turn {} {:?} {:?}, {} dead removed",
                turn,
                active,
                phase,
                removed.len()
            ),
            Report::Rejected { step, error } => println!("Step {} rejected: {}", step, error),
        }
    }
    println!();
    for combatant in battle.combatants() {
        println!(
            "{:>8} {:<10} {:?} at {} hits {}{}",
            name(combatant.id),
            combatant.name(),
            combatant.side,
            battle.hex_label(combatant.current_hex),
            combatant.hits,
            if combatant.dead { " (dead)" } else { "" }
        );
    }
    println!("Battle over: {}", result.over);
}
