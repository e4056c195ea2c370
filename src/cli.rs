use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::export_csv::write_buckets_to_path;
use crate::aggregate::SaveResult;
use crate::combat::catalog;
use crate::config::EngineConfig;
use crate::data::{load_scenario, Scenario};
use crate::parallel::WorkerPool;
use crate::server;
use crate::server::api::{check_histogram_size, resolve_seed, simulate_units, SimulateResponse};

const USAGE: &str =
    "usage: statshammer <serve|average <scenario> [--per100]|max <scenario>|simulate <scenario> [num_sims] [seed] [--csv <path>]|modifiers>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Average,
    Max,
    Simulate,
    Modifiers,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("average") => Some(Command::Average),
        Some("max") => Some(Command::Max),
        Some("simulate") => Some(Command::Simulate),
        Some("modifiers") => Some(Command::Modifiers),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    let config = EngineConfig::from_env();
    match parse_command(args) {
        Some(Command::Serve) => handle_serve(&config),
        Some(Command::Average) => handle_average(args),
        Some(Command::Max) => handle_max(args),
        Some(Command::Simulate) => handle_simulate(args, &config),
        Some(Command::Modifiers) => print_json(&catalog()),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

fn handle_serve(config: &EngineConfig) -> i32 {
    match server::run_server(config) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

/// Arguments after the command, without flags and flag values.
fn positional(args: &[String]) -> Vec<&String> {
    let mut values = Vec::new();
    let mut rest = args.iter().skip(2);
    while let Some(arg) = rest.next() {
        if arg == "--csv" {
            rest.next();
        } else if !arg.starts_with("--") {
            values.push(arg);
        }
    }
    values
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
}

fn load(args: &[String], command: &str) -> Result<Scenario, i32> {
    let Some(path) = positional(args).first().copied() else {
        eprintln!("usage: statshammer {command} <scenario.json|scenario.yaml>");
        return Err(2);
    };
    load_scenario(Path::new(path)).map_err(|err| {
        eprintln!("failed to load scenario '{path}': {err}");
        1
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize result: {err}");
            1
        }
    }
}

#[derive(Debug, Serialize)]
struct AverageRow {
    name: String,
    points: u32,
    average_damage: f64,
    save_comparison: Vec<SaveResult>,
}

fn handle_average(args: &[String]) -> i32 {
    let scenario = match load(args, "average") {
        Ok(scenario) => scenario,
        Err(code) => return code,
    };
    let per_100_points = args.iter().any(|arg| arg == "--per100");
    let prepared = scenario.active_units().and_then(|units| {
        let target = scenario.target()?;
        let target_modifiers = scenario.target.to_target_modifiers()?;
        Ok((units, target, target_modifiers))
    });
    let (units, target, target_modifiers) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("invalid scenario: {err}");
            return 1;
        }
    };

    let rows: Vec<AverageRow> = units
        .iter()
        .map(|unit| AverageRow {
            name: unit.name.clone(),
            points: unit.points,
            average_damage: unit.average_damage(&target, per_100_points),
            save_comparison: unit.save_comparison(&target_modifiers, per_100_points),
        })
        .collect();
    info!(units = rows.len(), per_100_points, "computed average damage");
    print_json(&rows)
}

#[derive(Debug, Serialize)]
struct MaxRow {
    name: String,
    max_damage: u32,
}

fn handle_max(args: &[String]) -> i32 {
    let scenario = match load(args, "max") {
        Ok(scenario) => scenario,
        Err(code) => return code,
    };
    let units = match scenario.active_units() {
        Ok(units) => units,
        Err(err) => {
            eprintln!("invalid scenario: {err}");
            return 1;
        }
    };
    let rows: Vec<MaxRow> = units
        .iter()
        .map(|unit| MaxRow {
            name: unit.name.clone(),
            max_damage: unit.max_damage(),
        })
        .collect();
    info!(units = rows.len(), "computed max damage");
    print_json(&rows)
}

fn handle_simulate(args: &[String], config: &EngineConfig) -> i32 {
    let scenario = match load(args, "simulate") {
        Ok(scenario) => scenario,
        Err(code) => return code,
    };
    let positional = positional(args);
    let requested = parse_arg::<usize>(positional.get(1).copied(), "num_sims")
        .or(scenario.num_simulations);
    let num_simulations = config.simulations(requested);
    let seed = resolve_seed(
        parse_arg::<u64>(positional.get(2).copied(), "seed").or(scenario.seed),
        config,
    );

    let prepared = scenario
        .active_units()
        .and_then(|units| Ok((units, scenario.target()?)));
    let (units, target) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => {
            eprintln!("invalid scenario: {err}");
            return 1;
        }
    };
    if let Err(err) = check_histogram_size(&units) {
        eprintln!("invalid scenario: {err}");
        return 1;
    }

    let results = simulate_units(
        &units,
        &target,
        num_simulations,
        seed,
        &WorkerPool::from_config(config),
    );
    info!(units = results.len(), num_simulations, seed, "simulation complete");

    if let Some(csv_path) = flag_value(args, "--csv") {
        let rows: Vec<(&str, _)> = results
            .iter()
            .map(|unit| (unit.name.as_str(), &unit.result))
            .collect();
        if let Err(err) = write_buckets_to_path(Path::new(csv_path), &rows) {
            eprintln!("failed to write csv '{csv_path}': {err}");
            return 1;
        }
    }

    print_json(&SimulateResponse {
        num_simulations,
        seed,
        target_save: target.save,
        results,
    })
}

fn parse_arg<T: std::str::FromStr>(raw: Option<&String>, name: &str) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(argument = name, value = %raw, "invalid argument, using default");
            None
        }
    }
}
