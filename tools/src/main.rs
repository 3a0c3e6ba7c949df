//! workload-runner: headless runner for the workload engine.
//!
//! Usage:
//!   workload-runner --db ref.db --data-dir ./data --volumes v.json --centre 1952
//!   workload-runner --db ref.db --volumes v.json --centre 1952 --position 17 --json
//!   workload-runner --db ref.db --volumes by_centre.json --direction 3
//!   workload-runner --db ref.db --volumes by_centre.json --national --params p.json
//!   workload-runner --db ref.db --data-dir ./data --ipc-mode
//!
//! `--volumes` holds one volume input for a centre run, or an object keyed
//! by centre id for direction and national runs.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use workload_core::{
    aggregate::{CentreResult, DirectionResult, NationalResult},
    config::EngineConfig,
    engine::WorkloadEngine,
    params::EngineParams,
    store::ReferenceStore,
    types::{CentreId, DirectionId, PositionId},
    volume::VolumeInput,
};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Centre {
        centre_id: CentreId,
        #[serde(default)]
        position_id: Option<PositionId>,
        #[serde(default)]
        volumes: VolumeInput,
        #[serde(default)]
        params: EngineParams,
    },
    Direction {
        direction_id: DirectionId,
        #[serde(default)]
        volumes: BTreeMap<String, VolumeInput>,
        #[serde(default)]
        params: EngineParams,
    },
    National {
        #[serde(default)]
        volumes: BTreeMap<String, VolumeInput>,
        #[serde(default)]
        params: EngineParams,
    },
    Quit,
}

enum Scope {
    Centre(CentreId, Option<PositionId>),
    Direction(DirectionId),
    National,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let json_out = args.iter().any(|a| a == "--json");
    let db = string_arg(&args, "--db").unwrap_or("reference.db");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");

    let store = ReferenceStore::open(db).with_context(|| format!("opening {db}"))?;
    store.migrate()?;
    let config = load_config(data_dir)?;
    let engine = WorkloadEngine::new(store.load_catalogue()?, store.load_organisation()?, config)?;

    if ipc_mode {
        return run_ipc_loop(&engine);
    }

    let scope = parse_scope(&args)?;
    let params: EngineParams = match string_arg(&args, "--params") {
        Some(path) => read_json(path)?,
        None => EngineParams::default(),
    };
    let volumes_path = string_arg(&args, "--volumes");

    if !json_out {
        println!("Workload engine — workload-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  volumes:   {}", volumes_path.unwrap_or("(none)"));
        println!("  at:        {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
        println!();
    }

    match scope {
        Scope::Centre(centre_id, position_id) => {
            let volumes: VolumeInput = match volumes_path {
                Some(path) => read_json(path)?,
                None => VolumeInput::default(),
            };
            let result = match position_id {
                Some(position_id) => {
                    engine.compute_position(centre_id, position_id, &volumes, &params)?
                }
                None => engine.compute_centre(centre_id, &volumes, &params)?,
            };
            if json_out {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_centre(&result);
            }
        }
        Scope::Direction(direction_id) => {
            let volumes = read_volume_map(volumes_path)?;
            let result = engine.compute_direction(direction_id, &volumes, &params)?;
            if json_out {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_direction(&result);
            }
        }
        Scope::National => {
            let volumes = read_volume_map(volumes_path)?;
            let result = engine.compute_national(&volumes, &params)?;
            if json_out {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_national(&result);
            }
        }
    }
    Ok(())
}

fn run_ipc_loop(engine: &WorkloadEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let response = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Centre {
                centre_id,
                position_id,
                volumes,
                params,
            } => match position_id {
                Some(position_id) => engine
                    .compute_position(centre_id, position_id, &volumes, &params)
                    .map(|r| serde_json::to_value(r)),
                None => engine
                    .compute_centre(centre_id, &volumes, &params)
                    .map(|r| serde_json::to_value(r)),
            },
            IpcCommand::Direction {
                direction_id,
                volumes,
                params,
            } => match keyed_by_centre(volumes) {
                Ok(volumes) => engine
                    .compute_direction(direction_id, &volumes, &params)
                    .map(|r| serde_json::to_value(r)),
                Err(e) => Ok(Ok(serde_json::json!({ "error": e.to_string() }))),
            },
            IpcCommand::National { volumes, params } => match keyed_by_centre(volumes) {
                Ok(volumes) => engine
                    .compute_national(&volumes, &params)
                    .map(|r| serde_json::to_value(r)),
                Err(e) => Ok(Ok(serde_json::json!({ "error": e.to_string() }))),
            },
        };

        let line = match response {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => serde_json::json!({ "error": e.to_string() }),
            Err(e) => {
                log::warn!("ipc request failed: {e}");
                serde_json::json!({ "error": e.to_string() })
            }
        };
        writeln!(stdout, "{}", line)?;
        stdout.flush()?;
    }
    Ok(())
}

fn parse_scope(args: &[String]) -> Result<Scope> {
    if args.iter().any(|a| a == "--national") {
        return Ok(Scope::National);
    }
    if let Some(direction_id) = parse_arg::<DirectionId>(args, "--direction") {
        return Ok(Scope::Direction(direction_id));
    }
    if let Some(centre_id) = parse_arg::<CentreId>(args, "--centre") {
        return Ok(Scope::Centre(centre_id, parse_arg(args, "--position")));
    }
    bail!("one of --centre ID, --direction ID or --national is required")
}

fn load_config(data_dir: &str) -> Result<EngineConfig> {
    let path = format!("{data_dir}/engine/engine_config.json");
    if Path::new(&path).exists() {
        EngineConfig::load(data_dir)
    } else {
        log::warn!("{path} not found, using the built-in engine configuration");
        Ok(EngineConfig::default())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {path}"))
}

/// Tagged IPC payloads keep JSON object keys as strings.
fn keyed_by_centre(volumes: BTreeMap<String, VolumeInput>) -> Result<BTreeMap<CentreId, VolumeInput>> {
    volumes
        .into_iter()
        .map(|(key, input)| {
            let id = key
                .trim()
                .parse::<CentreId>()
                .with_context(|| format!("centre id {key:?}"))?;
            Ok((id, input))
        })
        .collect()
}

fn read_volume_map(path: Option<&str>) -> Result<BTreeMap<CentreId, VolumeInput>> {
    match path {
        Some(path) => read_json(path),
        None => Ok(BTreeMap::new()),
    }
}

fn print_centre(result: &CentreResult) {
    println!("=== CENTRE {} — {} [{}] ===", result.centre_id, result.centre_label, result.archetype.as_str());
    println!("  total hours:    {:.4}", result.total_hours);
    println!("  net hours/day:  {:.2}", result.heures_net_jour);
    println!("  fte calculated: {:.4}", result.fte_calcule);
    println!("  fte rounded:    {}", result.fte_arrondi);
    println!(
        "  actual:         MOD {} / MOI {} / APS {}",
        result.actual.direct, result.actual.indirect, result.actual.aps
    );
    println!(
        "  target:         MOD {} / MOI {} / APS {}",
        result.target.direct, result.target.indirect, result.target.aps
    );
    println!("  variance:       {:+}", result.variance);
    println!();
    println!("=== POSITIONS ===");
    for p in &result.positions {
        println!(
            "  {:>6} {:<28} {:?} | {:>9.4} h | fte {:>7.4} ({}) | current {} | {:+}",
            p.position_id, p.label, p.role_type, p.heures, p.fte_calcule, p.fte_arrondi,
            p.current_staffing, p.variance
        );
    }
    if !result.warnings.is_empty() {
        println!();
        println!("=== WARNINGS ({}) ===", result.warnings.len());
        for w in result.warnings.iter().take(20) {
            println!("  {w}");
        }
    }
}

fn print_direction(result: &DirectionResult) {
    println!("=== DIRECTION {} — {} ===", result.direction_id, result.label);
    for c in &result.centres {
        println!(
            "  {:>6} {:<32} [{}] | {:>10.2} h | fte {:>8.2} ({}) | {:+}",
            c.centre_id, c.label, c.archetype.as_str(), c.total_hours, c.fte_calcule,
            c.fte_arrondi, c.variance
        );
    }
    println!(
        "  total: {:.2} h | fte {:.2} ({}) | actual {} | variance {:+}",
        result.totals.total_hours,
        result.totals.fte_calcule,
        result.totals.fte_arrondi,
        result.totals.actual.total(),
        result.totals.variance
    );
}

fn print_national(result: &NationalResult) {
    println!("=== NATIONAL ===");
    for d in &result.directions {
        println!(
            "  {:>4} {:<32} | {:>3} centres | {:>10.2} h | fte {} | {:+}",
            d.direction_id, d.label, d.centres.len(), d.totals.total_hours,
            d.totals.fte_arrondi, d.totals.variance
        );
    }
    if !result.unassigned.is_empty() {
        println!("  {} centres without direction", result.unassigned.len());
    }
    println!(
        "  total: {} centres | {:.2} h | fte {:.2} ({}) | variance {:+}",
        result.centre_count(),
        result.totals.total_hours,
        result.totals.fte_calcule,
        result.totals.fte_arrondi,
        result.totals.variance
    );
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
}
