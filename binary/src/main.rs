use std::{process::ExitCode, time::Instant};

use dcr_mining::{
    discover_and_minimize,
    traversal::{find_unique_states_with_runnable_count, UniqueTraceFinder},
    ByteDcrGraph, DcrMiningConfig, Log, LogTrace,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

/// Small order handling log, used if no log file is given
fn sample_log() -> Log {
    let mut log = Log::new();
    for trace in [
        vec!["Receive", "Check", "Ship", "Invoice"],
        vec!["Receive", "Check", "Invoice", "Ship"],
        vec!["Receive", "Check", "Check", "Ship", "Invoice"],
        vec!["Receive", "Reject"],
    ] {
        log.add_trace(LogTrace::from_activity_ids("", trace));
    }
    log
}

fn read_log(path: &str) -> Result<Log, String> {
    let json = std::fs::read_to_string(path).map_err(|e| format!("Could not read {path}: {e}"))?;
    Log::from_json(&json).map_err(|e| format!("Could not parse {path}: {e}"))
}

/// Usage: `binary [log.json] [threshold]`
fn main() -> ExitCode {
    init_tracing();
    let mut args = std::env::args().skip(1);

    let log = match args.next() {
        Some(path) => match read_log(&path) {
            Ok(log) => log,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("No log file given, using the built-in sample log");
            sample_log()
        }
    };
    let config = match args.next().map(|t| t.parse::<f64>()) {
        Some(Ok(threshold)) => DcrMiningConfig { threshold },
        Some(Err(e)) => {
            error!("Invalid threshold: {e}");
            return ExitCode::FAILURE;
        }
        None => DcrMiningConfig::default(),
    };

    let now = Instant::now();
    let res = match discover_and_minimize(&log, config) {
        Ok(res) => res,
        Err(e) => {
            error!("Mining failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Finished in {:#?}", now.elapsed());

    info!("Mined graph:\n{}", res.graph);
    info!("Minimized graph:\n{}", res.minimized_graph);
    info!("Before minimization: {}", res.measures_before);
    info!("After minimization: {}", res.measures_after);
    info!(
        relations = res.report.redundant_relations_found,
        activities = ?res.report.activities_removed,
        "Removed redundancy"
    );
    if let Ok(json) = res.duration.to_json() {
        info!("Durations: {json}");
    }

    match ByteDcrGraph::compile(&res.minimized_graph) {
        Ok(compiled) => {
            let states = find_unique_states_with_runnable_count(&compiled);
            let finder = UniqueTraceFinder::new(&compiled);
            info!(
                states = states.len(),
                accepted_traces = finder.baseline().accepted.len(),
                "Explored minimized graph"
            );
        }
        Err(e) => error!("Could not compile minimized graph: {e}"),
    }
    match res.minimized_graph.resolve().to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("Could not serialize minimized graph: {e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
