use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::conformance::QualityDimensions;
use crate::core::event_data::{Log, LogError};
use crate::core::process_models::dcr::{DcrGraph, DcrGraphError, ThresholdError};
use crate::redundancy_removal::{remove_redundancy, RedundancyReport};

use super::contradiction_approach::{ContradictionMiner, DcrMiningConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Duration (in seconds) per phase of [`discover_and_minimize`] (+ total time)
pub struct MiningDuration {
    /// Duration for mining the log (in seconds)
    pub mining: f32,
    /// Duration for measuring the mined graph (in seconds)
    pub measure_mined: f32,
    /// Duration for removing redundancy (in seconds)
    pub redundancy_removal: f32,
    /// Duration for measuring the minimized graph (in seconds)
    pub measure_minimized: f32,
    /// Total duration (in seconds)
    pub total: f32,
}

impl MiningDuration {
    /// Serialize to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Get current system time milliseconds
pub fn get_current_time_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

///
/// Errors of the discovery pipeline
///
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MiningError {
    /// Invalid threshold in the configuration
    #[error(transparent)]
    Threshold(#[from] ThresholdError),
    /// Graph operation failed
    #[error(transparent)]
    Graph(#[from] DcrGraphError),
    /// Log operation failed
    #[error(transparent)]
    Log(#[from] LogError),
}

///
/// Everything produced by [`discover_and_minimize`]
///
#[derive(Debug, Clone)]
pub struct MiningResult {
    /// The mined graph
    pub graph: DcrGraph,
    /// The mined graph without redundant relations and activities
    pub minimized_graph: DcrGraph,
    /// What was removed during minimization
    pub report: RedundancyReport,
    /// Quality of the mined graph
    pub measures_before: QualityDimensions,
    /// Quality of the minimized graph
    pub measures_after: QualityDimensions,
    /// Time spent per phase
    pub duration: MiningDuration,
}

///
/// Discover a [`DcrGraph`] from `log`, measure it, remove its redundancy and measure again
///
pub fn discover_and_minimize(
    log: &Log,
    config: DcrMiningConfig,
) -> Result<MiningResult, MiningError> {
    discover_and_minimize_with_timing_fn(log, config, &get_current_time_millis)
}

/// Run [`discover_and_minimize`]
///
/// Measures [`MiningDuration`] using the passed `get_time_millis_fn` function
pub fn discover_and_minimize_with_timing_fn(
    log: &Log,
    config: DcrMiningConfig,
    get_time_millis_fn: &dyn Fn() -> u128,
) -> Result<MiningResult, MiningError> {
    let threshold = config.threshold()?;
    let seconds_since = |start: u128| get_time_millis_fn().saturating_sub(start) as f32 / 1000.0;
    let mut duration = MiningDuration::default();
    let total_start = get_time_millis_fn();

    let alphabet = log.alphabet();
    info!(
        traces = log.traces.len(),
        activities = alphabet.len(),
        threshold = threshold.value(),
        "Started contradiction mining"
    );
    let start = get_time_millis_fn();
    let mut miner = ContradictionMiner::from_alphabet(&alphabet, threshold)?;
    miner.add_log(log)?;
    let graph = miner.post_processing();
    duration.mining = seconds_since(start);

    let start = get_time_millis_fn();
    let measures_before = QualityDimensions::retrieve(&graph, log)?;
    duration.measure_mined = seconds_since(start);
    info!(%measures_before, relations = graph.relations_count(), "Measured mined graph");

    let start = get_time_millis_fn();
    let (minimized_graph, report) = remove_redundancy(&graph)?;
    duration.redundancy_removal = seconds_since(start);

    let start = get_time_millis_fn();
    let measures_after = QualityDimensions::retrieve(&minimized_graph, log)?;
    duration.measure_minimized = seconds_since(start);
    info!(
        %measures_after,
        relations = minimized_graph.relations_count(),
        activities = minimized_graph.len(),
        "Measured minimized graph"
    );

    duration.total = seconds_since(total_start);
    Ok(MiningResult {
        graph,
        minimized_graph,
        report,
        measures_before,
        measures_after,
        duration,
    })
}
