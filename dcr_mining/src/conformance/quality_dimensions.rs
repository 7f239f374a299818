use std::collections::{HashMap, HashSet};

use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::event_data::{Log, LogTrace};
use crate::core::process_models::dcr::{
    Activity, ByteDcrGraph, DcrGraph, DcrGraphError, RelationCouple,
};

///
/// Fitness, precision and simplicity of a [`DcrGraph`] with respect to a [`Log`]
///
/// All values are percentages in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityDimensions {
    /// Share of traces that replay completely and end in a final state
    pub fitness: f64,
    /// Share of the choices offered by the model that the log actually makes
    pub precision: f64,
    /// How far the model is from relating everything to everything
    pub simplicity: f64,
}

impl QualityDimensions {
    /// Compute all three dimensions
    ///
    /// `graph` is replayed from its current state; it is not modified.
    pub fn retrieve(graph: &DcrGraph, log: &Log) -> Result<Self, DcrGraphError> {
        Ok(Self {
            fitness: fitness(graph, log)?,
            precision: precision(graph, log)?,
            simplicity: simplicity(graph),
        })
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for QualityDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fitness {:.2}% | precision {:.2}% | simplicity {:.2}%",
            self.fitness, self.precision, self.simplicity
        )
    }
}

///
/// Percentage of traces of `log` that `graph` can replay, ending in a final state
///
/// Event activity ids are sanitized like during mining.
/// A trace fails as soon as one of its events refers to an unknown or non-runnable activity.
/// An empty log has a fitness of 100. Traces are replayed in parallel.
pub fn fitness(graph: &DcrGraph, log: &Log) -> Result<f64, DcrGraphError> {
    if log.traces.is_empty() {
        return Ok(100.0);
    }
    let replayed = log
        .traces
        .par_iter()
        .map(|trace| replays(graph, trace))
        .collect::<Result<Vec<bool>, _>>()?
        .into_iter()
        .filter(|ok| *ok)
        .count();
    Ok(replayed as f64 / log.traces.len() as f64 * 100.0)
}

fn replays(graph: &DcrGraph, trace: &LogTrace) -> Result<bool, DcrGraphError> {
    let mut g = graph.copy();
    g.set_running(true);
    for event in &trace.events {
        match g.execute(&Activity::sanitize_id(&event.activity_id)) {
            Ok(true) => {}
            Ok(false) => {
                debug!(trace = %trace.id, activity = %event.activity_id, "Not runnable");
                return Ok(false);
            }
            Err(DcrGraphError::UnknownActivity(id)) => {
                warn!(trace = %trace.id, activity = %id, "Unknown activity during replay");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(g.is_final_state())
}

///
/// Percentage of the offered choices that the log makes
///
/// The denominator sums the runnable-activity counts of all distinct states seen: the start
/// state and every state reached while replaying the log. The numerator counts, per distinct
/// state, the different activities the log executed in it. Events that cannot be executed are
/// skipped and the replay of the trace continues.
///
/// If no choice is ever possible, the precision is 100.
pub fn precision(graph: &DcrGraph, log: &Log) -> Result<f64, DcrGraphError> {
    let start = ByteDcrGraph::compile(graph)?;
    let mut runnable_counts: HashMap<Vec<u8>, usize> = HashMap::new();
    let mut chosen: HashMap<Vec<u8>, HashSet<usize>> = HashMap::new();
    runnable_counts.insert(start.state().to_vec(), start.runnable_indexes().len());

    for trace in &log.traces {
        let mut current = start.clone();
        for event in &trace.events {
            let id = Activity::sanitize_id(&event.activity_id);
            let Some(idx) = start.index().index_of(&id) else {
                warn!(trace = %trace.id, activity = %event.activity_id, "Unknown activity during replay");
                continue;
            };
            if !current.runnable_indexes().contains(&idx) {
                continue;
            }
            let before = current.state().to_vec();
            current.execute(idx);
            chosen.entry(before).or_default().insert(idx);
            runnable_counts
                .entry(current.state().to_vec())
                .or_insert_with(|| current.runnable_indexes().len());
        }
    }

    let possible: usize = runnable_counts.values().sum();
    let executed: usize = chosen.values().map(HashSet::len).sum();
    debug!(states = runnable_counts.len(), possible, executed, "Computed precision");
    if possible == 0 {
        return Ok(100.0);
    }
    Ok(executed as f64 / possible as f64 * 100.0)
}

///
/// Simplicity of `graph`, independent of any log
///
/// Averages two ratios: relations against the `4n² - 3n` possible ones, and related
/// (unordered) activity pairs against the `n + n(n-1)/2` possible ones. Floored at 0.
/// A graph without activities has a simplicity of 100.
pub fn simplicity(graph: &DcrGraph) -> f64 {
    let n = graph.len() as f64;
    if graph.is_empty() {
        return 100.0;
    }
    let possible_relations = 4.0 * n * n - 3.0 * n;
    let possible_couples = n + n * (n - 1.0) / 2.0;

    let mut couples: HashSet<RelationCouple> = HashSet::new();
    for map in [graph.conditions(), graph.responses()] {
        for source in map.keys() {
            couples.extend(
                graph
                    .holding_targets(map, source)
                    .map(|target| RelationCouple::new(source.as_str(), target)),
            );
        }
    }
    for (source, targets) in graph.include_excludes() {
        couples.extend(
            targets
                .keys()
                .map(|target| RelationCouple::new(source.as_str(), target.as_str())),
        );
    }
    debug!(
        relations = graph.relations_count(),
        couples = couples.len(),
        threshold = graph.threshold().value(),
        "Computed simplicity"
    );

    let relations_part = (1.0 - graph.relations_count() as f64 / possible_relations) / 2.0;
    let couples_part = (1.0 - couples.len() as f64 / possible_couples) / 2.0;
    ((relations_part + couples_part) * 100.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn log_of(traces: &[&[&str]]) -> Log {
        let mut log = Log::new();
        for (i, trace) in traces.iter().enumerate() {
            log.add_trace(LogTrace::from_activity_ids(i.to_string(), trace.iter()));
        }
        log
    }

    /// A (included) includes and requires B, excludes itself; B (excluded) excludes itself
    fn sequence() -> DcrGraph {
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.add_activity("B", "B").unwrap();
        g.set_included("A", true).unwrap();
        g.set_pending("A", false).unwrap();
        g.set_pending("B", false).unwrap();
        g.add_include_exclude(true, "A", "B").unwrap();
        g.add_include_exclude(false, "A", "A").unwrap();
        g.add_include_exclude(false, "B", "B").unwrap();
        g.add_response("A", "B").unwrap();
        g
    }

    #[test]
    fn fitness_of_sequence() {
        let g = sequence();
        assert_close(fitness(&g, &Log::new()).unwrap(), 100.0);
        assert_close(fitness(&g, &log_of(&[&["A", "B"]])).unwrap(), 100.0);
        // not final, not runnable, unknown
        let log = log_of(&[&["A", "B"], &["A"], &["B"], &["A", "C"]]);
        assert_close(fitness(&g, &log).unwrap(), 25.0);
        // the graph itself is not executed
        assert!(!g.is_running());
        assert!(g.activities().all(|a| !a.is_executed()));
    }

    #[test]
    fn precision_of_sequence() {
        let g = sequence();
        // start (1 choice), after A (1 choice), after B (none)
        assert_close(precision(&g, &log_of(&[&["A", "B"]])).unwrap(), 100.0);
        // only the start state is known, with one unused choice
        assert_close(precision(&g, &Log::new()).unwrap(), 0.0);
        // non-executable events are skipped
        assert_close(precision(&g, &log_of(&[&["B", "A", "X", "B"]])).unwrap(), 100.0);
    }

    #[test]
    fn event_ids_are_sanitized_on_replay() {
        let g = sequence();
        let log = log_of(&[&["A.", "(B)"]]);
        assert_close(fitness(&g, &log).unwrap(), 100.0);
        assert_close(precision(&g, &log).unwrap(), 100.0);
    }

    #[test]
    fn precision_without_choices() {
        let g = DcrGraph::default();
        assert_close(precision(&g, &log_of(&[&["A"]])).unwrap(), 100.0);
    }

    #[test]
    fn precision_counts_distinct_choices() {
        // A and B both included and repeatable: one state with two choices
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.add_activity("B", "B").unwrap();
        for id in ["A", "B"] {
            g.set_included(id, true).unwrap();
            g.set_pending(id, false).unwrap();
        }
        let log = log_of(&[&["A"], &["A"]]);
        // states: start, A executed; 2 choices each; A chosen in the start state only
        assert_close(precision(&g, &log).unwrap(), 25.0);
    }

    #[test]
    fn simplicity_of_single_activity() {
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.set_included("A", true).unwrap();
        g.set_pending("A", false).unwrap();
        assert_close(simplicity(&g), 100.0);
        assert_close(simplicity(&DcrGraph::default()), 100.0);
    }

    #[test]
    fn simplicity_of_sequence() {
        // 4 of 10 relations, 3 of 3 couples
        assert_close(simplicity(&sequence()), 30.0);
    }

    #[test]
    fn simplicity_is_floored() {
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.add_include_exclude(false, "A", "A").unwrap();
        g.add_condition("A", "A").unwrap();
        // 2 of 1 relations, 1 of 1 couples
        assert_close(simplicity(&g), 0.0);
    }

    #[test]
    fn retrieve_all() {
        let q = QualityDimensions::retrieve(&sequence(), &log_of(&[&["A", "B"]])).unwrap();
        assert_close(q.fitness, 100.0);
        assert_close(q.precision, 100.0);
        assert_close(q.simplicity, 30.0);
        let json = q.to_json().unwrap();
        assert_eq!(serde_json::from_str::<QualityDimensions>(&json).unwrap(), q);
    }
}
