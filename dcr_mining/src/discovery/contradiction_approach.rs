use std::collections::{HashMap, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::event_data::{Log, LogTrace};
use crate::core::process_models::dcr::confidence::DEFAULT_THRESHOLD;
use crate::core::process_models::dcr::dcr_graph_struct::RelationMap;
use crate::core::process_models::dcr::{
    Activity, Confidence, DcrGraph, DcrGraphError, Threshold, ThresholdError,
};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, JsonSchema)]
/// Parameters for contradiction-based DCR discovery
pub struct DcrMiningConfig {
    /// Confidence threshold in `[0, 1]` separating holding from contradicted relations
    pub threshold: f64,
}

impl Default for DcrMiningConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl DcrMiningConfig {
    /// Validated threshold
    pub fn threshold(&self) -> Result<Threshold, ThresholdError> {
        Threshold::new(self.threshold)
    }
    /// Serialize parameters to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
    /// Deserialize parameters from JSON string
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

///
/// Discover a [`DcrGraph`] by collecting contradictions against the strictest possible model
///
/// The miner starts from a graph where every activity is excluded and pending, and every
/// ordered pair of activities is related by an exclude, a condition and (except for self-pairs)
/// a response. Each event and each finished trace adds evidence for or against these
/// relations and states. Whatever is contradicted often enough (see [`Threshold`]) flips:
/// excludes become includes, conditions/responses/pending states are dropped, activities
/// become initially included.
///
/// Traces are identified by id, so events of different traces may be interleaved.
#[derive(Debug, Clone)]
pub struct ContradictionMiner {
    graph: DcrGraph,
    alphabet: Vec<String>,
    runs: HashMap<String, Vec<String>>,
}

impl ContradictionMiner {
    /// Create a miner for the given activities
    pub fn new(
        activities: impl IntoIterator<Item = Activity>,
        threshold: Threshold,
    ) -> Result<Self, DcrGraphError> {
        let mut graph = DcrGraph::new(threshold);
        graph.add_activities(activities)?;
        let alphabet: Vec<String> = graph.activity_ids().map(str::to_string).collect();
        for id in &alphabet {
            graph.set_included(id, false)?;
            graph.set_pending(id, true)?;
        }
        for source in &alphabet {
            for target in &alphabet {
                graph.add_include_exclude(false, source, target)?;
                graph.add_response(source, target)?;
                graph.add_condition(source, target)?;
            }
        }
        debug!(
            activities = alphabet.len(),
            relations = graph.relations_count(),
            "Initialized contradiction miner"
        );
        Ok(Self {
            graph,
            alphabet,
            runs: HashMap::new(),
        })
    }

    /// Create a miner for an alphabet of `(activity id, name)` pairs
    pub fn from_alphabet(
        alphabet: &[(String, String)],
        threshold: Threshold,
    ) -> Result<Self, DcrGraphError> {
        Self::new(
            alphabet.iter().map(|(id, name)| Activity::new(id, name.clone())),
            threshold,
        )
    }

    /// The graph mined so far
    pub fn graph(&self) -> &DcrGraph {
        &self.graph
    }

    /// Consume the miner, returning the mined graph
    pub fn into_graph(self) -> DcrGraph {
        self.graph
    }

    /// Record the execution of an activity in the trace `trace_id`
    ///
    /// An unknown `trace_id` starts a new run.
    /// Returns whether any relation or state flipped.
    pub fn add_event(&mut self, activity_id: &str, trace_id: &str) -> Result<bool, DcrGraphError> {
        let current = Activity::sanitize_id(activity_id);
        if !self.graph.contains_activity(&current) {
            return Err(DcrGraphError::UnknownActivity(current));
        }
        let t = self.graph.threshold();
        let run = self.runs.entry(trace_id.to_string()).or_default();
        let mut altered = false;

        match run.last() {
            None => {
                // Executed first: contradicts being initially excluded
                altered |= self
                    .graph
                    .learning_activity_mut(&current)?
                    .increment_excluded_violation(t);
                for id in &self.alphabet {
                    altered |= self
                        .graph
                        .learning_activity_mut(id)?
                        .increment_excluded_invocation(t);
                }
            }
            Some(last) => {
                let transition_seen = run
                    .windows(2)
                    .any(|w| w[0] == *last && w[1] == current);
                if !transition_seen {
                    let include_excludes = self.graph.include_excludes_mut()?;
                    altered |= relation(include_excludes, last, &current)?.incr_violations(t);
                }
            }
        }

        if !run.contains(&current) {
            let include_excludes = self.graph.include_excludes_mut()?;
            if let Some(targets) = include_excludes.get_mut(&current) {
                for confidence in targets.values_mut() {
                    altered |= confidence.incr_invocations(t);
                }
            }
            let conditions = self.graph.conditions_mut()?;
            for source in self.alphabet.iter().filter(|a| **a != current) {
                let violated = !run.contains(source);
                altered |= relation(conditions, source, &current)?.increment(violated, t);
            }
        }

        run.push(current);
        Ok(altered)
    }

    /// Close the trace `trace_id`
    ///
    /// Closing an unknown trace evaluates an empty run.
    /// Returns whether any relation or state flipped.
    pub fn stop(&mut self, trace_id: &str) -> Result<bool, DcrGraphError> {
        let mut run = self.runs.remove(trace_id).unwrap_or_default();
        let t = self.graph.threshold();
        let occurred: HashSet<&String> = run.iter().collect();
        let mut altered = false;

        for id in &self.alphabet {
            let did_occur = occurred.contains(id);
            let activity = self.graph.learning_activity_mut(id)?;
            altered |= activity.increment_pending_invocation(t);
            if !did_occur {
                altered |= activity.increment_pending_violation(t);
            }
            let self_condition = relation(self.graph.conditions_mut()?, id, id)?;
            altered |= self_condition.incr_invocations(t);
            if did_occur {
                altered |= self_condition.incr_violations(t);
            }
        }

        // Walking backwards: everything not considered yet did not happen after `act`
        let mut considered: HashSet<String> = HashSet::new();
        let responses = self.graph.responses_mut()?;
        while let Some(act) = run.pop() {
            if !considered.insert(act.clone()) {
                continue;
            }
            for other in self.alphabet.iter().filter(|a| **a != act) {
                let violated = !considered.contains(other);
                altered |= relation(responses, &act, other)?.increment(violated, t);
            }
        }

        debug!(trace_id, altered, "Closed trace");
        Ok(altered)
    }

    /// Add all events of a trace and close it
    ///
    /// Empty traces are ignored.
    pub fn add_trace(&mut self, trace: &LogTrace) -> Result<bool, DcrGraphError> {
        let mut altered = false;
        for event in &trace.events {
            altered |= self.add_event(&event.activity_id, &trace.id)?;
        }
        if !trace.events.is_empty() {
            altered |= self.stop(&trace.id)?;
        }
        Ok(altered)
    }

    /// Add every trace of a log
    pub fn add_log(&mut self, log: &Log) -> Result<bool, DcrGraphError> {
        let mut altered = false;
        for trace in &log.traces {
            altered |= self.add_trace(trace)?;
        }
        info!(
            traces = log.traces.len(),
            relations = self.graph.relations_count(),
            "Mined log"
        );
        Ok(altered)
    }

    /// Independent, non-running copy of the mined graph
    pub fn post_processing(&self) -> DcrGraph {
        self.graph.copy()
    }
}

fn relation<'a>(
    map: &'a mut RelationMap,
    source: &str,
    target: &str,
) -> Result<&'a mut Confidence, DcrGraphError> {
    map.get_mut(source)
        .and_then(|targets| targets.get_mut(target))
        .ok_or_else(|| DcrGraphError::UnknownActivity(format!("{source} -> {target}")))
}
