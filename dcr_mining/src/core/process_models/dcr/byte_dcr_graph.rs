use std::collections::HashMap;
use std::rc::Rc;

use super::confidence::{Confidence, Threshold};
use super::dcr_graph_struct::{DcrGraph, DcrGraphError, RelationMap};

/// Bit of the state byte marking a runnable activity
pub const RUNNABLE: u8 = 1 << 3;
/// Bit of the state byte marking an executed activity
pub const EXECUTED: u8 = 1 << 2;
/// Bit of the state byte marking an included activity
pub const INCLUDED: u8 = 1 << 1;
/// Bit of the state byte marking a pending activity
pub const PENDING: u8 = 1;

/// Whether the included bit is set
pub fn is_byte_included(b: u8) -> bool {
    b & INCLUDED != 0
}

/// Whether the pending bit is set
pub fn is_byte_pending(b: u8) -> bool {
    b & PENDING != 0
}

/// Whether the runnable bit is set
pub fn can_byte_run(b: u8) -> bool {
    b & RUNNABLE != 0
}

/// Whether a condition from an activity in this state is satisfied
pub fn is_byte_excluded_or_executed(b: u8) -> bool {
    !is_byte_included(b) || b & EXECUTED != 0
}

///
/// Bijection between activity ids and dense indices
///
/// Indices are assigned in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityIndex {
    index_to_id: Vec<String>,
    id_to_index: HashMap<String, usize>,
}

impl ActivityIndex {
    /// Build an index over the given ids
    ///
    /// Duplicates are ignored.
    pub fn new<S: AsRef<str>>(ids: impl IntoIterator<Item = S>) -> Self {
        let mut index_to_id: Vec<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        index_to_id.sort();
        index_to_id.dedup();
        let id_to_index = index_to_id
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self {
            index_to_id,
            id_to_index,
        }
    }

    /// Index of an activity id
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_index.get(id).copied()
    }

    /// Activity id at an index
    pub fn id_of(&self, index: usize) -> Option<&str> {
        self.index_to_id.get(index).map(String::as_str)
    }

    /// Number of indexed activities
    pub fn len(&self) -> usize {
        self.index_to_id.len()
    }

    /// Whether no activity is indexed
    pub fn is_empty(&self) -> bool {
        self.index_to_id.is_empty()
    }

    /// All ids ordered by index
    pub fn ids(&self) -> &[String] {
        &self.index_to_id
    }

    fn require(&self, id: &str) -> Result<usize, DcrGraphError> {
        self.index_of(id)
            .ok_or_else(|| DcrGraphError::UnknownActivity(id.to_string()))
    }
}

/// Thresholded relations as adjacency lists over activity indices
#[derive(Debug, Clone, PartialEq, Eq)]
struct Topology {
    includes: Vec<Vec<usize>>,
    excludes: Vec<Vec<usize>>,
    responses: Vec<Vec<usize>>,
    /// Target to the sources of its holding conditions
    conditions_reversed: Vec<Vec<usize>>,
}

impl Topology {
    fn build(
        graph: &DcrGraph,
        index: &ActivityIndex,
        threshold: Threshold,
    ) -> Result<Self, DcrGraphError> {
        let n = index.len();
        let mut topology = Self {
            includes: vec![Vec::new(); n],
            excludes: vec![Vec::new(); n],
            responses: vec![Vec::new(); n],
            conditions_reversed: vec![Vec::new(); n],
        };
        for (source, target, confidence) in entries(graph.include_excludes()) {
            let (s, t) = (index.require(source)?, index.require(target)?);
            if confidence.is_above_threshold(threshold) {
                topology.includes[s].push(t);
            } else {
                topology.excludes[s].push(t);
            }
        }
        for (source, target, confidence) in entries(graph.responses()) {
            if !confidence.is_above_threshold(threshold) {
                let (s, t) = (index.require(source)?, index.require(target)?);
                topology.responses[s].push(t);
            }
        }
        for (source, target, confidence) in entries(graph.conditions()) {
            if !confidence.is_above_threshold(threshold) {
                let (s, t) = (index.require(source)?, index.require(target)?);
                topology.conditions_reversed[t].push(s);
            }
        }
        Ok(topology)
    }
}

fn entries(map: &RelationMap) -> impl Iterator<Item = (&str, &str, &Confidence)> {
    map.iter().flat_map(|(source, targets)| {
        targets
            .iter()
            .map(move |(target, c)| (source.as_str(), target.as_str(), c))
    })
}

///
/// Compiled, index-based snapshot of a [`DcrGraph`] used for simulation
///
/// Every activity state is packed into one byte (see [`RUNNABLE`], [`EXECUTED`], [`INCLUDED`],
/// [`PENDING`]). The [`ActivityIndex`] and the thresholded relations are shared between clones,
/// only the state bytes are copied.
#[derive(Debug, Clone)]
pub struct ByteDcrGraph {
    index: Rc<ActivityIndex>,
    topology: Rc<Topology>,
    state: Vec<u8>,
}

impl ByteDcrGraph {
    /// Compile a graph, indexing its own activities
    pub fn compile(graph: &DcrGraph) -> Result<Self, DcrGraphError> {
        let index = Rc::new(ActivityIndex::new(graph.activity_ids()));
        Self::compile_with_index(graph, &index)
    }

    /// Compile a graph against an existing [`ActivityIndex`]
    ///
    /// Indexed ids that are not part of `graph` get a zero byte (excluded, never runnable).
    /// Fails if `graph` has an activity or relation endpoint that is not indexed.
    pub fn compile_with_index(
        graph: &DcrGraph,
        index: &Rc<ActivityIndex>,
    ) -> Result<Self, DcrGraphError> {
        let threshold = graph.threshold();
        let topology = Topology::build(graph, index, threshold)?;
        let runnable = graph.runnable_activities();
        let mut state = vec![0; index.len()];
        for activity in graph.activities() {
            let i = index.require(activity.id())?;
            state[i] = activity.state_byte(threshold, runnable.contains(activity.id()));
        }
        Ok(Self {
            index: Rc::clone(index),
            topology: Rc::new(topology),
            state,
        })
    }

    /// Shared id/index bijection
    pub fn index(&self) -> &Rc<ActivityIndex> {
        &self.index
    }

    /// Current state bytes, one per indexed activity
    pub fn state(&self) -> &[u8] {
        &self.state
    }

    /// Indices of all runnable activities, ascending
    pub fn runnable_indexes(&self) -> Vec<usize> {
        self.state
            .iter()
            .enumerate()
            .filter(|(_, b)| can_byte_run(**b))
            .map(|(i, _)| i)
            .collect()
    }

    fn activity_can_run(&self, idx: usize) -> bool {
        is_byte_included(self.state[idx])
            && self.topology.conditions_reversed[idx]
                .iter()
                .all(|&source| is_byte_excluded_or_executed(self.state[source]))
    }

    /// Execute the activity at `idx`
    ///
    /// `idx` has to be runnable (see [`ByteDcrGraph::runnable_indexes`]); this is not checked.
    pub fn execute(&mut self, idx: usize) {
        self.state[idx] |= EXECUTED;
        self.state[idx] &= !PENDING;

        for &j in &self.topology.includes[idx] {
            self.state[j] |= INCLUDED;
        }
        for &j in &self.topology.excludes[idx] {
            self.state[j] &= !INCLUDED;
        }
        for &j in &self.topology.responses[idx] {
            self.state[j] |= PENDING;
        }
        self.refresh_runnable();
    }

    fn refresh_runnable(&mut self) {
        for i in 0..self.state.len() {
            if self.activity_can_run(i) {
                self.state[i] |= RUNNABLE;
            } else {
                self.state[i] &= !RUNNABLE;
            }
        }
    }

    /// Whether no activity is both included and pending in `state`
    pub fn is_final_state(state: &[u8]) -> bool {
        !state
            .iter()
            .any(|&b| is_byte_included(b) && is_byte_pending(b))
    }

    /// Whether the current state is final
    pub fn is_final(&self) -> bool {
        Self::is_final_state(&self.state)
    }

    /// Effectively remove an activity
    ///
    /// The activity is excluded for good: its byte is zeroed and it is no longer the target of
    /// any include or response. It no longer blocks any condition target. The resulting states
    /// are those of the graph without the activity, compiled against the same index.
    pub fn remove_activity(&mut self, id: &str) -> Result<(), DcrGraphError> {
        let idx = self.index.require(id)?;
        self.state[idx] = 0;
        let topology = Rc::make_mut(&mut self.topology);
        for targets in topology
            .includes
            .iter_mut()
            .chain(topology.responses.iter_mut())
        {
            targets.retain(|&t| t != idx);
        }
        self.refresh_runnable();
        Ok(())
    }
}
