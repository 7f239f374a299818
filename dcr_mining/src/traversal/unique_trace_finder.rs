use std::collections::HashSet;
use std::rc::Rc;

use itertools::Itertools;
use tracing::debug;

use crate::core::process_models::dcr::{ActivityIndex, ByteDcrGraph};

/// A trace as a sequence of activity indices (see [`ActivityIndex`])
pub type IndexTrace = Vec<usize>;

///
/// Traces found by exhaustively simulating a [`ByteDcrGraph`]
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceLanguage {
    /// Traces ending in a final state
    pub accepted: HashSet<IndexTrace>,
    /// Traces reaching a state that was already explored via another path
    pub early_terminated: HashSet<IndexTrace>,
    /// Number of distinct states explored
    pub states_visited: usize,
}

impl TraceLanguage {
    /// Same accepted and early-terminated traces
    ///
    /// The explored state space itself is not compared: different graphs may have the same
    /// language.
    pub fn same_language(&self, other: &TraceLanguage) -> bool {
        self.accepted == other.accepted && self.early_terminated == other.early_terminated
    }
}

/// DFS frame: a state to expand and the next runnable activity to try
struct Frame {
    graph: ByteDcrGraph,
    trace: IndexTrace,
    runnable: Vec<usize>,
    next: usize,
}

impl Frame {
    fn new(graph: ByteDcrGraph, trace: IndexTrace) -> Self {
        let runnable = graph.runnable_indexes();
        Self {
            graph,
            trace,
            runnable,
            next: 0,
        }
    }
}

/// Explore the language of `graph`, aborting on the first accepted trace outside `baseline`
///
/// Returns the (possibly partial) language and the offending trace, if any.
fn explore(
    graph: &ByteDcrGraph,
    baseline: Option<&HashSet<IndexTrace>>,
) -> (TraceLanguage, Option<IndexTrace>) {
    let mut language = TraceLanguage::default();
    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    seen.insert(graph.state().to_vec());

    let start = Frame::new(graph.clone(), Vec::new());
    if start.runnable.is_empty() && graph.is_final() {
        language.accepted.insert(Vec::new());
    }
    let mut stack = vec![start];

    while let Some(frame) = stack.last_mut() {
        let Some(&activity) = frame.runnable.get(frame.next) else {
            stack.pop();
            continue;
        };
        frame.next += 1;

        let mut child = frame.graph.clone();
        child.execute(activity);
        let mut trace = frame.trace.clone();
        trace.push(activity);

        if child.is_final() {
            if baseline.is_some_and(|b| !b.contains(&trace)) {
                language.states_visited = seen.len();
                return (language, Some(trace));
            }
            language.accepted.insert(trace.clone());
        }

        if seen.insert(child.state().to_vec()) {
            stack.push(Frame::new(child, trace));
        } else {
            language.early_terminated.insert(trace);
        }
    }

    language.states_visited = seen.len();
    (language, None)
}

/// Compute the complete language of a compiled graph
pub fn find_language(graph: &ByteDcrGraph) -> TraceLanguage {
    let (language, _) = explore(graph, None);
    debug!(
        states = language.states_visited,
        accepted = language.accepted.len(),
        early_terminated = language.early_terminated.len(),
        "Explored language"
    );
    language
}

///
/// Language of a baseline graph, against which other graphs can be compared
///
/// All compared graphs must be compiled against the same [`ActivityIndex`] as the baseline
/// (see [`ByteDcrGraph::compile_with_index`]).
#[derive(Debug, Clone)]
pub struct UniqueTraceFinder {
    index: Rc<ActivityIndex>,
    baseline: TraceLanguage,
    comparison_failure_trace: Option<Vec<String>>,
}

impl UniqueTraceFinder {
    /// Explore and store the language of `graph`
    pub fn new(graph: &ByteDcrGraph) -> Self {
        Self {
            index: Rc::clone(graph.index()),
            baseline: find_language(graph),
            comparison_failure_trace: None,
        }
    }

    /// The baseline language
    pub fn baseline(&self) -> &TraceLanguage {
        &self.baseline
    }

    /// Whether `graph` has the same language as the baseline
    ///
    /// Stops exploring as soon as `graph` accepts a trace the baseline does not; that trace is
    /// then available through [`UniqueTraceFinder::comparison_failure_trace`].
    pub fn compare_traces(&mut self, graph: &ByteDcrGraph) -> bool {
        self.comparison_failure_trace = None;
        let (language, failure) = explore(graph, Some(&self.baseline.accepted));
        if let Some(trace) = failure {
            self.comparison_failure_trace = Some(self.to_activity_ids(&trace));
            return false;
        }
        self.baseline.same_language(&language)
    }

    /// Accepted trace (as activity ids) that made the last comparison fail early
    pub fn comparison_failure_trace(&self) -> Option<&[String]> {
        self.comparison_failure_trace.as_deref()
    }

    /// Whether the baseline accepts no trace at all
    pub fn has_no_accepting_trace(&self) -> bool {
        self.baseline.accepted.is_empty()
    }

    /// Accepted traces of the baseline as activity ids, sorted
    pub fn language_as_activity_ids(&self) -> Vec<Vec<String>> {
        self.baseline
            .accepted
            .iter()
            .map(|trace| self.to_activity_ids(trace))
            .sorted()
            .collect()
    }

    fn to_activity_ids(&self, trace: &[usize]) -> Vec<String> {
        trace
            .iter()
            .filter_map(|&i| self.index.id_of(i))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::process_models::dcr::DcrGraph;

    use super::*;

    fn single_activity() -> DcrGraph {
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.set_included("A", true).unwrap();
        g.set_pending("A", false).unwrap();
        g
    }

    /// A (included) includes and requires B, excludes itself; B (excluded) excludes itself
    fn sequence() -> DcrGraph {
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.add_activity("B", "B").unwrap();
        g.set_included("A", true).unwrap();
        g.add_include_exclude(true, "A", "B").unwrap();
        g.add_include_exclude(false, "A", "A").unwrap();
        g.add_include_exclude(false, "B", "B").unwrap();
        g.add_response("A", "B").unwrap();
        g
    }

    #[test]
    fn single_activity_language() {
        let c = ByteDcrGraph::compile(&single_activity()).unwrap();
        let language = find_language(&c);
        assert_eq!(language.accepted, HashSet::from([vec![0], vec![0, 0]]));
        assert_eq!(language.early_terminated, HashSet::from([vec![0, 0]]));
        assert_eq!(language.states_visited, 2);
    }

    #[test]
    fn sequence_language() {
        let finder = UniqueTraceFinder::new(&ByteDcrGraph::compile(&sequence()).unwrap());
        assert_eq!(
            finder.language_as_activity_ids(),
            vec![vec!["A".to_string(), "B".to_string()]]
        );
        assert!(finder.baseline().early_terminated.is_empty());
        assert!(!finder.has_no_accepting_trace());
    }

    #[test]
    fn empty_graph_accepts_empty_trace() {
        let language = find_language(&ByteDcrGraph::compile(&DcrGraph::default()).unwrap());
        assert_eq!(language.accepted, HashSet::from([vec![]]));

        // included and pending, but blocked by a condition from an included, unexecutable activity
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.set_included("A", true).unwrap();
        g.add_condition("A", "A").unwrap();
        let finder = UniqueTraceFinder::new(&ByteDcrGraph::compile(&g).unwrap());
        assert!(finder.has_no_accepting_trace());
    }

    #[test]
    fn exploration_is_deterministic() {
        let c = ByteDcrGraph::compile(&sequence()).unwrap();
        assert_eq!(find_language(&c), find_language(&c));
    }

    #[test]
    fn comparison_detects_language_change() {
        let g = sequence();
        let baseline = ByteDcrGraph::compile(&g).unwrap();
        let mut finder = UniqueTraceFinder::new(&baseline);
        assert!(finder.compare_traces(&baseline.clone()));

        // without the self-exclude, A can be repeated
        let mut changed = g.copy();
        changed.remove_include_exclude("A", "A").unwrap();
        let changed = ByteDcrGraph::compile_with_index(&changed, baseline.index()).unwrap();
        assert!(!finder.compare_traces(&changed));
        let ids = |ids: &[&str]| ids.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            finder.comparison_failure_trace(),
            Some(ids(&["A", "B", "A", "B"]).as_slice())
        );

        // once B is gone, executing A alone is accepted
        let mut removed = baseline.clone();
        removed.remove_activity("B").unwrap();
        assert!(!finder.compare_traces(&removed));
        assert_eq!(finder.comparison_failure_trace(), Some(ids(&["A"]).as_slice()));

        assert!(finder.compare_traces(&baseline));
        assert_eq!(finder.comparison_failure_trace(), None);
    }
}
