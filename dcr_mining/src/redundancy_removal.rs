use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::process_models::dcr::{
    ByteDcrGraph, Confidence, DcrGraph, DcrGraphError, Relation, RelationType,
};
use crate::traversal::UniqueTraceFinder;

///
/// What [`remove_redundancy`] removed
///
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedundancyReport {
    /// Removed responses
    pub responses_removed: Vec<Relation>,
    /// Removed conditions
    pub conditions_removed: Vec<Relation>,
    /// Removed includes
    pub includes_removed: Vec<Relation>,
    /// Removed excludes
    pub excludes_removed: Vec<Relation>,
    /// Ids of removed activities
    pub activities_removed: Vec<String>,
    /// Number of removed relations, including those removed together with an activity
    pub redundant_relations_found: usize,
    /// Number of removed activities
    pub redundant_activities_found: usize,
}

impl RedundancyReport {
    fn record(&mut self, relation: Relation) {
        let list = match relation.relation_type {
            RelationType::Response => &mut self.responses_removed,
            RelationType::Condition => &mut self.conditions_removed,
            RelationType::Inclusion => &mut self.includes_removed,
            RelationType::Exclusion => &mut self.excludes_removed,
        };
        list.push(relation);
        self.redundant_relations_found += 1;
    }
}

/// Relations of `graph` that may be removed for a relation family
///
/// Responses and conditions count only if they hold, every include/exclude entry counts.
fn candidates(graph: &DcrGraph, relation_type: RelationType) -> Vec<(String, String, Confidence)> {
    let threshold = graph.threshold();
    let (map, holding_only) = match relation_type {
        RelationType::Response => (graph.responses(), true),
        RelationType::Condition => (graph.conditions(), true),
        RelationType::Inclusion | RelationType::Exclusion => (graph.include_excludes(), false),
    };
    map.iter()
        .flat_map(|(source, targets)| {
            targets
                .iter()
                .filter(move |(_, c)| !holding_only || !c.is_above_threshold(threshold))
                .map(move |(target, c)| (source.clone(), target.clone(), *c))
        })
        .collect()
}

///
/// Remove every relation and activity whose removal does not change the language of `graph`
///
/// Relations are tried first (responses, then conditions, then includes/excludes), each one
/// against the graph with all previously found redundancies removed. Afterwards, whole
/// activities are tried on the result. The candidates are always taken from the input graph.
///
/// The result depends on the order in which redundancies are found: removing one relation
/// can make another one necessary.
pub fn remove_redundancy(graph: &DcrGraph) -> Result<(DcrGraph, RedundancyReport), DcrGraphError> {
    let baseline = ByteDcrGraph::compile(graph)?;
    let index = Rc::clone(baseline.index());
    let mut finder = UniqueTraceFinder::new(&baseline);
    let threshold = graph.threshold();

    let mut output = graph.copy();
    let mut report = RedundancyReport::default();

    for family in [
        RelationType::Response,
        RelationType::Condition,
        RelationType::Inclusion,
    ] {
        for (source, target, confidence) in candidates(graph, family) {
            let mut candidate = output.copy();
            let relation_type = match family {
                RelationType::Response => {
                    candidate.remove_response(&source, &target)?;
                    RelationType::Response
                }
                RelationType::Condition => {
                    candidate.remove_condition(&source, &target)?;
                    RelationType::Condition
                }
                RelationType::Inclusion | RelationType::Exclusion => {
                    candidate.remove_include_exclude(&source, &target)?;
                    if confidence.is_above_threshold(threshold) {
                        RelationType::Inclusion
                    } else {
                        RelationType::Exclusion
                    }
                }
            };
            let compiled = ByteDcrGraph::compile_with_index(&candidate, &index)?;
            let relation = Relation::new(relation_type, source, target);
            if finder.compare_traces(&compiled) {
                debug!(%relation, "Redundant");
                output = candidate;
                report.record(relation);
            } else {
                debug!(%relation, failure = ?finder.comparison_failure_trace(), "Not redundant");
            }
        }
    }

    let activity_ids: Vec<String> = output.activity_ids().map(str::to_string).collect();
    for id in activity_ids {
        let mut compiled = ByteDcrGraph::compile_with_index(&output, &index)?;
        compiled.remove_activity(&id)?;
        if finder.compare_traces(&compiled) {
            debug!(activity = %id, "Redundant activity");
            let relations_before = output.relations_count();
            output.remove_activity(&id)?;
            report.redundant_relations_found += relations_before - output.relations_count();
            report.redundant_activities_found += 1;
            report.activities_removed.push(id);
        }
    }

    info!(
        relations = report.redundant_relations_found,
        activities = report.redundant_activities_found,
        states = finder.baseline().states_visited,
        "Removed redundancy"
    );
    Ok((output, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A (included, done) includes B and must be followed by it; the condition A -> B is
    /// redundant since B is excluded until A was executed and excluded itself
    fn graph_with_redundant_condition() -> DcrGraph {
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.add_activity("B", "B").unwrap();
        g.set_included("A", true).unwrap();
        g.set_pending("A", false).unwrap();
        g.set_pending("B", false).unwrap();
        g.add_include_exclude(true, "A", "B").unwrap();
        g.add_include_exclude(false, "A", "A").unwrap();
        g.add_response("A", "B").unwrap();
        g.add_condition("A", "B").unwrap();
        g
    }

    #[test]
    fn removes_exactly_the_redundant_condition() {
        let g = graph_with_redundant_condition();
        let (minimized, report) = remove_redundancy(&g).unwrap();
        assert_eq!(
            report.conditions_removed,
            vec![Relation::new(RelationType::Condition, "A", "B")]
        );
        assert!(report.responses_removed.is_empty());
        assert!(report.includes_removed.is_empty());
        assert!(report.excludes_removed.is_empty());
        assert!(report.activities_removed.is_empty());
        assert_eq!(report.redundant_relations_found, 1);
        assert_eq!(minimized.conditions_count(), 0);
        assert_eq!(minimized.relations_count(), g.relations_count() - 1);
        // the input is untouched
        assert_eq!(g.conditions_count(), 1);
    }

    #[test]
    fn removal_is_idempotent() {
        let (once, _) = remove_redundancy(&graph_with_redundant_condition()).unwrap();
        let (twice, report) = remove_redundancy(&once).unwrap();
        assert_eq!(report, RedundancyReport::default());
        assert_eq!(twice.resolve(), once.resolve());
    }

    #[test]
    fn unreachable_activity_is_removed() {
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.add_activity("C", "C").unwrap();
        g.set_included("A", true).unwrap();
        g.set_pending("A", false).unwrap();
        g.set_pending("C", false).unwrap();
        g.add_include_exclude(false, "C", "C").unwrap();

        let (minimized, report) = remove_redundancy(&g).unwrap();
        assert_eq!(
            report.excludes_removed,
            vec![Relation::new(RelationType::Exclusion, "C", "C")]
        );
        assert_eq!(report.activities_removed, vec!["C".to_string()]);
        assert_eq!(report.redundant_activities_found, 1);
        assert_eq!(report.redundant_relations_found, 1);
        assert!(!minimized.contains_activity("C"));
        assert!(minimized.contains_activity("A"));
    }

    #[test]
    fn single_activity_keeps_everything() {
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.set_included("A", true).unwrap();
        g.set_pending("A", false).unwrap();
        let (minimized, report) = remove_redundancy(&g).unwrap();
        assert_eq!(report, RedundancyReport::default());
        assert_eq!(minimized.len(), 1);
    }
}
