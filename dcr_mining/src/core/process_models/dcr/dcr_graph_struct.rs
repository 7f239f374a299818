use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::activity::Activity;
use super::confidence::{Confidence, Threshold};

///
/// Errors raised by structural or runtime operations on a [`DcrGraph`]
///
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DcrGraphError {
    /// Structural mutation on a running graph
    #[error("It is not permitted to change the structure of a running graph")]
    GraphRunning,
    /// Execution on a graph that is not running
    #[error("It is not permitted to execute an activity on a graph that is not running")]
    GraphNotRunning,
    /// No activity with this id exists in the graph
    #[error("Unknown activity: {0}")]
    UnknownActivity(String),
}

/// Relation map: source activity id to (target activity id to [`Confidence`])
pub type RelationMap = BTreeMap<String, BTreeMap<String, Confidence>>;

///
/// A DCR graph whose relations carry learned [`Confidence`]s
///
/// Activities and relations are keyed by activity id.
/// All threshold-dependent booleans are resolved on read using the graph's [`Threshold`].
///
/// Polarity of the relation maps:
/// * `include_excludes`: ratio _above_ the threshold means include, otherwise exclude.
///   Every entry is a relation (either an include or an exclude).
/// * `responses`, `conditions`: ratio _not above_ the threshold means the relation holds.
///
/// Structural mutations fail with [`DcrGraphError::GraphRunning`] once the graph is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcrGraph {
    /// Optional title
    pub title: Option<String>,
    threshold: Threshold,
    activities: BTreeMap<String, Activity>,
    responses: RelationMap,
    include_excludes: RelationMap,
    conditions: RelationMap,
    running: bool,
}

impl Default for DcrGraph {
    fn default() -> Self {
        Self::new(Threshold::default())
    }
}

impl DcrGraph {
    /// Create a new, empty [`DcrGraph`] resolving its relations with `threshold`
    pub fn new(threshold: Threshold) -> Self {
        Self {
            title: None,
            threshold,
            activities: BTreeMap::new(),
            responses: RelationMap::new(),
            include_excludes: RelationMap::new(),
            conditions: RelationMap::new(),
            running: false,
        }
    }

    /// Threshold all relations and activity states are resolved with
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Whether the graph is running (executing activities is allowed, changing structure is not)
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start or stop running the graph
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    fn ensure_not_running(&self) -> Result<(), DcrGraphError> {
        if self.running {
            Err(DcrGraphError::GraphRunning)
        } else {
            Ok(())
        }
    }

    fn ensure_activity(&self, id: &str) -> Result<(), DcrGraphError> {
        if self.activities.contains_key(id) {
            Ok(())
        } else {
            Err(DcrGraphError::UnknownActivity(id.to_string()))
        }
    }

    /// Activities in ascending id order
    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    /// Ids of all activities in ascending order
    pub fn activity_ids(&self) -> impl Iterator<Item = &str> {
        self.activities.keys().map(String::as_str)
    }

    /// Number of activities
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    /// Whether the graph has no activities
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Get an activity by id
    pub fn get_activity(&self, id: &str) -> Option<&Activity> {
        self.activities.get(id)
    }

    /// Check whether an activity with this id exists
    pub fn contains_activity(&self, id: &str) -> bool {
        self.activities.contains_key(id)
    }

    fn activity_mut(&mut self, id: &str) -> Result<&mut Activity, DcrGraphError> {
        self.activities
            .get_mut(id)
            .ok_or_else(|| DcrGraphError::UnknownActivity(id.to_string()))
    }

    /// Response relations (see [`DcrGraph`] for their polarity)
    pub fn responses(&self) -> &RelationMap {
        &self.responses
    }

    /// Include/exclude relations (see [`DcrGraph`] for their polarity)
    pub fn include_excludes(&self) -> &RelationMap {
        &self.include_excludes
    }

    /// Condition relations (see [`DcrGraph`] for their polarity)
    pub fn conditions(&self) -> &RelationMap {
        &self.conditions
    }

    /// Mutable access to the response confidences, for learning
    ///
    /// Only the [`Confidence`]s should be changed through this, not the keys.
    pub fn responses_mut(&mut self) -> Result<&mut RelationMap, DcrGraphError> {
        self.ensure_not_running()?;
        Ok(&mut self.responses)
    }

    /// Mutable access to the include/exclude confidences, for learning
    pub fn include_excludes_mut(&mut self) -> Result<&mut RelationMap, DcrGraphError> {
        self.ensure_not_running()?;
        Ok(&mut self.include_excludes)
    }

    /// Mutable access to the condition confidences, for learning
    pub fn conditions_mut(&mut self) -> Result<&mut RelationMap, DcrGraphError> {
        self.ensure_not_running()?;
        Ok(&mut self.conditions)
    }

    /// Mutable access to an activity's learned states
    pub fn learning_activity_mut(&mut self, id: &str) -> Result<&mut Activity, DcrGraphError> {
        self.ensure_not_running()?;
        self.activity_mut(id)
    }

    /// Add an activity with the given id and name
    ///
    /// The id is sanitized. An already existing activity with the same id is replaced.
    /// Returns the (sanitized) id.
    pub fn add_activity(
        &mut self,
        id: impl AsRef<str>,
        name: impl Into<String>,
    ) -> Result<String, DcrGraphError> {
        self.insert_activity(Activity::new(id, name))
    }

    /// Add an activity with the given id, name and roles
    pub fn add_activity_with_roles(
        &mut self,
        id: impl AsRef<str>,
        name: impl Into<String>,
        roles: impl Into<String>,
    ) -> Result<String, DcrGraphError> {
        let mut activity = Activity::new(id, name);
        activity.roles = Some(roles.into());
        self.insert_activity(activity)
    }

    /// Add multiple, already constructed activities
    pub fn add_activities(
        &mut self,
        activities: impl IntoIterator<Item = Activity>,
    ) -> Result<(), DcrGraphError> {
        for a in activities {
            self.insert_activity(a)?;
        }
        Ok(())
    }

    fn insert_activity(&mut self, activity: Activity) -> Result<String, DcrGraphError> {
        self.ensure_not_running()?;
        let id = activity.id().to_string();
        self.activities.insert(id.clone(), activity);
        Ok(id)
    }

    /// Set the roles of an activity
    pub fn add_roles_to_activity(
        &mut self,
        id: &str,
        roles: impl Into<String>,
    ) -> Result<(), DcrGraphError> {
        self.ensure_not_running()?;
        self.activity_mut(id)?.roles = Some(roles.into());
        Ok(())
    }

    /// Remove an activity and every relation it is part of
    ///
    /// Returns the number of relation entries removed alongside.
    pub fn remove_activity(&mut self, id: &str) -> Result<usize, DcrGraphError> {
        self.ensure_not_running()?;
        self.ensure_activity(id)?;
        self.activities.remove(id);
        Ok(remove_from_relation(&mut self.responses, id)
            + remove_from_relation(&mut self.conditions, id)
            + remove_from_relation(&mut self.include_excludes, id))
    }

    /// Set the executed flag of an activity
    pub fn set_executed(&mut self, id: &str, executed: bool) -> Result<(), DcrGraphError> {
        self.ensure_not_running()?;
        self.activity_mut(id)?.set_executed(executed);
        Ok(())
    }

    /// Set the included flag of an activity
    pub fn set_included(&mut self, id: &str, included: bool) -> Result<(), DcrGraphError> {
        self.ensure_not_running()?;
        self.activity_mut(id)?.set_included(included);
        Ok(())
    }

    /// Set the pending flag of an activity
    pub fn set_pending(&mut self, id: &str, pending: bool) -> Result<(), DcrGraphError> {
        self.ensure_not_running()?;
        self.activity_mut(id)?.set_pending(pending);
        Ok(())
    }

    fn checked_pair(&self, source: &str, target: &str) -> Result<(), DcrGraphError> {
        self.ensure_not_running()?;
        self.ensure_activity(source)?;
        self.ensure_activity(target)
    }

    /// Add an include (`include == true`) or exclude relation from `source` to `target`
    ///
    /// Overwrites a previously present include/exclude between the two.
    pub fn add_include_exclude(
        &mut self,
        include: bool,
        source: &str,
        target: &str,
    ) -> Result<(), DcrGraphError> {
        let confidence = if include {
            Confidence::new(1, 1)
        } else {
            Confidence::default()
        };
        self.add_include_exclude_with_confidence(confidence, source, target)
    }

    /// Add an include/exclude relation backed by a given [`Confidence`]
    pub fn add_include_exclude_with_confidence(
        &mut self,
        confidence: Confidence,
        source: &str,
        target: &str,
    ) -> Result<(), DcrGraphError> {
        self.checked_pair(source, target)?;
        put_relation(&mut self.include_excludes, source, target, confidence);
        Ok(())
    }

    /// Add a response relation from `source` to `target`
    ///
    /// Self-responses are never added; `Ok(false)` is returned for them.
    pub fn add_response(&mut self, source: &str, target: &str) -> Result<bool, DcrGraphError> {
        self.checked_pair(source, target)?;
        if source == target {
            return Ok(false);
        }
        put_relation(&mut self.responses, source, target, Confidence::default());
        Ok(true)
    }

    /// Add a condition relation from `source` to `target`
    pub fn add_condition(&mut self, source: &str, target: &str) -> Result<(), DcrGraphError> {
        self.checked_pair(source, target)?;
        put_relation(&mut self.conditions, source, target, Confidence::default());
        Ok(())
    }

    /// Remove the response relation from `source` to `target` (if present)
    pub fn remove_response(&mut self, source: &str, target: &str) -> Result<(), DcrGraphError> {
        self.checked_pair(source, target)?;
        remove_relation(&mut self.responses, source, target);
        Ok(())
    }

    /// Remove the condition relation from `source` to `target` (if present)
    pub fn remove_condition(&mut self, source: &str, target: &str) -> Result<(), DcrGraphError> {
        self.checked_pair(source, target)?;
        remove_relation(&mut self.conditions, source, target);
        Ok(())
    }

    /// Remove the include/exclude relation from `source` to `target` (if present)
    pub fn remove_include_exclude(
        &mut self,
        source: &str,
        target: &str,
    ) -> Result<(), DcrGraphError> {
        self.checked_pair(source, target)?;
        remove_relation(&mut self.include_excludes, source, target);
        Ok(())
    }

    /// Number of condition relations that hold
    pub fn conditions_count(&self) -> usize {
        count_where(&self.conditions, |c| !c.is_above_threshold(self.threshold))
    }

    /// Number of response relations that hold
    pub fn responses_count(&self) -> usize {
        count_where(&self.responses, |c| !c.is_above_threshold(self.threshold))
    }

    /// Number of include/exclude entries resolving to an include
    pub fn includes_count(&self) -> usize {
        count_where(&self.include_excludes, |c| {
            c.is_above_threshold(self.threshold)
        })
    }

    /// Number of include/exclude entries resolving to an exclude
    pub fn excludes_count(&self) -> usize {
        count_where(&self.include_excludes, |c| {
            !c.is_above_threshold(self.threshold)
        })
    }

    /// Total number of relations (includes, excludes, conditions and responses)
    pub fn relations_count(&self) -> usize {
        self.includes_count() + self.excludes_count() + self.conditions_count() + self.responses_count()
    }

    /// Targets of the holding relations of `source` in a response or condition map
    pub(crate) fn holding_targets<'a>(
        &'a self,
        map: &'a RelationMap,
        source: &str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        let threshold = self.threshold;
        map.get(source)
            .into_iter()
            .flat_map(move |targets| {
                targets
                    .iter()
                    .filter(move |(_, c)| !c.is_above_threshold(threshold))
                    .map(|(t, _)| t.as_str())
            })
    }

    /// Ids of all included activities
    pub fn included_activities(&self) -> BTreeSet<&str> {
        self.activities
            .values()
            .filter(|a| a.is_included(self.threshold))
            .map(Activity::id)
            .collect()
    }

    /// Ids of all activities that are runnable in the current state
    ///
    /// An activity is runnable if it is included and no included, not yet executed activity
    /// has a holding condition to it.
    pub fn runnable_activities(&self) -> BTreeSet<&str> {
        let mut included = self.included_activities();
        let constrained: Vec<&str> = included
            .iter()
            .filter(|source| {
                self.activities
                    .get(**source)
                    .is_some_and(|a| !a.is_executed())
            })
            .flat_map(|source| self.holding_targets(&self.conditions, source))
            .collect();
        for target in constrained {
            included.remove(target);
        }
        included
    }

    /// Execute the activity with the given id
    ///
    /// The graph has to be running. Returns `Ok(false)` if the activity is not runnable.
    pub fn execute(&mut self, id: &str) -> Result<bool, DcrGraphError> {
        if !self.running {
            return Err(DcrGraphError::GraphNotRunning);
        }
        self.ensure_activity(id)?;
        if !self.runnable_activities().contains(id) {
            return Ok(false);
        }
        let threshold = self.threshold;

        let activity = self.activity_mut(id)?;
        activity.set_executed(true);
        activity.set_pending(false);

        let pending_targets: Vec<String> = self
            .holding_targets(&self.responses, id)
            .map(str::to_string)
            .collect();
        for target in pending_targets {
            self.activity_mut(&target)?.set_pending(true);
        }

        let inc_exc_targets: Vec<(String, bool)> = self
            .include_excludes
            .get(id)
            .map(|targets| {
                targets
                    .iter()
                    .map(|(t, c)| (t.clone(), c.is_above_threshold(threshold)))
                    .collect()
            })
            .unwrap_or_default();
        for (target, include) in inc_exc_targets {
            self.activity_mut(&target)?.set_included(include);
        }
        Ok(true)
    }

    /// Whether no activity is both included and pending
    pub fn is_final_state(&self) -> bool {
        !self
            .activities
            .values()
            .any(|a| a.is_included(self.threshold) && a.is_pending(self.threshold))
    }

    /// Whether every activity of this graph exists in `other` with the same runtime flags
    pub fn are_in_equal_state(&self, other: &DcrGraph) -> bool {
        self.activities.values().all(|a| {
            other.activities.get(a.id()).is_some_and(|o| {
                a.is_executed() == o.is_executed()
                    && a.is_included(self.threshold) == o.is_included(other.threshold)
                    && a.is_pending(self.threshold) == o.is_pending(other.threshold)
            })
        })
    }

    /// Whether the activity takes part in any relation
    ///
    /// Any include/exclude entry counts. Responses and conditions count as outgoing when they
    /// hold, and as incoming when they are contradicted.
    pub fn activity_has_relations(&self, id: &str) -> bool {
        let in_relation = |map: &RelationMap, any_outgoing: bool| {
            let outgoing = map.get(id).is_some_and(|targets| {
                if any_outgoing {
                    !targets.is_empty()
                } else {
                    targets.values().any(|c| !c.is_above_threshold(self.threshold))
                }
            });
            let incoming = map.values().any(|targets| {
                targets
                    .get(id)
                    .is_some_and(|c| any_outgoing || c.is_above_threshold(self.threshold))
            });
            outgoing || incoming
        };
        in_relation(&self.include_excludes, true)
            || in_relation(&self.responses, false)
            || in_relation(&self.conditions, false)
    }

    /// Copy the graph
    ///
    /// The copy is independent of `self` and not running.
    pub fn copy(&self) -> Self {
        let mut copy = self.clone();
        copy.running = false;
        copy
    }

    /// Resolve all learned relations and states against the threshold
    pub fn resolve(&self) -> ResolvedDcrGraph {
        let t = self.threshold;
        let holding = |map: &RelationMap| {
            relation_pairs(map, |c| !c.is_above_threshold(t))
        };
        ResolvedDcrGraph {
            title: self.title.clone(),
            threshold: t.value(),
            activities: self
                .activities
                .values()
                .map(|a| ResolvedActivity {
                    id: a.id().to_string(),
                    name: a.name.clone(),
                    roles: a.roles.clone(),
                    included: a.is_included(t),
                    pending: a.is_pending(t),
                    executed: a.is_executed(),
                })
                .collect(),
            conditions: holding(&self.conditions),
            responses: holding(&self.responses),
            includes: relation_pairs(&self.include_excludes, |c| c.is_above_threshold(t)),
            excludes: relation_pairs(&self.include_excludes, |c| !c.is_above_threshold(t)),
        }
    }
}

impl std::fmt::Display for DcrGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = self.resolve();
        writeln!(f, "Activities:")?;
        for a in &r.activities {
            writeln!(
                f,
                "{} : {} inc={} pnd={} exe={}",
                a.id, a.name, a.included, a.pending, a.executed
            )?;
        }
        for (label, pairs) in [
            ("Include", &r.includes),
            ("Exclude", &r.excludes),
            ("Response", &r.responses),
            ("Condition", &r.conditions),
        ] {
            writeln!(f, "{label}-relations:")?;
            for p in pairs {
                writeln!(f, "{} -> {}", p.source, p.target)?;
            }
        }
        Ok(())
    }
}

fn put_relation(map: &mut RelationMap, source: &str, target: &str, confidence: Confidence) {
    map.entry(source.to_string())
        .or_default()
        .insert(target.to_string(), confidence);
}

fn remove_relation(map: &mut RelationMap, source: &str, target: &str) {
    if let Some(targets) = map.get_mut(source) {
        targets.remove(target);
    }
}

/// Remove all relations with `id` as source or target, returning how many were removed
fn remove_from_relation(map: &mut RelationMap, id: &str) -> usize {
    let mut removed = 0;
    for targets in map.values_mut() {
        if targets.remove(id).is_some() {
            removed += 1;
        }
    }
    if let Some(outgoing) = map.remove(id) {
        removed += outgoing.len();
    }
    removed
}

fn count_where(map: &RelationMap, pred: impl Fn(&Confidence) -> bool) -> usize {
    map.values()
        .flat_map(|targets| targets.values())
        .filter(|&c| pred(c))
        .count()
}

fn relation_pairs(map: &RelationMap, pred: impl Fn(&Confidence) -> bool) -> Vec<ResolvedRelation> {
    let pred = &pred;
    map.iter()
        .flat_map(|(source, targets)| {
            targets
                .iter()
                .filter(move |(_, c)| pred(*c))
                .map(move |(target, _)| ResolvedRelation {
                    source: source.clone(),
                    target: target.clone(),
                })
        })
        .collect()
}

/// Activity of a [`ResolvedDcrGraph`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedActivity {
    /// Activity id
    pub id: String,
    /// Display name
    pub name: String,
    /// Roles allowed to execute the activity
    pub roles: Option<String>,
    /// Included in the initial state
    pub included: bool,
    /// Pending in the initial state
    pub pending: bool,
    /// Already executed
    pub executed: bool,
}

/// Directed relation between two activity ids of a [`ResolvedDcrGraph`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedRelation {
    /// Source activity id
    pub source: String,
    /// Target activity id
    pub target: String,
}

///
/// Plain view of a [`DcrGraph`] with all confidences resolved to booleans
///
/// This is what exporters consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedDcrGraph {
    /// Optional title
    pub title: Option<String>,
    /// Threshold the graph was resolved with
    pub threshold: f64,
    /// Activities sorted by id
    pub activities: Vec<ResolvedActivity>,
    /// Holding conditions
    pub conditions: Vec<ResolvedRelation>,
    /// Holding responses
    pub responses: Vec<ResolvedRelation>,
    /// Include relations
    pub includes: Vec<ResolvedRelation>,
    /// Exclude relations
    pub excludes: Vec<ResolvedRelation>,
}

impl ResolvedDcrGraph {
    /// Serialize to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_activity_graph() -> DcrGraph {
        let mut g = DcrGraph::default();
        g.add_activity("A", "A").unwrap();
        g.add_activity("B", "B").unwrap();
        g.set_included("A", true).unwrap();
        g.set_pending("A", false).unwrap();
        g.set_pending("B", false).unwrap();
        g
    }

    #[test]
    fn mutation_is_rejected_while_running() {
        let mut g = two_activity_graph();
        g.set_running(true);
        assert_eq!(g.add_activity("C", "C"), Err(DcrGraphError::GraphRunning));
        assert_eq!(g.add_condition("A", "B"), Err(DcrGraphError::GraphRunning));
        assert_eq!(g.remove_activity("A"), Err(DcrGraphError::GraphRunning));
        assert_eq!(g.set_pending("A", true), Err(DcrGraphError::GraphRunning));
        assert_eq!(
            g.add_roles_to_activity("A", "clerk"),
            Err(DcrGraphError::GraphRunning)
        );
        assert_eq!(g.get_activity("A").unwrap().roles, None);
        assert!(g.responses_mut().is_err());
        // copies are never running
        let mut copy = g.copy();
        assert!(!copy.is_running());
        assert!(copy.add_activity("C", "C").is_ok());
        assert!(!g.contains_activity("C"));
    }

    #[test]
    fn unknown_activities_are_reported() {
        let mut g = two_activity_graph();
        assert_eq!(
            g.add_response("A", "X"),
            Err(DcrGraphError::UnknownActivity("X".to_string()))
        );
        g.set_running(true);
        assert_eq!(
            g.execute("X"),
            Err(DcrGraphError::UnknownActivity("X".to_string()))
        );
    }

    #[test]
    fn execution_at_extreme_thresholds() {
        for t in [0.0, 1.0] {
            let mut g = DcrGraph::new(Threshold::new(t).unwrap());
            g.add_activity("A", "A").unwrap();
            g.add_activity("B", "B").unwrap();
            for id in ["A", "B"] {
                g.set_included(id, true).unwrap();
                g.set_pending(id, false).unwrap();
            }
            g.add_response("A", "B").unwrap();
            g.set_running(true);
            assert!(g.is_final_state());
            assert!(g.execute("A").unwrap());
            assert!(g.get_activity("B").unwrap().is_pending(g.threshold()));
            assert!(!g.is_final_state());
            assert!(g.execute("B").unwrap());
            assert!(!g.get_activity("A").unwrap().is_pending(g.threshold()));
            assert!(g.is_final_state());
        }
    }

    #[test]
    fn executing_requires_running() {
        let mut g = two_activity_graph();
        assert_eq!(g.execute("A"), Err(DcrGraphError::GraphNotRunning));
    }

    #[test]
    fn no_self_responses() {
        let mut g = two_activity_graph();
        assert_eq!(g.add_response("A", "A"), Ok(false));
        assert_eq!(g.add_response("A", "B"), Ok(true));
        assert_eq!(g.responses_count(), 1);
    }

    #[test]
    fn execution_semantics() {
        let mut g = two_activity_graph();
        g.add_include_exclude(true, "A", "B").unwrap();
        g.add_include_exclude(false, "A", "A").unwrap();
        g.add_response("A", "B").unwrap();
        g.set_running(true);

        assert_eq!(g.runnable_activities(), BTreeSet::from(["A"]));
        assert_eq!(g.execute("B"), Ok(false));
        assert!(g.is_final_state());

        assert_eq!(g.execute("A"), Ok(true));
        let t = g.threshold();
        let a = g.get_activity("A").unwrap();
        assert!(a.is_executed() && !a.is_included(t) && !a.is_pending(t));
        let b = g.get_activity("B").unwrap();
        assert!(b.is_included(t) && b.is_pending(t));
        assert!(!g.is_final_state());
        assert_eq!(g.runnable_activities(), BTreeSet::from(["B"]));

        assert_eq!(g.execute("B"), Ok(true));
        assert!(g.is_final_state());
    }

    #[test]
    fn conditions_block_until_source_executed_or_excluded() {
        let mut g = two_activity_graph();
        g.set_included("B", true).unwrap();
        g.add_condition("A", "B").unwrap();
        g.set_running(true);
        assert_eq!(g.runnable_activities(), BTreeSet::from(["A"]));
        g.execute("A").unwrap();
        assert_eq!(g.runnable_activities(), BTreeSet::from(["A", "B"]));

        let mut g = two_activity_graph();
        g.set_included("B", true).unwrap();
        g.set_included("A", false).unwrap();
        g.add_condition("A", "B").unwrap();
        assert_eq!(g.runnable_activities(), BTreeSet::from(["B"]));
    }

    #[test]
    fn relation_counts_follow_polarity() {
        let mut g = two_activity_graph();
        g.add_include_exclude(true, "A", "B").unwrap();
        g.add_include_exclude(false, "B", "A").unwrap();
        g.add_condition("A", "B").unwrap();
        g.add_condition("B", "A").unwrap();
        g.conditions_mut()
            .unwrap()
            .get_mut("B")
            .unwrap()
            .get_mut("A")
            .unwrap()
            .increment(true, Threshold::default());
        assert_eq!(g.includes_count(), 1);
        assert_eq!(g.excludes_count(), 1);
        assert_eq!(g.conditions_count(), 1);
        assert_eq!(g.responses_count(), 0);
        assert_eq!(g.relations_count(), 3);
        assert!(g.activity_has_relations("A"));
    }

    #[test]
    fn removing_an_activity_removes_its_relations() {
        let mut g = two_activity_graph();
        g.add_activity("C", "C").unwrap();
        g.add_include_exclude(true, "A", "B").unwrap();
        g.add_include_exclude(true, "B", "A").unwrap();
        g.add_response("A", "C").unwrap();
        g.add_condition("C", "A").unwrap();
        assert_eq!(g.remove_activity("A"), Ok(4));
        assert!(!g.contains_activity("A"));
        assert_eq!(g.relations_count(), 0);
        assert!(!g.activity_has_relations("B"));
        assert_eq!(
            g.remove_activity("A"),
            Err(DcrGraphError::UnknownActivity("A".to_string()))
        );
    }

    #[test]
    fn resolve_and_compare_states() {
        let mut g = two_activity_graph();
        g.title = Some("test".to_string());
        g.add_include_exclude(true, "A", "B").unwrap();
        g.add_response("A", "B").unwrap();
        let r = g.resolve();
        assert_eq!(r.activities.len(), 2);
        assert!(r.activities[0].included);
        assert_eq!(
            r.includes,
            vec![ResolvedRelation {
                source: "A".to_string(),
                target: "B".to_string()
            }]
        );
        assert_eq!(r.responses.len(), 1);
        assert!(r.excludes.is_empty());
        assert!(r.to_json().unwrap().contains("\"title\":\"test\""));

        let mut other = g.copy();
        assert!(g.are_in_equal_state(&other));
        other.set_running(true);
        other.execute("A").unwrap();
        assert!(!g.are_in_equal_state(&other));
    }
}
