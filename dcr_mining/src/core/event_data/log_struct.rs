use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

///
/// Errors when manipulating a [`Log`]
///
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// No trace with this id exists in the log
    #[error("No such trace: {0}")]
    NoSuchTrace(String),
}

///
/// A single execution of an activity
///
/// Two events are equal if they refer to the same activity, regardless of time or actor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LogEvent {
    /// Id of the executed activity
    pub activity_id: String,
    /// Name of the executed activity
    pub name: String,
    /// Time of execution
    pub time_of_execution: Option<DateTime<FixedOffset>>,
    /// Who executed the activity
    pub actor_name: Option<String>,
    /// Role of the executor
    pub role_name: Option<String>,
}

impl LogEvent {
    /// Create a new event for the given activity
    pub fn new(activity_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            name: name.into(),
            time_of_execution: None,
            actor_name: None,
            role_name: None,
        }
    }
}

impl PartialEq for LogEvent {
    fn eq(&self, other: &Self) -> bool {
        self.activity_id == other.activity_id
    }
}

impl Eq for LogEvent {}

impl Hash for LogEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.activity_id.hash(state);
    }
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.activity_id)
    }
}

///
/// A trace: the ordered events of one process instance
///
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LogTrace {
    /// Trace id (a fresh UUID is assigned by [`Log::add_trace`] if empty)
    #[serde(default)]
    pub id: String,
    /// Events in execution order
    pub events: Vec<LogEvent>,
    /// Whether the process instance has ended
    #[serde(default)]
    pub is_finished: bool,
}

impl LogTrace {
    /// Create a new trace without events
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Create a trace with one event per given activity id (named like the id)
    pub fn from_activity_ids<S: AsRef<str>>(
        id: impl Into<String>,
        activity_ids: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut trace = Self::new(id);
        trace.events = activity_ids
            .into_iter()
            .map(|a| LogEvent::new(a.as_ref(), a.as_ref()))
            .collect();
        trace
    }

    /// Append an event
    pub fn add(&mut self, event: LogEvent) {
        self.events.push(event);
    }
}

impl std::fmt::Display for LogTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.events.iter().map(|e| e.activity_id.as_str()).collect();
        write!(f, "{}", ids.join("; "))
    }
}

///
/// Event log consisting of a list of [`LogTrace`]s
///
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Log {
    /// Optional log id
    pub id: Option<String>,
    /// Traces contained in the log
    pub traces: Vec<LogTrace>,
}

impl Log {
    /// Create a new, empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize a log from a JSON string
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// All distinct activities of the log as `(activity id, name)` pairs, sorted by id
    ///
    /// For an id occurring with different names, the first name encountered is used.
    pub fn alphabet(&self) -> Vec<(String, String)> {
        let mut alphabet: BTreeMap<&str, &str> = BTreeMap::new();
        for e in self.traces.iter().flat_map(|t| t.events.iter()) {
            alphabet
                .entry(e.activity_id.as_str())
                .or_insert(e.name.as_str());
        }
        alphabet
            .into_iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect()
    }

    /// Add a trace, assigning a fresh UUID if it has no id yet
    pub fn add_trace(&mut self, mut trace: LogTrace) {
        if trace.id.is_empty() {
            trace.id = Uuid::new_v4().to_string();
        }
        self.traces.push(trace);
    }

    /// Append an event to the (first) trace with the given id
    pub fn add_event_to_trace(&mut self, trace_id: &str, event: LogEvent) -> Result<(), LogError> {
        let trace = self
            .traces
            .iter_mut()
            .find(|t| t.id == trace_id)
            .ok_or_else(|| LogError::NoSuchTrace(trace_id.to_string()))?;
        trace.add(event);
        Ok(())
    }

    /// New log with all traces that contain an event executed by `actor_name`
    pub fn filter_by_actor(&self, actor_name: &str) -> Log {
        self.filtered(|t| {
            t.events
                .iter()
                .any(|e| e.actor_name.as_deref() == Some(actor_name))
        })
    }

    /// New log with all traces that have at most `max_activities` distinct activities
    pub fn filter_by_no_of_activities(&self, max_activities: usize) -> Log {
        self.filtered(|t| t.events.iter().collect::<HashSet<_>>().len() <= max_activities)
    }

    fn filtered(&self, keep: impl Fn(&LogTrace) -> bool) -> Log {
        Log {
            id: self.id.clone(),
            traces: self.traces.iter().filter(|t| keep(t)).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::test_utils::get_test_data_path;

    use super::*;

    #[test]
    fn alphabet_is_sorted_and_distinct() {
        let mut log = Log::new();
        log.add_trace(LogTrace::from_activity_ids("1", ["B", "A", "B"]));
        log.add_trace(LogTrace::from_activity_ids("2", ["C"]));
        assert_eq!(
            log.alphabet(),
            vec![
                ("A".to_string(), "A".to_string()),
                ("B".to_string(), "B".to_string()),
                ("C".to_string(), "C".to_string())
            ]
        );
    }

    #[test]
    fn traces_get_ids() {
        let mut log = Log::new();
        log.add_trace(LogTrace::default());
        assert!(Uuid::parse_str(&log.traces[0].id).is_ok());

        let id = log.traces[0].id.clone();
        log.add_event_to_trace(&id, LogEvent::new("A", "A")).unwrap();
        assert_eq!(log.traces[0].events.len(), 1);
        assert_eq!(
            log.add_event_to_trace("missing", LogEvent::new("A", "A")),
            Err(LogError::NoSuchTrace("missing".to_string()))
        );
    }

    #[test]
    fn filters() {
        let mut log = Log::new();
        let mut with_actor = LogTrace::from_activity_ids("1", ["A", "B", "A"]);
        with_actor.events[1].actor_name = Some("alice".to_string());
        log.add_trace(with_actor);
        log.add_trace(LogTrace::from_activity_ids("2", ["A", "B", "C"]));

        let by_actor = log.filter_by_actor("alice");
        assert_eq!(by_actor.traces.len(), 1);
        assert_eq!(by_actor.traces[0].id, "1");

        let small = log.filter_by_no_of_activities(2);
        assert_eq!(small.traces.len(), 1);
        assert_eq!(small.traces[0].to_string(), "A; B; A");
        assert_eq!(log.filter_by_no_of_activities(3).traces.len(), 2);
    }

    #[test]
    fn events_are_equal_by_activity() {
        let mut a = LogEvent::new("A", "first");
        a.role_name = Some("clerk".to_string());
        assert_eq!(a, LogEvent::new("A", "second"));
        assert_ne!(a, LogEvent::new("B", "first"));
    }

    #[test]
    fn read_json_log() {
        let path = get_test_data_path().join("ab_log.json");
        let log = Log::from_json(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(log.traces.len(), 2);
        assert_eq!(log.alphabet().len(), 2);
        assert!(log.traces[0].events[0].time_of_execution.is_some());
    }
}
