use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::byte_dcr_graph::{EXECUTED, INCLUDED, PENDING, RUNNABLE};
use super::confidence::{Confidence, Threshold};

///
/// Activity (event) of a [`DcrGraph`](super::dcr_graph_struct::DcrGraph)
///
/// Identity (equality, hashing and ordering) is given by the `id` alone.
///
/// `included` and `pending` are learned: both are backed by a [`Confidence`] and resolved
/// against a [`Threshold`] whenever they are read.
/// An activity is included iff its ratio is _above_ the threshold, while it is pending iff its
/// ratio is _not above_ the threshold.
/// Setting a flag explicitly (e.g., while executing) pins it regardless of the threshold, until
/// the corresponding confidence learns again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    id: String,
    /// Display name
    pub name: String,
    /// Roles allowed to execute this activity
    pub roles: Option<String>,
    executed: bool,
    included: Confidence,
    pending: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    included_flag: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_flag: Option<bool>,
}

impl Activity {
    /// Create a new activity
    ///
    /// The `id` is sanitized (see [`Activity::sanitize_id`]).
    /// A new activity is not executed, excluded and pending.
    pub fn new(id: impl AsRef<str>, name: impl Into<String>) -> Self {
        Self {
            id: Self::sanitize_id(id),
            name: name.into(),
            roles: None,
            executed: false,
            included: Confidence::default(),
            pending: Confidence::default(),
            included_flag: None,
            pending_flag: None,
        }
    }

    /// Create an activity whose id and name are both the sanitized input
    pub fn from_name(name_and_id: impl AsRef<str>) -> Self {
        let id = Self::sanitize_id(name_and_id);
        Self::new(&id, id.clone())
    }

    /// Remove every character that is not an ASCII word character, ASCII whitespace, `-` or `+`
    ///
    /// Callers have to make sure that ids stay unique after sanitizing.
    pub fn sanitize_id(id: impl AsRef<str>) -> String {
        id.as_ref()
            .chars()
            .filter(|c| {
                c.is_ascii_alphanumeric()
                    || c.is_ascii_whitespace()
                    || matches!(c, '\x0B' | '_' | '-' | '+')
            })
            .collect()
    }

    /// Stable identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this activity was executed
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub(crate) fn set_executed(&mut self, executed: bool) {
        self.executed = executed;
    }

    /// Confidence backing the included state
    pub fn included_confidence(&self) -> &Confidence {
        &self.included
    }

    /// Whether this activity is included under `threshold`
    pub fn is_included(&self, threshold: Threshold) -> bool {
        self.included_flag
            .unwrap_or_else(|| self.included.is_above_threshold(threshold))
    }

    /// Overwrite the included state with a confidence that resolves to `included`
    pub(crate) fn set_included(&mut self, included: bool) {
        self.included = if included {
            Confidence::new(1, 1)
        } else {
            Confidence::default()
        };
        self.included_flag = Some(included);
    }

    /// Record that the activity was tested for being excluded in the initial state
    pub fn increment_excluded_invocation(&mut self, threshold: Threshold) -> bool {
        self.included_flag = None;
        self.included.incr_invocations(threshold)
    }

    /// Record that the activity contradicted being excluded in the initial state
    pub fn increment_excluded_violation(&mut self, threshold: Threshold) -> bool {
        self.included_flag = None;
        self.included.incr_violations(threshold)
    }

    /// Confidence backing the pending state
    pub fn pending_confidence(&self) -> &Confidence {
        &self.pending
    }

    /// Whether this activity is pending under `threshold`
    pub fn is_pending(&self, threshold: Threshold) -> bool {
        self.pending_flag
            .unwrap_or_else(|| !self.pending.is_above_threshold(threshold))
    }

    /// Overwrite the pending state with a confidence that resolves to `pending`
    pub(crate) fn set_pending(&mut self, pending: bool) {
        self.pending = if pending {
            Confidence::default()
        } else {
            Confidence::new(1, 1)
        };
        self.pending_flag = Some(pending);
    }

    /// Record that the activity was tested for being pending in the initial state
    pub fn increment_pending_invocation(&mut self, threshold: Threshold) -> bool {
        self.pending_flag = None;
        self.pending.incr_invocations(threshold)
    }

    /// Record that the activity contradicted being pending in the initial state
    pub fn increment_pending_violation(&mut self, threshold: Threshold) -> bool {
        self.pending_flag = None;
        self.pending.incr_violations(threshold)
    }

    /// Pack the runtime flags into the state byte used by
    /// [`ByteDcrGraph`](super::byte_dcr_graph::ByteDcrGraph)
    pub fn state_byte(&self, threshold: Threshold, runnable: bool) -> u8 {
        let mut b = 0;
        if runnable {
            b |= RUNNABLE;
        }
        if self.executed {
            b |= EXECUTED;
        }
        if self.is_included(threshold) {
            b |= INCLUDED;
        }
        if self.is_pending(threshold) {
            b |= PENDING;
        }
        b
    }

    /// Same id and name and same resolved runtime flags
    pub fn is_same_name_id_and_state(&self, other: &Activity, threshold: Threshold) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.executed == other.executed
            && self.is_included(threshold) == other.is_included(threshold)
            && self.is_pending(threshold) == other.is_pending(threshold)
    }
}

impl PartialEq for Activity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Activity {}

impl Hash for Activity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Activity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Activity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : {}", self.id, self.name)
    }
}
