use serde::{Deserialize, Serialize};

/// Kind of a DCR relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationType {
    /// Source must have been executed (or be excluded) before target can run
    Condition,
    /// Executing source makes target pending
    Response,
    /// Executing source includes target
    Inclusion,
    /// Executing source excludes target
    Exclusion,
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RelationType::Condition => "Condition",
            RelationType::Response => "Response",
            RelationType::Inclusion => "Inclusion",
            RelationType::Exclusion => "Exclusion",
        };
        write!(f, "{name}")
    }
}

///
/// Directed relation between two activity ids
///
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relation {
    /// Kind of relation
    pub relation_type: RelationType,
    /// Source activity id
    pub source: String,
    /// Target activity id
    pub target: String,
}

impl Relation {
    /// Create a new [`Relation`]
    pub fn new(
        relation_type: RelationType,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            relation_type,
            source: source.into(),
            target: target.into(),
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} from {} to {}",
            self.relation_type, self.source, self.target
        )
    }
}

///
/// Unordered pair of activity ids
///
/// `RelationCouple::new("a", "b") == RelationCouple::new("b", "a")`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationCouple {
    first: String,
    second: String,
}

impl RelationCouple {
    /// Create a new [`RelationCouple`]
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    /// Smaller id of the pair
    pub fn first(&self) -> &str {
        &self.first
    }

    /// Larger id of the pair
    pub fn second(&self) -> &str {
        &self.second
    }

    /// Whether `id` is part of this pair
    pub fn contains(&self, id: &str) -> bool {
        self.first == id || self.second == id
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn relation_display() {
        let r = Relation::new(RelationType::Condition, "A", "B");
        assert_eq!(r.to_string(), "Condition from A to B");
    }

    #[test]
    fn couple_is_unordered() {
        let ab = RelationCouple::new("A", "B");
        let ba = RelationCouple::new("B", "A");
        assert_eq!(ab, ba);
        let set: HashSet<_> = [ab, ba].into_iter().collect();
        assert_eq!(set.len(), 1);
        let c = RelationCouple::new("Z", "C");
        assert_eq!(c.first(), "C");
        assert!(c.contains("Z"));
        assert!(!c.contains("A"));
    }
}
