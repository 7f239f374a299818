//! DCR graphs with learned relations
//!
//! A [`DcrGraph`] is the mutable, id-keyed model produced by mining.
//! A [`ByteDcrGraph`] is a compiled snapshot of it, used to simulate executions.
pub mod activity;
pub mod byte_dcr_graph;
pub mod confidence;
pub mod dcr_graph_struct;
pub mod relation;

#[doc(inline)]
pub use activity::Activity;
#[doc(inline)]
pub use byte_dcr_graph::{ActivityIndex, ByteDcrGraph};
#[doc(inline)]
pub use confidence::{Confidence, Threshold, ThresholdError};
#[doc(inline)]
pub use dcr_graph_struct::{DcrGraph, DcrGraphError, ResolvedDcrGraph};
#[doc(inline)]
pub use relation::{Relation, RelationCouple, RelationType};
