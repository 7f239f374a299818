#![warn(
    clippy::doc_markdown,
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs
)]

#![doc = include_str!("../README.md")]

///
/// Event data and process models
///
pub mod core;

///
/// Discovery of DCR graphs from event logs
///
pub mod discovery;

///
/// Exhaustive exploration of the behavior of compiled DCR graphs
///
pub mod traversal;

///
/// Removal of relations and activities that do not change the behavior of a DCR graph
///
pub mod redundancy_removal;

///
/// Quality measures of DCR graphs
///
pub mod conformance;

#[cfg(test)]
mod utils;

#[doc(inline)]
pub use crate::core::event_data::{Log, LogEvent, LogTrace};

#[doc(inline)]
pub use crate::core::process_models::dcr::{
    Activity, ByteDcrGraph, Confidence, DcrGraph, DcrGraphError, Relation, RelationType,
    Threshold,
};

#[doc(inline)]
pub use crate::discovery::{discover_and_minimize, ContradictionMiner, DcrMiningConfig};

#[doc(inline)]
pub use crate::conformance::QualityDimensions;

#[doc(inline)]
pub use crate::redundancy_removal::{remove_redundancy, RedundancyReport};
