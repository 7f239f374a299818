//! Process Discovery
//!
//! Discover a DCR graph from an event log.

/// Contradiction-based mining of DCR graphs
pub mod contradiction_approach;
/// Mining, minimization and measurement in one pipeline
pub mod full;


#[doc(inline)]
pub use contradiction_approach::{ContradictionMiner, DcrMiningConfig};
#[doc(inline)]
pub use full::{discover_and_minimize, MiningDuration, MiningError, MiningResult};
