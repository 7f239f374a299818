//! Exhaustive simulation of compiled DCR graphs
//!
//! Both finders memoize visited states, so the work is bounded by the number of distinct
//! reachable states rather than the number of paths.
pub mod unique_state_finder;
pub mod unique_trace_finder;

#[doc(inline)]
pub use unique_state_finder::find_unique_states_with_runnable_count;
#[doc(inline)]
pub use unique_trace_finder::{find_language, TraceLanguage, UniqueTraceFinder};
