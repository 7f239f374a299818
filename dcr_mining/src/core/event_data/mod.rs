//! Event Data
//!
//! Logs of traces consumed by discovery and conformance checking
#[doc(hidden)]
pub(crate) mod log_struct;

#[doc(inline)]
pub use log_struct::*;
