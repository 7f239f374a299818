//! Conformance checking
//!
//! Measures how well a DCR graph describes an event log.

/// Fitness, precision and simplicity of DCR graphs
pub mod quality_dimensions;

#[doc(inline)]
pub use quality_dimensions::QualityDimensions;
