//! Process Models
pub mod dcr;
