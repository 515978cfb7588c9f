//! cyclelab-report — export and persistence for cycle analyses.
//!
//! [`export`] renders cycle reports as CSV for spreadsheet tools;
//! [`store`] persists pair sets as JSON files and runs the conflict-aware
//! merge against them.

pub mod export;
pub mod store;
