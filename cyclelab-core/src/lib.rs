//! cyclelab-core — trade aggregation and cycle-pairing engine.
//!
//! The pipeline: raw CSV fills are decoded ([`ingest`]), their timestamps
//! normalized through the format registry ([`datetime`]), and folded into
//! per-order records ([`domain`]). Orders are grouped into round-trip
//! cycles either explicitly or automatically ([`pairing`]), projected into
//! distribution/summary views ([`analytics`]), and reconciled across saved
//! sets ([`merge`]). [`session::Session`] ties the working set together
//! for front ends.

pub mod analytics;
pub mod datetime;
pub mod domain;
pub mod ingest;
pub mod merge;
pub mod pairing;
pub mod session;
