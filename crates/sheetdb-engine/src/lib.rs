//! Query execution pipeline for sheetdb
//!
//! Pure, synchronous transformation of an already-materialized record
//! sequence: filter -> project -> order -> limit, in that fixed order.
//! All I/O belongs to the transport collaborator; the engine never blocks.

pub mod coerce;
pub mod engine;

pub use engine::QueryEngine;
