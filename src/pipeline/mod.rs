//! Ingest pipeline: reading sources and the tick-driven detection loop.

pub mod ingest_loop;
pub mod source;

pub use ingest_loop::{IngestLoop, IngestStats};
pub use source::{ReadingSource, SimulatorSource};
