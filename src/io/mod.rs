//! IO modules - output towards external consumers
//!
//! - `egress` - per-tick session snapshots to file (JSONL format)

pub mod egress;

pub use egress::SnapshotEgress;
