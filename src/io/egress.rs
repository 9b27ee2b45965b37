//! Snapshot egress - writes per-tick session snapshots to file
//!
//! Snapshots are written in JSONL format (one JSON object per line) to the
//! file specified in config. Every line carries the run id so several runs
//! can share one file.

use crate::services::session::SessionSnapshot;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};
use uuid::Uuid;

#[inline]
fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[derive(Serialize)]
struct SnapshotRecord<'a> {
    run_id: &'a Uuid,
    ts: u64,
    #[serde(flatten)]
    snapshot: &'a SessionSnapshot,
}

/// Egress writer for session snapshots
pub struct SnapshotEgress {
    file_path: String,
    run_id: Uuid,
}

impl SnapshotEgress {
    pub fn new(file_path: &str) -> Self {
        let run_id = Uuid::now_v7();
        info!(file_path = %file_path, run_id = %run_id, "egress_initialized");
        Self { file_path: file_path.to_string(), run_id }
    }

    /// Egress configured from `path`, or None when the path is empty
    pub fn from_config_path(path: &str) -> Option<Self> {
        if path.is_empty() {
            None
        } else {
            Some(Self::new(path))
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Write a snapshot to the egress file
    /// Returns true if successful, false otherwise
    pub fn write_snapshot(&self, snapshot: &SessionSnapshot) -> bool {
        let record = SnapshotRecord { run_id: &self.run_id, ts: epoch_ms(), snapshot };
        let result = serde_json::to_string(&record)
            .map_err(std::io::Error::from)
            .and_then(|json| self.append_line(&json));

        match result {
            Ok(()) => true,
            Err(e) => {
                error!(
                    tick = %snapshot.tick,
                    error = %e,
                    "snapshot_egress_failed"
                );
                false
            }
        }
    }

    /// Append a line to the egress file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "egress_written");

        Ok(())
    }
}
