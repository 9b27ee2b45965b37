//! Bounded activity log of session-significant events
//!
//! Entries are kept newest-first; once the capacity is reached the oldest
//! entry is dropped.

use crate::domain::types::GateId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Kinds of events recorded in the activity log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ActivityKind {
    SimulationStarted,
    SimulationStopped,
    DirectionChanged { heading: f64 },
    DispatchTriggered { gate: GateId, eta_secs: u32 },
    DispatchRedirected { from: GateId, to: GateId, eta_secs: u32 },
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::SimulationStarted => "simulation_started",
            ActivityKind::SimulationStopped => "simulation_stopped",
            ActivityKind::DirectionChanged { .. } => "direction_changed",
            ActivityKind::DispatchTriggered { .. } => "dispatch_triggered",
            ActivityKind::DispatchRedirected { .. } => "dispatch_redirected",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    /// Tick counter when the entry was recorded
    pub tick: u64,
    pub at: DateTime<Utc>,
    pub kind: ActivityKind,
    /// Human-readable line for display
    pub message: String,
}

/// Newest-first, capacity-bounded log
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, tick: u64, kind: ActivityKind, message: String) {
        self.entries.push_front(ActivityEntry { tick, at: Utc::now(), kind, message });
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ActivityEntry> {
        self.entries.front()
    }

    pub fn to_vec(&self) -> Vec<ActivityEntry> {
        self.entries.iter().cloned().collect()
    }
}
