//! Infrastructure - configuration and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Engine configuration (TOML loading, defaults, validation)
//! - `metrics` - Lock-free metrics collection

pub mod config;
pub mod metrics;

// Re-export commonly used types
pub use config::{Config, DispatchParams, ScoreWeights, ScoringParams};
pub use metrics::{Metrics, MetricsSummary};
