//! Services - prediction pipeline and session state
//!
//! This module contains the core engine, leaf-first:
//! - `proximity` - Beacon signal strength from pedestrian position
//! - `scorer` - Per-gate confidence and approach-zone lookup
//! - `movement` - Pedestrian stepping, wall reflection and dwell tracking
//! - `dispatch` - Dispatch trigger / redirect state machine
//! - `session` - Owner of all state, exposes start/stop/reset/perturb/tick
//! - `ticker` - Real-time tokio driver for a shared session

pub mod dispatch;
pub mod movement;
pub mod proximity;
pub mod scorer;
pub mod session;
pub mod ticker;

// Re-export commonly used types
pub use dispatch::{DispatchController, DispatchTransition};
pub use session::{Session, SessionSnapshot, TickOutcome};
pub use ticker::{run_ticker, SharedSession};
