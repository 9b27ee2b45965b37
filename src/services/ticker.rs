//! Real-time tick driver
//!
//! Drives `Session::tick()` from a tokio interval until the shutdown signal
//! fires. The session lock is held only for the synchronous tick and the
//! observer callback, so commands from other tasks (start, stop, perturb)
//! interleave between ticks and never overlap one.

use crate::services::session::{Session, TickOutcome};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Session shared between the ticker and command sources
pub type SharedSession = Arc<Mutex<Session>>;

pub fn shared(session: Session) -> SharedSession {
    Arc::new(Mutex::new(session))
}

/// Tick `session` every `tick_interval` until `shutdown` becomes true
///
/// `on_tick` runs under the lock right after each executed tick and may
/// issue further commands. Ticks that fire while the session is stopped are
/// skipped.
pub async fn run_ticker<F>(
    session: SharedSession,
    tick_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut on_tick: F,
) where
    F: FnMut(&mut Session, &TickOutcome),
{
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_ms = %tick_interval.as_millis(), "ticker_started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut guard = session.lock();
                if let Some(outcome) = guard.tick() {
                    on_tick(&mut *guard, &outcome);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                debug!("ticker_shutdown_signal_ignored");
            }
        }
    }

    info!("ticker_stopped");
}
