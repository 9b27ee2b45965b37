//! gate-predict - headless gate intent prediction runner
//!
//! Runs a simulation session either as fast as possible for a fixed number of
//! ticks (batch mode) or paced by the configured tick interval until ctrl-c
//! (real-time mode). Dispatch decisions are logged; per-tick snapshots go to
//! the configured egress file.
//!
//! Module structure:
//! - `domain/` - Geometry and entity types (Pedestrian, Gate, Beacon, log)
//! - `services/` - Scoring, movement, dispatch, session and ticker
//! - `io/` - Snapshot egress
//! - `infra/` - Config and metrics

use clap::Parser;
use gate_predict::infra::{Config, Metrics};
use gate_predict::io::SnapshotEgress;
use gate_predict::services::movement::random_offset;
use gate_predict::services::{run_ticker, ticker, Session};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Gate intent prediction - simulated pedestrian, live dispatch decisions
#[derive(Parser, Debug)]
#[command(name = "gate-predict", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Stop after this many ticks (0 = run until ctrl-c)
    #[arg(short, long, default_value_t = 0)]
    ticks: u64,

    /// Apply a random direction change every N ticks (0 = never)
    #[arg(long, default_value_t = 0)]
    perturb_every: u64,

    /// Seed for direction changes (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Pace ticks with the configured interval instead of running flat out
    #[arg(long)]
    realtime: bool,
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Direction change cadence shared by both run modes
fn maybe_perturb(session: &mut Session, tick: u64, every: u64, rng: &mut StdRng) {
    if every > 0 && tick % every == 0 {
        let offset = random_offset(rng, session.config().perturb_max_degrees());
        session.perturb_direction(offset);
    }
}

fn run_batch(
    config: Config,
    args: &Args,
    metrics: Arc<Metrics>,
    egress: Option<SnapshotEgress>,
) -> anyhow::Result<()> {
    let mut rng = make_rng(args.seed);
    let mut session = Session::with_metrics(config, metrics.clone());
    session.start();

    for _ in 0..args.ticks {
        let Some(outcome) = session.tick() else { break };
        maybe_perturb(&mut session, outcome.tick, args.perturb_every, &mut rng);
        if let Some(ref egress) = egress {
            egress.write_snapshot(&session.snapshot());
        }
    }

    session.stop();
    log_final_state(&session);
    metrics.report().log();
    Ok(())
}

async fn run_realtime(
    config: Config,
    args: &Args,
    metrics: Arc<Metrics>,
    egress: Option<SnapshotEgress>,
) -> anyhow::Result<()> {
    let tick_interval = Duration::from_millis(config.tick_interval_ms());
    let metrics_interval = config.metrics_interval_secs();
    let session = ticker::shared(Session::with_metrics(config, metrics.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let mut metrics_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval.max(1)));
        loop {
            tokio::select! {
                _ = interval.tick() => metrics_clone.report().log(),
                _ = metrics_shutdown.changed() => break,
            }
        }
    });

    // Handle shutdown on Ctrl+C
    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = ctrl_c_tx.send(true);
    });

    let mut rng = make_rng(args.seed);
    let max_ticks = args.ticks;
    let perturb_every = args.perturb_every;

    session.lock().start();
    run_ticker(session.clone(), tick_interval, shutdown_rx, move |session, outcome| {
        maybe_perturb(session, outcome.tick, perturb_every, &mut rng);
        if let Some(ref egress) = egress {
            egress.write_snapshot(&session.snapshot());
        }
        if max_ticks > 0 && outcome.tick >= max_ticks {
            let _ = shutdown_tx.send(true);
        }
    })
    .await;

    let mut session = session.lock();
    session.stop();
    log_final_state(&session);
    metrics.report().log();
    Ok(())
}

fn log_final_state(session: &Session) {
    let ped = session.pedestrian();
    info!(
        ticks = %session.tick_count(),
        position = %ped.position,
        heading = %format!("{:.1}", ped.heading),
        approach_zone = ?ped.approach_zone,
        "final_state"
    );
    for reading in session.gate_readings() {
        info!(gate = %reading.id, confidence = %reading.confidence, "final_gate_confidence");
    }
    for entry in session.log().iter() {
        info!(tick = %entry.tick, event = %entry.kind.as_str(), message = %entry.message, "activity");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("gate-predict starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        venue = %format!("{}x{}", config.venue_width(), config.venue_height()),
        gates = %config.gates().len(),
        beacons = %config.beacons().len(),
        trigger_threshold = %config.dispatch().trigger_threshold,
        sustain_ticks = %config.dispatch().sustain_ticks,
        redirect_enabled = %config.dispatch().redirect_enabled,
        tick_interval_ms = %config.tick_interval_ms(),
        egress_file = %config.egress_file(),
        "config_loaded"
    );

    let metrics = Arc::new(Metrics::new());
    let egress = SnapshotEgress::from_config_path(config.egress_file());

    // Without a tick cap there is nothing to batch; run paced until ctrl-c
    if args.realtime || args.ticks == 0 {
        run_realtime(config, &args, metrics, egress).await?;
    } else {
        run_batch(config, &args, metrics, egress)?;
    }

    info!("gate-predict shutdown complete");
    Ok(())
}
