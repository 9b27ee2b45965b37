//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Every value has a default, so a partial file only overrides what it names.
//! The resulting `Config` is validated before use; an invalid configuration
//! never reaches the scoring code.

use crate::domain::geometry::Point;
use crate::domain::types::{Beacon, BeaconId, Gate, GateId, Pedestrian};
use anyhow::{ensure, Context};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct VenueSection {
    #[serde(default = "default_venue_width")]
    pub width: f64,
    #[serde(default = "default_venue_height")]
    pub height: f64,
}

impl Default for VenueSection {
    fn default() -> Self {
        Self { width: default_venue_width(), height: default_venue_height() }
    }
}

fn default_venue_width() -> f64 {
    800.0
}

fn default_venue_height() -> f64 {
    600.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct PedestrianSection {
    #[serde(default = "default_start_x")]
    pub start_x: f64,
    #[serde(default = "default_start_y")]
    pub start_y: f64,
    /// Initial heading in degrees
    #[serde(default)]
    pub heading: f64,
    /// Venue units per tick
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl Default for PedestrianSection {
    fn default() -> Self {
        Self {
            start_x: default_start_x(),
            start_y: default_start_y(),
            heading: 0.0,
            speed: default_speed(),
        }
    }
}

fn default_start_x() -> f64 {
    400.0
}

fn default_start_y() -> f64 {
    300.0
}

fn default_speed() -> f64 {
    1.2
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSection {
    #[serde(default = "default_approach_radius")]
    pub approach_radius: f64,
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    #[serde(default = "default_beacon_max_range")]
    pub beacon_max_range: f64,
    #[serde(default = "default_weight_proximity")]
    pub weight_proximity: f64,
    #[serde(default = "default_weight_vector")]
    pub weight_vector: f64,
    #[serde(default = "default_weight_dwell")]
    pub weight_dwell: f64,
    /// Dwell score gained per second inside a gate's approach zone
    #[serde(default = "default_dwell_points_per_sec")]
    pub dwell_points_per_sec: f64,
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self {
            approach_radius: default_approach_radius(),
            max_distance: default_max_distance(),
            beacon_max_range: default_beacon_max_range(),
            weight_proximity: default_weight_proximity(),
            weight_vector: default_weight_vector(),
            weight_dwell: default_weight_dwell(),
            dwell_points_per_sec: default_dwell_points_per_sec(),
        }
    }
}

fn default_approach_radius() -> f64 {
    80.0
}

fn default_max_distance() -> f64 {
    300.0
}

fn default_beacon_max_range() -> f64 {
    80.0
}

fn default_weight_proximity() -> f64 {
    0.4
}

fn default_weight_vector() -> f64 {
    0.4
}

fn default_weight_dwell() -> f64 {
    0.2
}

fn default_dwell_points_per_sec() -> f64 {
    2.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSection {
    /// Confidence that must be strictly exceeded to dispatch
    #[serde(default = "default_trigger_threshold")]
    pub trigger_threshold: u8,
    /// Consecutive ticks the same gate must hold the breach
    #[serde(default = "default_sustain_ticks")]
    pub sustain_ticks: u32,
    /// Converts distance/speed (ticks) into whole seconds
    #[serde(default = "default_eta_divisor")]
    pub eta_divisor: f64,
    /// Allow an active dispatch to be retargeted to another gate
    #[serde(default)]
    pub redirect_enabled: bool,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            trigger_threshold: default_trigger_threshold(),
            sustain_ticks: default_sustain_ticks(),
            eta_divisor: default_eta_divisor(),
            redirect_enabled: false,
        }
    }
}

fn default_trigger_threshold() -> u8 {
    90
}

fn default_sustain_ticks() -> u32 {
    1
}

fn default_eta_divisor() -> f64 {
    5.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSection {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Largest heading change a single direction perturbation may apply
    #[serde(default = "default_perturb_max_degrees")]
    pub perturb_max_degrees: f64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            log_capacity: default_log_capacity(),
            perturb_max_degrees: default_perturb_max_degrees(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    200
}

fn default_log_capacity() -> usize {
    10
}

fn default_perturb_max_degrees() -> f64 {
    45.0
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EgressSection {
    /// JSONL snapshot file; empty disables egress
    #[serde(default)]
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSection {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval_secs() }
    }
}

fn default_metrics_interval_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_gate_color")]
    pub color: String,
}

fn default_gate_color() -> String {
    "#9E9E9E".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BeaconEntry {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub venue: VenueSection,
    #[serde(default)]
    pub pedestrian: PedestrianSection,
    #[serde(default)]
    pub scoring: ScoringSection,
    #[serde(default)]
    pub dispatch: DispatchSection,
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub egress: EgressSection,
    #[serde(default)]
    pub metrics: MetricsSection,
    /// Replaces the default gate layout when non-empty
    #[serde(default)]
    pub gates: Vec<GateEntry>,
    /// Replaces the default beacon layout when non-empty
    #[serde(default)]
    pub beacons: Vec<BeaconEntry>,
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn finite_point(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Weights of the three confidence components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub proximity: f64,
    pub vector: f64,
    pub dwell: f64,
}

/// Parameters consumed by the scorers and the approach-zone lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringParams {
    pub approach_radius: f64,
    pub max_distance: f64,
    pub beacon_max_range: f64,
    pub weights: ScoreWeights,
    pub dwell_points_per_sec: f64,
}

/// Parameters consumed by the dispatch controller
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchParams {
    pub trigger_threshold: u8,
    pub sustain_ticks: u32,
    pub eta_divisor: f64,
    pub redirect_enabled: bool,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    venue_width: f64,
    venue_height: f64,
    start_position: Point,
    start_heading: f64,
    start_speed: f64,
    scoring: ScoringParams,
    dispatch: DispatchParams,
    tick_interval_ms: u64,
    log_capacity: usize,
    perturb_max_degrees: f64,
    gates: Vec<Gate>,
    beacons: Vec<Beacon>,
    egress_file: String,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn default_gates() -> Vec<Gate> {
        let gate = |id: &str, name: &str, x: f64, y: f64, color: &str| Gate {
            id: GateId::new(id),
            name: name.to_string(),
            position: Point::new(x, y),
            color: color.to_string(),
        };
        vec![
            gate("north", "North Gate", 400.0, 40.0, "#4CAF50"),
            gate("east", "East Gate", 760.0, 300.0, "#2196F3"),
            gate("south", "South Gate", 400.0, 560.0, "#FF9800"),
            gate("west", "West Gate", 40.0, 300.0, "#9C27B0"),
        ]
    }

    fn default_beacons() -> Vec<Beacon> {
        [
            ("b1", 150.0, 120.0),
            ("b2", 400.0, 120.0),
            ("b3", 650.0, 120.0),
            ("b4", 150.0, 480.0),
            ("b5", 400.0, 480.0),
            ("b6", 650.0, 480.0),
        ]
        .into_iter()
        .map(|(id, x, y)| Beacon { id: BeaconId(id.to_string()), position: Point::new(x, y) })
        .collect()
    }

    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        let gates = if toml_config.gates.is_empty() {
            Self::default_gates()
        } else {
            toml_config
                .gates
                .into_iter()
                .map(|g| Gate {
                    name: g.name.unwrap_or_else(|| g.id.clone()),
                    id: GateId(g.id),
                    position: Point::new(g.x, g.y),
                    color: g.color,
                })
                .collect()
        };

        let beacons = if toml_config.beacons.is_empty() {
            Self::default_beacons()
        } else {
            toml_config
                .beacons
                .into_iter()
                .map(|b| Beacon { id: BeaconId(b.id), position: Point::new(b.x, b.y) })
                .collect()
        };

        let scoring = toml_config.scoring;
        let dispatch = toml_config.dispatch;

        Self {
            venue_width: toml_config.venue.width,
            venue_height: toml_config.venue.height,
            start_position: Point::new(toml_config.pedestrian.start_x, toml_config.pedestrian.start_y),
            start_heading: toml_config.pedestrian.heading,
            start_speed: toml_config.pedestrian.speed,
            scoring: ScoringParams {
                approach_radius: scoring.approach_radius,
                max_distance: scoring.max_distance,
                beacon_max_range: scoring.beacon_max_range,
                weights: ScoreWeights {
                    proximity: scoring.weight_proximity,
                    vector: scoring.weight_vector,
                    dwell: scoring.weight_dwell,
                },
                dwell_points_per_sec: scoring.dwell_points_per_sec,
            },
            dispatch: DispatchParams {
                trigger_threshold: dispatch.trigger_threshold,
                sustain_ticks: dispatch.sustain_ticks,
                eta_divisor: dispatch.eta_divisor,
                redirect_enabled: dispatch.redirect_enabled,
            },
            tick_interval_ms: toml_config.simulation.tick_interval_ms,
            log_capacity: toml_config.simulation.log_capacity,
            perturb_max_degrees: toml_config.simulation.perturb_max_degrees,
            gates,
            beacons,
            egress_file: toml_config.egress.file,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file,
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str, source: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)
            .with_context(|| format!("Failed to parse config {}", source))?;
        let config = Self::from_toml(toml_config, source.to_string());
        config.validate().with_context(|| format!("Invalid config {}", source))?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    /// Load configuration using the resolution order described above
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(&Self::resolve_config_path(args))
    }

    /// Reject configurations that would produce NaN or out-of-range scores
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            positive(self.venue_width) && positive(self.venue_height),
            "venue size must be positive and finite (got {}x{})",
            self.venue_width,
            self.venue_height
        );
        ensure!(
            (0.0..=self.venue_width).contains(&self.start_position.x)
                && (0.0..=self.venue_height).contains(&self.start_position.y),
            "pedestrian start {} lies outside the venue",
            self.start_position
        );
        ensure!(self.start_heading.is_finite(), "pedestrian heading must be finite");
        ensure!(
            positive(self.start_speed),
            "pedestrian speed must be positive and finite (got {})",
            self.start_speed
        );

        let s = &self.scoring;
        ensure!(positive(s.approach_radius), "approach_radius must be positive and finite");
        ensure!(positive(s.max_distance), "max_distance must be positive and finite");
        ensure!(positive(s.beacon_max_range), "beacon_max_range must be positive and finite");
        ensure!(
            non_negative(s.dwell_points_per_sec),
            "dwell_points_per_sec must be finite and not negative"
        );
        let w = s.weights;
        ensure!(
            non_negative(w.proximity) && non_negative(w.vector) && non_negative(w.dwell),
            "score weights must be finite and not negative"
        );
        let weight_sum = w.proximity + w.vector + w.dwell;
        ensure!(
            (weight_sum - 1.0).abs() < 1e-6,
            "score weights must sum to 1.0 (got {})",
            weight_sum
        );

        let d = &self.dispatch;
        ensure!(d.trigger_threshold <= 100, "trigger_threshold must be within 0-100");
        ensure!(d.sustain_ticks > 0, "sustain_ticks must be at least 1");
        ensure!(positive(d.eta_divisor), "eta_divisor must be positive and finite");

        ensure!(self.tick_interval_ms > 0, "tick_interval_ms must be positive");
        ensure!(self.log_capacity > 0, "log_capacity must be at least 1");
        ensure!(
            (0.0..=180.0).contains(&self.perturb_max_degrees),
            "perturb_max_degrees must be within 0-180"
        );

        ensure!(!self.gates.is_empty(), "at least one gate is required");
        let mut seen = HashSet::new();
        for gate in &self.gates {
            ensure!(seen.insert(&gate.id), "duplicate gate id {}", gate.id);
            ensure!(finite_point(gate.position), "gate {} position must be finite", gate.id);
        }
        let mut seen = HashSet::new();
        for beacon in &self.beacons {
            ensure!(seen.insert(&beacon.id), "duplicate beacon id {}", beacon.id);
            ensure!(finite_point(beacon.position), "beacon {} position must be finite", beacon.id);
        }
        Ok(())
    }

    /// Pedestrian state at the start of a run
    pub fn initial_pedestrian(&self) -> Pedestrian {
        Pedestrian::new(
            self.start_position,
            crate::domain::geometry::normalize_degrees(self.start_heading),
            self.start_speed,
        )
    }

    /// Look up a gate definition by id
    pub fn gate(&self, id: &GateId) -> Option<&Gate> {
        self.gates.iter().find(|g| &g.id == id)
    }

    // Getters for all config fields
    pub fn venue_width(&self) -> f64 {
        self.venue_width
    }

    pub fn venue_height(&self) -> f64 {
        self.venue_height
    }

    pub fn scoring(&self) -> &ScoringParams {
        &self.scoring
    }

    pub fn dispatch(&self) -> &DispatchParams {
        &self.dispatch
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Tick interval in seconds, the dwell increment per tick
    pub fn tick_secs(&self) -> f64 {
        self.tick_interval_ms as f64 / 1000.0
    }

    pub fn log_capacity(&self) -> usize {
        self.log_capacity
    }

    pub fn perturb_max_degrees(&self) -> f64 {
        self.perturb_max_degrees
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn beacons(&self) -> &[Beacon] {
        &self.beacons
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to place the pedestrian
    #[cfg(test)]
    pub fn with_start(mut self, position: Point, heading: f64, speed: f64) -> Self {
        self.start_position = position;
        self.start_heading = heading;
        self.start_speed = speed;
        self
    }

    /// Builder method for tests to override dispatch behavior
    #[cfg(test)]
    pub fn with_dispatch(mut self, sustain_ticks: u32, redirect_enabled: bool) -> Self {
        self.dispatch.sustain_ticks = sustain_ticks;
        self.dispatch.redirect_enabled = redirect_enabled;
        self
    }

    /// Builder method for tests to replace the gate layout
    #[cfg(test)]
    pub fn with_gates(mut self, gates: Vec<Gate>) -> Self {
        self.gates = gates;
        self
    }
}
