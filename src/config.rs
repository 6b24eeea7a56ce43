//! Rig configuration: directories, feed rates, settle delays, and the fixed
//! calibration reference offsets of the positioning rig.
//!
//! Everything here is a device constant, not a derived value. The defaults
//! match the reference rig; a `rig.toml` next to the binary overrides them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::solver::{SolveOptions, SolverStrategy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RigConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub feeds: FeedConfig,
    #[serde(default)]
    pub delays: DelayConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            solver: SolverConfig::default(),
            feeds: FeedConfig::default(),
            delays: DelayConfig::default(),
            calibration: CalibrationConfig::default(),
            terminal: TerminalConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub strategy: SolverStrategy,
    #[serde(default = "default_max_iters")]
    pub max_iters: usize,
    #[serde(default = "default_distance_tol")]
    pub distance_tol: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy: SolverStrategy::default(),
            max_iters: default_max_iters(),
            distance_tol: default_distance_tol(),
        }
    }
}

impl SolverConfig {
    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            max_iters: self.max_iters,
            distance_tol: self.distance_tol,
            ..SolveOptions::default()
        }
    }
}

/// Feed rates in mm/min for the two command dialects.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default = "default_rapid_feed")]
    pub rapid: f64,
    #[serde(default = "default_traverse_feed")]
    pub traverse: f64,
    #[serde(default = "default_rotary_feed")]
    pub rotary: f64,
    #[serde(default = "default_lateral_feed")]
    pub lateral: f64,
    #[serde(default = "default_vertical_feed")]
    pub vertical: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            rapid: default_rapid_feed(),
            traverse: default_traverse_feed(),
            rotary: default_rotary_feed(),
            lateral: default_lateral_feed(),
            vertical: default_vertical_feed(),
        }
    }
}

/// Settling delays in milliseconds for the terminal dialect.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelayConfig {
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u32,
    #[serde(default = "default_position_ms")]
    pub position_ms: u32,
    #[serde(default = "default_light_step_ms")]
    pub light_step_ms: u32,
    #[serde(default = "default_light_park_ms")]
    pub light_park_ms: u32,
    #[serde(default = "default_full_step_ms")]
    pub full_step_ms: u32,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            position_ms: default_position_ms(),
            light_step_ms: default_light_step_ms(),
            light_park_ms: default_light_park_ms(),
            full_step_ms: default_full_step_ms(),
        }
    }
}

/// Homing overshoots and re-zero reference offsets for both calibration
/// templates. Overshoots drive each axis into its limit switch; references
/// are the known offsets the axes are re-zeroed to afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_rotary_overshoot")]
    pub rotary_overshoot: f64,
    #[serde(default = "default_rotary_sweep")]
    pub rotary_sweep: f64,
    #[serde(default = "default_rotary_reference_q")]
    pub rotary_reference_q: f64,
    #[serde(default = "default_rotary_reference_w")]
    pub rotary_reference_w: f64,
    #[serde(default = "default_linear_overshoot_x")]
    pub linear_overshoot_x: f64,
    #[serde(default = "default_linear_overshoot_y")]
    pub linear_overshoot_y: f64,
    #[serde(default = "default_linear_overshoot_z")]
    pub linear_overshoot_z: f64,
    #[serde(default = "default_linear_reference_x")]
    pub linear_reference_x: f64,
    #[serde(default = "default_linear_reference_y")]
    pub linear_reference_y: f64,
    #[serde(default = "default_linear_reference_z")]
    pub linear_reference_z: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            rotary_overshoot: default_rotary_overshoot(),
            rotary_sweep: default_rotary_sweep(),
            rotary_reference_q: default_rotary_reference_q(),
            rotary_reference_w: default_rotary_reference_w(),
            linear_overshoot_x: default_linear_overshoot_x(),
            linear_overshoot_y: default_linear_overshoot_y(),
            linear_overshoot_z: default_linear_overshoot_z(),
            linear_reference_x: default_linear_reference_x(),
            linear_reference_y: default_linear_reference_y(),
            linear_reference_z: default_linear_reference_z(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TerminalConfig {
    /// Rotary angle that points the probe lens straight down.
    #[serde(default = "default_lens_down_angle")]
    pub lens_down_angle: f64,
    /// Emit the end-traversal trailing block (move to the exit pose and
    /// back). Off in the reference rig.
    #[serde(default)]
    pub emit_traversal: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            lens_down_angle: default_lens_down_angle(),
            emit_traversal: false,
        }
    }
}

impl RigConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, feed) in [
            ("rapid", self.feeds.rapid),
            ("traverse", self.feeds.traverse),
            ("rotary", self.feeds.rotary),
            ("lateral", self.feeds.lateral),
            ("vertical", self.feeds.vertical),
        ] {
            if feed <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "feed rate '{name}' must be > 0, got {feed}"
                )));
            }
        }
        if self.solver.distance_tol <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "solver.distance_tol must be > 0, got {}",
                self.solver.distance_tol
            )));
        }
        if self.solver.max_iters == 0 {
            return Err(ConfigError::Invalid(
                "solver.max_iters must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_input_dir() -> String {
    "json".to_string()
}
fn default_output_dir() -> String {
    "result".to_string()
}
fn default_max_iters() -> usize {
    200
}
fn default_distance_tol() -> f64 {
    1e-3
}
fn default_rapid_feed() -> f64 {
    300.0
}
fn default_traverse_feed() -> f64 {
    100.0
}
fn default_rotary_feed() -> f64 {
    2000.0
}
fn default_lateral_feed() -> f64 {
    200.0
}
fn default_vertical_feed() -> f64 {
    2000.0
}
fn default_settle_ms() -> u32 {
    3000
}
fn default_position_ms() -> u32 {
    5000
}
fn default_light_step_ms() -> u32 {
    5000
}
fn default_light_park_ms() -> u32 {
    10000
}
fn default_full_step_ms() -> u32 {
    20000
}
fn default_rotary_overshoot() -> f64 {
    -999.0
}
fn default_rotary_sweep() -> f64 {
    90.0
}
fn default_rotary_reference_q() -> f64 {
    31.0
}
fn default_rotary_reference_w() -> f64 {
    60.0
}
fn default_linear_overshoot_x() -> f64 {
    -999.0
}
fn default_linear_overshoot_y() -> f64 {
    -999.0
}
fn default_linear_overshoot_z() -> f64 {
    999.0
}
fn default_linear_reference_x() -> f64 {
    442.0
}
fn default_linear_reference_y() -> f64 {
    488.0
}
fn default_linear_reference_z() -> f64 {
    -263.0
}
fn default_lens_down_angle() -> f64 {
    -91.0
}

pub fn load_config(path: &Path) -> Result<RigConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("failed to read config file '{}': {}", path.display(), e);
        e
    })?;
    let config: RigConfig = toml::from_str(&contents).map_err(|e| {
        tracing::error!("failed to parse config TOML: {}", e);
        e
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads `path` if it exists, otherwise falls back to the built-in defaults.
pub fn load_or_default(path: &Path) -> Result<RigConfig, ConfigError> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(
            "config file '{}' not found, using built-in defaults",
            path.display()
        );
        Ok(RigConfig::default())
    }
}
