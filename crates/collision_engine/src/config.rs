//! Engine configuration
//!
//! All tuning constants live here: grid cell size, worker pool sizing,
//! dispatch thresholds and timeouts, and response coefficients. The
//! configuration is plain data (no CLI surface) with serde support so it
//! can be loaded from a TOML file or built in code.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::physics::contact::PairMode;

/// Axis-aligned play-area bounds used to re-clamp entities after
/// positional correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Left edge.
    pub min_x: f64,
    /// Top edge.
    pub min_y: f64,
    /// Right edge.
    pub max_x: f64,
    /// Bottom edge.
    pub max_y: f64,
}

impl Viewport {
    /// Create a viewport from its corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Clamp a coordinate pair so a box with the given half-extents stays
    /// fully inside the viewport. If the viewport is narrower than the
    /// entity on an axis, the entity is centered on that axis.
    pub fn clamp(&self, x: f64, y: f64, half_x: f64, half_y: f64) -> (f64, f64) {
        (
            clamp_axis(x, self.min_x + half_x, self.max_x - half_x),
            clamp_axis(y, self.min_y + half_y, self.max_y - half_y),
        )
    }
}

fn clamp_axis(value: f64, lo: f64, hi: f64) -> f64 {
    if lo > hi {
        (lo + hi) / 2.0
    } else {
        value.clamp(lo, hi)
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Uniform grid cell size in world units. Should be tuned so that the
    /// per-cell entity count stays small (broad phase is O(m²) locally).
    pub cell_size: f64,

    /// Number of narrow-phase worker threads. Zero disables the pool and
    /// forces the synchronous code path.
    pub worker_threads: usize,

    /// Candidate pairs per dispatched task.
    pub batch_size: usize,

    /// Minimum total pair count for which worker dispatch is worth it;
    /// smaller ticks run synchronously in the caller's context.
    pub batch_threshold: usize,

    /// Per-tick bound on waiting for worker results, in milliseconds.
    /// Tasks that miss the window contribute no contacts (fail-open).
    pub task_timeout_ms: u64,

    /// Scale applied to the reflected normal velocity component on
    /// object-obstacle contact (1.0 = perfectly elastic).
    pub restitution: f64,

    /// Scale applied to the tangential velocity component on
    /// object-obstacle contact (1.0 = frictionless).
    pub friction: f64,

    /// Positions changing by less than this are treated as stationary and
    /// skip grid maintenance.
    pub position_epsilon: f64,

    /// Role pairing evaluated by [`crate::engine::CollisionEngine::tick`].
    pub pair_mode: PairMode,

    /// Optional play-area bounds for post-correction clamping.
    pub viewport: Option<Viewport>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cell_size: 64.0,
            worker_threads: 4,
            batch_size: 64,
            batch_threshold: 32,
            task_timeout_ms: 50,
            restitution: 0.9,
            friction: 0.98,
            position_epsilon: 1e-3,
            pair_mode: PairMode::All,
            viewport: None,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is in its valid range.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "cell_size must be positive, got {}",
                self.cell_size
            )));
        }
        if self.batch_size == 0 {
            return Err(EngineError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        if self.task_timeout_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "task_timeout_ms must be non-zero".into(),
            ));
        }
        for (name, value) in [("restitution", self.restitution), ("friction", self.friction)] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if !(self.position_epsilon.is_finite() && self.position_epsilon >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "position_epsilon must be non-negative, got {}",
                self.position_epsilon
            )));
        }
        if let Some(vp) = &self.viewport {
            if vp.min_x > vp.max_x || vp.min_y > vp.max_y {
                return Err(EngineError::InvalidConfig(
                    "viewport min corner must not exceed max corner".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_cell_size() {
        let config = EngineConfig {
            cell_size: 0.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_restitution() {
        let config = EngineConfig {
            restitution: 1.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let config = EngineConfig {
            cell_size: 48.0,
            worker_threads: 2,
            viewport: Some(Viewport::new(0.0, 0.0, 800.0, 600.0)),
            ..EngineConfig::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let parsed: EngineConfig = toml::from_str("cell_size = 32.0").unwrap();
        assert_eq!(parsed.cell_size, 32.0);
        assert_eq!(parsed.batch_size, EngineConfig::default().batch_size);
    }

    #[test]
    fn viewport_clamp_keeps_entity_inside() {
        let vp = Viewport::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(vp.clamp(-20.0, 50.0, 5.0, 5.0), (5.0, 50.0));
        assert_eq!(vp.clamp(120.0, 120.0, 5.0, 5.0), (95.0, 95.0));
    }

    #[test]
    fn viewport_clamp_centers_oversized_entity() {
        let vp = Viewport::new(0.0, 0.0, 10.0, 10.0);
        let (x, _) = vp.clamp(0.0, 5.0, 20.0, 1.0);
        assert_eq!(x, 5.0);
    }
}
