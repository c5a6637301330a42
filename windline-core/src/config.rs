//! Detection Configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! {
//!   "confidence_threshold": 0.6,
//!   "propagation": { "horizon_secs": 3600 },
//!   "detectors": "WIND_SHIFT | LAYLINE"
//! }
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrategyError};
use crate::geo::CacheStrategy;

bitflags! {
    /// Detectors run by the engine
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DetectorSet: u8 {
        const WIND_SHIFT = 0b0001;
        const TACK = 0b0010;
        const LAYLINE = 0b0100;
    }
}

impl Default for DetectorSet {
    fn default() -> Self {
        DetectorSet::all()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindShiftConfig {
    /// Smallest direction change reported, degrees
    pub min_shift_angle: f64,
}

impl Default for WindShiftConfig {
    fn default() -> Self {
        WindShiftConfig {
            min_shift_angle: 5.0,
        }
    }
}

/// Longest forecast horizon accepted, seconds
pub const MAX_PROPAGATION_HORIZON_SECS: i64 = 24 * 3600;

/// Most forecast fields requested in one run
pub const MAX_PROPAGATION_STEPS: i64 = 288;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Run the wind shift detector on forecast fields too
    pub enabled: bool,
    pub step_secs: i64,
    pub horizon_secs: i64,
    /// Probability lost at the full horizon, `[0, 1]`
    pub decay_rate: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        PropagationConfig {
            enabled: true,
            step_secs: 300,
            horizon_secs: 1800,
            decay_rate: 0.1,
        }
    }
}

impl PropagationConfig {
    /// Forecast lead times: `step, 2·step, …` up to and including the horizon
    pub fn lead_times(&self) -> Vec<i64> {
        if self.step_secs <= 0 {
            return Vec::new();
        }
        (1..)
            .map_while(|i: i64| i.checked_mul(self.step_secs))
            .take_while(|t| *t <= self.horizon_secs)
            .collect()
    }

    /// Factor applied to probabilities forecast `lead_secs` ahead
    pub fn decay_factor(&self, lead_secs: i64) -> f64 {
        if self.horizon_secs <= 0 {
            return 1.0;
        }
        let fraction = lead_secs as f64 / self.horizon_secs as f64;
        (1.0 - fraction * self.decay_rate).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TackConfig {
    /// Minimum spacing between tack points on one leg, meters
    pub search_radius: f64,
    /// Smallest VMG gain worth a tack, fraction of boat speed
    pub min_vmg_gain: f64,
}

impl Default for TackConfig {
    fn default() -> Self {
        TackConfig {
            search_radius: 100.0,
            min_vmg_gain: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaylineConfig {
    /// Added to the upwind angle, degrees
    pub safety_margin: f64,
    /// Maximum bearing offset from a layline, degrees
    pub threshold_angle: f64,
    /// Marks farther than this from a trace point are ignored, meters
    pub max_mark_distance: f64,
}

impl Default for LaylineConfig {
    fn default() -> Self {
        LaylineConfig {
            safety_margin: 10.0,
            threshold_angle: 5.0,
            max_mark_distance: 3000.0,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Wind shifts below this probability are dropped, `[0, 1]`
    pub confidence_threshold: f64,
    pub detectors: DetectorSet,
    pub wind_shift: WindShiftConfig,
    pub propagation: PropagationConfig,
    pub tack: TackConfig,
    pub layline: LaylineConfig,
    pub cache: CacheStrategy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            confidence_threshold: 0.7,
            detectors: DetectorSet::default(),
            wind_shift: WindShiftConfig::default(),
            propagation: PropagationConfig::default(),
            tack: TackConfig::default(),
            layline: LaylineConfig::default(),
            cache: CacheStrategy::default(),
        }
    }
}

fn check(ok: bool, message: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(StrategyError::InvalidConfig(message()))
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        check((0.0..=1.0).contains(&self.confidence_threshold), || {
            format!("confidence_threshold {} not in [0, 1]", self.confidence_threshold)
        })?;
        let w = &self.wind_shift;
        check(w.min_shift_angle >= 0.0, || {
            format!("wind_shift.min_shift_angle {} is negative", w.min_shift_angle)
        })?;

        let p = &self.propagation;
        if p.enabled {
            check(p.step_secs > 0, || {
                format!("propagation.step_secs {} must be positive", p.step_secs)
            })?;
            check(p.horizon_secs > 0 && p.horizon_secs <= MAX_PROPAGATION_HORIZON_SECS, || {
                format!(
                    "propagation.horizon_secs {} not in [1, {}]",
                    p.horizon_secs, MAX_PROPAGATION_HORIZON_SECS
                )
            })?;
            check(p.horizon_secs / p.step_secs <= MAX_PROPAGATION_STEPS, || {
                format!(
                    "propagation.step_secs {} gives more than {} forecasts up to {} s",
                    p.step_secs, MAX_PROPAGATION_STEPS, p.horizon_secs
                )
            })?;
        }
        check((0.0..=1.0).contains(&p.decay_rate), || {
            format!("propagation.decay_rate {} not in [0, 1]", p.decay_rate)
        })?;

        check(self.tack.search_radius >= 0.0, || {
            format!("tack.search_radius {} is negative", self.tack.search_radius)
        })?;
        check(self.tack.min_vmg_gain >= 0.0, || {
            format!("tack.min_vmg_gain {} is negative", self.tack.min_vmg_gain)
        })?;

        let l = &self.layline;
        check(l.safety_margin >= 0.0, || {
            format!("layline.safety_margin {} is negative", l.safety_margin)
        })?;
        check(l.threshold_angle > 0.0, || {
            format!("layline.threshold_angle {} must be positive", l.threshold_angle)
        })?;
        check(l.max_mark_distance > 0.0, || {
            format!("layline.max_mark_distance {} must be positive", l.max_mark_distance)
        })?;
        Ok(())
    }
}
