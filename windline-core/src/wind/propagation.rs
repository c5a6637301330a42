//! Wind Propagation
//!
//! The engine never forecasts wind itself. It asks a
//! [`WindPropagationPredictor`] for the field expected at a later instant and
//! treats any failure as "no forecast available".
//!
//! [`LinearTrendPredictor`] is a small persistence-plus-trend model, useful
//! when no numerical forecast is at hand: it rotates the whole field at a
//! constant rate, applies a linear speed trend and lets confidence decay.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::field::WindField;
use crate::error::PredictionError;
use crate::geo::normalize_angle;

/// Forecasts a wind field for a later instant
pub trait WindPropagationPredictor {
    /// Predict the field at `target_time` starting from `current`
    fn predict(
        &self,
        target_time: DateTime<Utc>,
        current: &WindField,
    ) -> Result<WindField, PredictionError>;
}

impl<F> WindPropagationPredictor for F
where
    F: Fn(DateTime<Utc>, &WindField) -> Result<WindField, PredictionError>,
{
    fn predict(
        &self,
        target_time: DateTime<Utc>,
        current: &WindField,
    ) -> Result<WindField, PredictionError> {
        self(target_time, current)
    }
}

/// Persistence forecast with a constant veer rate and speed trend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearTrendPredictor {
    /// Clockwise rotation of the wind direction, degrees per hour
    pub veer_deg_per_hour: f64,
    /// Change in wind speed, knots per hour
    pub speed_trend_kn_per_hour: f64,
    /// Fraction of confidence lost per hour of forecast
    pub confidence_decay_per_hour: f64,
    /// Longest forecast this model accepts, seconds
    pub max_horizon_secs: i64,
}

impl Default for LinearTrendPredictor {
    fn default() -> Self {
        LinearTrendPredictor {
            veer_deg_per_hour: 0.0,
            speed_trend_kn_per_hour: 0.0,
            confidence_decay_per_hour: 0.2,
            max_horizon_secs: 3 * 3600,
        }
    }
}

impl WindPropagationPredictor for LinearTrendPredictor {
    fn predict(
        &self,
        target_time: DateTime<Utc>,
        current: &WindField,
    ) -> Result<WindField, PredictionError> {
        let lead = target_time - current.timestamp();
        if lead < Duration::zero() {
            return Err(PredictionError::TargetInPast {
                target: target_time,
                field: current.timestamp(),
            });
        }
        let max_horizon = Duration::try_seconds(self.max_horizon_secs);
        if max_horizon.is_some_and(|max| lead > max) {
            return Err(PredictionError::HorizonExceeded {
                requested_secs: lead.num_seconds(),
                max_secs: self.max_horizon_secs,
            });
        }

        let hours = lead.num_milliseconds() as f64 / 3_600_000.0;
        let veer = self.veer_deg_per_hour * hours;
        let speed_delta = self.speed_trend_kn_per_hour * hours;
        let retained = (1.0 - self.confidence_decay_per_hour * hours).clamp(0.0, 1.0);

        let direction = current.direction().mapv(|d| normalize_angle(d + veer));
        let speed = current.speed().mapv(|s| (s + speed_delta).max(0.0));
        let confidence = current.confidence().mapv(|c| (c * retained).clamp(0.0, 1.0));

        Ok(current.with_values(direction, speed, confidence, target_time)?)
    }
}
