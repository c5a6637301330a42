//! Forecast Wind Shift Detection
//!
//! Re-runs the wind shift detector on fields predicted `step, 2·step, …,
//! horizon` seconds ahead. Points found on a forecast are stamped with the
//! forecast instant and their probability is decayed linearly with lead time.
//!
//! Forecast points only ever add to the current-time detections. If the
//! predictor fails at any lead time, or a lead time cannot be represented,
//! every forecast point of the run is discarded and the failure is returned
//! for reporting.
//!
//! The predicted fields are handed back with the points, so scoring samples
//! the same forecast the points were detected on.

use chrono::{DateTime, Duration, Utc};

use super::{DegradationReason, WindShiftDetector};
use crate::config::PropagationConfig;
use crate::strategy::{CourseTrace, StrategyPoint};
use crate::wind::{WindField, WindPropagationPredictor};

/// Result of a forecast run
#[derive(Debug, Clone, Default)]
pub struct ForecastRun {
    pub points: Vec<StrategyPoint>,
    /// Predicted field per forecast instant, in lead order
    pub forecasts: Vec<(DateTime<Utc>, WindField)>,
    /// Set when the run was abandoned
    pub failure: Option<DegradationReason>,
}

impl ForecastRun {
    fn abandoned(lead_secs: i64, error: String) -> Self {
        log::warn!(
            "wind prediction at +{}s failed, using current-time detections only: {}",
            lead_secs,
            error
        );
        ForecastRun {
            points: Vec::new(),
            forecasts: Vec::new(),
            failure: Some(DegradationReason::PropagationUnavailable { lead_secs, error }),
        }
    }
}

fn decay(point: &mut StrategyPoint, factor: f64) {
    point.confidence = (point.confidence * factor).clamp(0.0, 1.0);
    if let Some(shift) = point.as_wind_shift_mut() {
        shift.shift_probability = (shift.shift_probability * factor).clamp(0.0, 1.0);
    }
}

pub fn forecast_wind_shifts(
    detector: &WindShiftDetector,
    course: &CourseTrace,
    field: &WindField,
    predictor: &dyn WindPropagationPredictor,
    config: &PropagationConfig,
) -> ForecastRun {
    let mut points = Vec::new();
    let mut forecasts = Vec::new();

    for lead_secs in config.lead_times() {
        let target = Duration::try_seconds(lead_secs)
            .and_then(|lead| field.timestamp().checked_add_signed(lead));
        let Some(target) = target else {
            return ForecastRun::abandoned(lead_secs, "forecast time out of range".to_string());
        };
        let forecast = match predictor.predict(target, field) {
            Ok(forecast) => forecast,
            Err(e) => return ForecastRun::abandoned(lead_secs, e.to_string()),
        };

        let factor = config.decay_factor(lead_secs);
        let mut detection = detector.detect(course, &forecast);
        for point in &mut detection.points {
            point.time_estimate = target;
            decay(point, factor);
        }
        log::debug!(
            "forecast +{}s: {} wind shift candidates, decay {:.3}",
            lead_secs,
            detection.points.len(),
            factor
        );
        points.extend(detection.points);
        forecasts.push((target, forecast));
    }

    ForecastRun {
        points,
        forecasts,
        failure: None,
    }
}
