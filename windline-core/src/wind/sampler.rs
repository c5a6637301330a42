//! Wind Field Sampling
//!
//! Nearest-grid-point lookup with a local variability estimate.
//!
//! Variability combines circular statistics on direction (so that 359° and
//! 1° count as close) with the coefficient of variation of speed, both taken
//! over the 3×3 neighborhood of the nearest cell, clipped at the grid edge.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::field::WindField;
use super::propagation::WindPropagationPredictor;
use crate::geo::normalize_angle;

/// Weight of direction variability in the combined variability
pub const DIRECTION_VARIABILITY_WEIGHT: f64 = 0.7;

/// Weight of speed variability in the combined variability
pub const SPEED_VARIABILITY_WEIGHT: f64 = 0.3;

/// Wind conditions at one location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    /// Direction the wind blows from, degrees `[0, 360)`
    pub direction: f64,
    /// Knots, never negative
    pub speed: f64,
    /// `[0, 1]`
    pub confidence: f64,
    /// Local variability `[0, 1]`
    pub variability: f64,
}

/// Sample `field` at `(lat, lon)`.
///
/// Returns `None` when the point lies outside the field's bounding box; the
/// nearest cell is never extrapolated beyond the grid.
pub fn sample(lat: f64, lon: f64, field: &WindField) -> Option<WindSample> {
    let Some((row, col)) = field.nearest_cell(lat, lon) else {
        log::trace!("({:.5}, {:.5}) is outside the wind field", lat, lon);
        return None;
    };

    Some(WindSample {
        direction: normalize_angle(field.direction()[[row, col]]),
        speed: field.speed()[[row, col]].max(0.0),
        confidence: field.confidence()[[row, col]].clamp(0.0, 1.0),
        variability: local_variability(field, row, col),
    })
}

/// Combined variability of the edge-clipped 3×3 block around `(row, col)`.
pub fn local_variability(field: &WindField, row: usize, col: usize) -> f64 {
    let (rows, cols) = field.shape();
    let r0 = row.saturating_sub(1);
    let r1 = (row + 1).min(rows - 1);
    let c0 = col.saturating_sub(1);
    let c1 = (col + 1).min(cols - 1);

    let mut unit_sum = Vector2::zeros();
    let mut speeds = Vec::with_capacity(9);
    for r in r0..=r1 {
        for c in c0..=c1 {
            let theta = field.direction()[[r, c]].to_radians();
            unit_sum += Vector2::new(theta.sin(), theta.cos());
            speeds.push(field.speed()[[r, c]].max(0.0));
        }
    }
    let n = speeds.len() as f64;

    let direction_variability = (1.0 - (unit_sum / n).norm()).clamp(0.0, 1.0);

    let mean_speed = speeds.iter().sum::<f64>() / n;
    let speed_variability = if mean_speed > 0.0 {
        let variance = speeds.iter().map(|s| (s - mean_speed).powi(2)).sum::<f64>() / n;
        variance.sqrt() / mean_speed
    } else {
        0.0
    };

    (DIRECTION_VARIABILITY_WEIGHT * direction_variability
        + SPEED_VARIABILITY_WEIGHT * speed_variability.min(1.0))
    .clamp(0.0, 1.0)
}

/// Sampler bound to one wind field, optionally time-aware.
///
/// With a predictor, [`WindFieldSampler::sample_at`] samples a forecast of
/// the field for the requested time. Forecasts are memoized per target time
/// (including failed ones) for the lifetime of the sampler.
pub struct WindFieldSampler<'a> {
    field: &'a WindField,
    predictor: Option<&'a dyn WindPropagationPredictor>,
    forecasts: HashMap<DateTime<Utc>, Option<WindField>>,
}

impl<'a> WindFieldSampler<'a> {
    pub fn new(field: &'a WindField) -> Self {
        WindFieldSampler {
            field,
            predictor: None,
            forecasts: HashMap::new(),
        }
    }

    pub fn with_predictor(
        field: &'a WindField,
        predictor: Option<&'a dyn WindPropagationPredictor>,
    ) -> Self {
        WindFieldSampler {
            field,
            predictor,
            forecasts: HashMap::new(),
        }
    }

    pub fn field(&self) -> &WindField {
        self.field
    }

    /// Use `forecast` for samples at `time` instead of asking the predictor
    pub fn insert_forecast(&mut self, time: DateTime<Utc>, forecast: WindField) {
        self.forecasts.insert(time, Some(forecast));
    }

    /// Sample the bound field directly
    pub fn sample(&self, lat: f64, lon: f64) -> Option<WindSample> {
        sample(lat, lon, self.field)
    }

    /// Sample the wind expected at `time`.
    ///
    /// Falls back to the bound field when `time` equals its timestamp, when
    /// there is no predictor, or when the predictor fails.
    pub fn sample_at(&mut self, lat: f64, lon: f64, time: DateTime<Utc>) -> Option<WindSample> {
        let field = self.field;
        let Some(predictor) = self.predictor else {
            return sample(lat, lon, field);
        };
        if time == field.timestamp() {
            return sample(lat, lon, field);
        }

        let forecast = self.forecasts.entry(time).or_insert_with(|| {
            match predictor.predict(time, field) {
                Ok(predicted) => Some(predicted),
                Err(e) => {
                    log::warn!("wind prediction for {} failed, using current field: {}", time, e);
                    None
                }
            }
        });

        match forecast {
            Some(predicted) => sample(lat, lon, predicted),
            None => sample(lat, lon, field),
        }
    }
}
