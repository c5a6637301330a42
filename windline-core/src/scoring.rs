//! Strategic Scoring
//!
//! Risk is a closed-form blend of local wind variability and variant-specific
//! factors, each weighted 0.4 / 0.3 / 0.3 and scaled to `[0, 100]`:
//!
//! | Type       | 0.3 weight          | 0.3 weight                    |
//! |------------|---------------------|-------------------------------|
//! | Wind shift | `min(1, |shift|/45)`| `1 - shift_probability`       |
//! | Tack       | timing sensitivity  | `1 - min(1, vmg_gain / 0.3)`  |
//! | Layline    | traffic factor      | `min(1, mark_distance/2000)`  |
//!
//! Unknown variability scores as [`NEUTRAL_VARIABILITY`].

use crate::strategy::{PointKind, StrategyPoint};
use crate::wind::WindSample;

pub const NEUTRAL_VARIABILITY: f64 = 0.2;

const VARIABILITY_WEIGHT: f64 = 0.4;
const FACTOR_WEIGHT: f64 = 0.3;
const FULL_RISK_SHIFT_ANGLE: f64 = 45.0;
const FULL_CREDIT_VMG_GAIN: f64 = 0.3;
const FULL_RISK_MARK_DISTANCE_M: f64 = 2000.0;
const CONFIDENCE_DISCOUNT: f64 = 0.3;

const IMPORTANCE_RISK_WEIGHT: f64 = 0.6;
const IMPORTANCE_CONFIDENCE_WEIGHT: f64 = 0.4;

/// Wind conditions a point is scored against
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindContext {
    pub variability: Option<f64>,
}

impl WindContext {
    pub fn from_sample(sample: Option<WindSample>) -> Self {
        WindContext {
            variability: sample.map(|s| s.variability),
        }
    }

    /// Variability clamped to `[0, 1]`, neutral when unknown
    pub fn variability(&self) -> f64 {
        self.variability
            .filter(|v| v.is_finite())
            .unwrap_or(NEUTRAL_VARIABILITY)
            .clamp(0.0, 1.0)
    }
}

pub trait StrategicScorer {
    /// Risk of `point` in `[0, 100]`
    fn risk_score(&self, point: &StrategyPoint, context: &WindContext) -> f64;

    /// Set the risk score and discount confidence by variability
    fn score(&self, point: &mut StrategyPoint, context: &WindContext) {
        let variability = context.variability();
        point.risk_score = self.risk_score(point, context).clamp(0.0, 100.0);
        point.confidence =
            (point.confidence * (1.0 - CONFIDENCE_DISCOUNT * variability)).clamp(0.0, 1.0);
    }
}

/// Default weighted risk model
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedScorer;

impl StrategicScorer for WeightedScorer {
    fn risk_score(&self, point: &StrategyPoint, context: &WindContext) -> f64 {
        let (first, second) = match &point.kind {
            PointKind::WindShift(shift) => (
                (shift.shift_angle.abs() / FULL_RISK_SHIFT_ANGLE).min(1.0),
                1.0 - shift.shift_probability,
            ),
            PointKind::Tack(tack) => (
                tack.timing_sensitivity,
                1.0 - (tack.vmg_gain / FULL_CREDIT_VMG_GAIN).min(1.0),
            ),
            PointKind::Layline(layline) => (
                layline.traffic_factor,
                (layline.mark_distance / FULL_RISK_MARK_DISTANCE_M).min(1.0),
            ),
        };
        let blended = VARIABILITY_WEIGHT * context.variability()
            + FACTOR_WEIGHT * first.clamp(0.0, 1.0)
            + FACTOR_WEIGHT * second.clamp(0.0, 1.0);
        (100.0 * blended).clamp(0.0, 100.0)
    }
}

pub fn importance(point: &StrategyPoint) -> f64 {
    let risk = IMPORTANCE_RISK_WEIGHT * point.risk_score / 100.0;
    (risk + IMPORTANCE_CONFIDENCE_WEIGHT * point.confidence).clamp(0.0, 1.0)
}

/// Set importance on every point and sort by descending importance, then time
pub fn rank(points: &mut [StrategyPoint]) {
    for point in points.iter_mut() {
        point.importance = importance(point);
    }
    points.sort_by(|a, b| {
        b.importance
            .total_cmp(&a.importance)
            .then_with(|| a.time_estimate.cmp(&b.time_estimate))
    });
}
