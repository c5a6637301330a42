//! Strategy Point Detectors
//!
//! Each detector walks the course trace independently and returns fresh
//! candidate points together with the reasons, if any, it could not look at
//! everything it was asked to.
//!
//! - **wind_shift**: direction changes between consecutive track samples
//! - **forecast**: the wind shift detector re-run on predicted fields
//! - **tack**: points where the other tack makes more progress to the leg end
//! - **layline**: points on a layline to a course mark

mod forecast;
mod layline;
mod tack;
mod wind_shift;

use serde::{Deserialize, Serialize};

use crate::strategy::{PointType, StrategyPoint};

pub use forecast::{forecast_wind_shifts, ForecastRun};
pub use layline::LaylineDetector;
pub use tack::TackDetector;
pub use wind_shift::WindShiftDetector;

/// Why a stage could not produce everything it normally would
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DegradationReason {
    /// Tack or layline detection skipped, no VMG calculator configured
    NoVmgCalculator { detector: PointType },
    /// Layline detection skipped, the VMG calculator knows no marks
    NoMarks,
    /// Some track points lie outside the wind field
    SamplesUnavailable { detector: PointType, skipped: usize },
    /// Forecast detection abandoned after the predictor failed
    PropagationUnavailable { lead_secs: i64, error: String },
}

impl std::fmt::Display for DegradationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradationReason::NoVmgCalculator { detector } => {
                write!(f, "{} detection unavailable: no VMG calculator", detector)
            }
            DegradationReason::NoMarks => write!(f, "layline detection unavailable: no marks"),
            DegradationReason::SamplesUnavailable { detector, skipped } => {
                write!(
                    f,
                    "{} detection skipped {} points outside the wind field",
                    detector, skipped
                )
            }
            DegradationReason::PropagationUnavailable { lead_secs, error } => {
                write!(f, "propagation unavailable at +{}s: {}", lead_secs, error)
            }
        }
    }
}

/// Output of one detector run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub points: Vec<StrategyPoint>,
    pub reasons: Vec<DegradationReason>,
}

impl Detection {
    pub fn new(points: Vec<StrategyPoint>) -> Self {
        Detection {
            points,
            reasons: Vec::new(),
        }
    }

    pub fn degraded(reason: DegradationReason) -> Self {
        Detection {
            points: Vec::new(),
            reasons: vec![reason],
        }
    }

    pub(crate) fn note_skipped(&mut self, detector: PointType, skipped: usize) {
        if skipped > 0 {
            log::warn!("{} detection: {} points outside the wind field", detector, skipped);
            self.reasons
                .push(DegradationReason::SamplesUnavailable { detector, skipped });
        }
    }
}
