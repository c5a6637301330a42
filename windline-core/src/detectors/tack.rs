//! Tack Detection
//!
//! At every interior path point the detector compares how much each tack,
//! sailed at the optimal VMG angle, makes good towards the end of the leg.
//! When the tack the boat is not on makes at least `min_vmg_gain` more
//! (as a fraction of boat speed), the point is a tack (or gybe) candidate.
//!
//! # Conventions
//!
//! The tack is named after the side the wind comes over: with the wind from
//! 0° and the boat heading 45°, the wind is on the port bow.
//!
//! | Tack      | Optimal heading  |
//! |-----------|------------------|
//! | Starboard | `wind - angle`   |
//! | Port      | `wind + angle`   |
//!
//! `angle` is the upwind angle when the leg end lies less than 90° off the
//! wind, otherwise the downwind angle.

use super::{DegradationReason, Detection};
use crate::config::TackConfig;
use crate::geo::{angle_difference, normalize_angle, GeoKernel};
use crate::strategy::{
    CourseTrace, PointKind, PointType, Position, StrategyPoint, TackDetails, TackSide,
    VmgCalculator,
};
use crate::wind::{sample, WindField, WindSample};

/// Points closer than this to the end of their leg have no stable axis (meters)
const MIN_AXIS_DISTANCE_M: f64 = 10.0;

/// VMG gain at which timing sensitivity saturates
const FULL_SENSITIVITY_GAIN: f64 = 0.3;

#[derive(Debug, Clone, Default)]
pub struct TackDetector {
    config: TackConfig,
}

/// Heading of `side` sailed `angle` degrees off a wind from `wind`
pub fn optimal_heading(side: TackSide, wind: f64, angle: f64) -> f64 {
    match side {
        TackSide::Starboard => normalize_angle(wind - angle),
        TackSide::Port => normalize_angle(wind + angle),
    }
}

/// Tack a boat on `heading` is sailing, with the wind from `wind`
pub fn tack_of(heading: f64, wind: f64) -> TackSide {
    if angle_difference(wind, heading) >= 0.0 {
        TackSide::Starboard
    } else {
        TackSide::Port
    }
}

/// Velocity made on course per unit boat speed
fn made_good(heading: f64, axis: f64) -> f64 {
    angle_difference(heading, axis).to_radians().cos()
}

impl TackDetector {
    pub fn new(config: TackConfig) -> Self {
        TackDetector { config }
    }

    pub fn detect(
        &self,
        course: &CourseTrace,
        field: &WindField,
        vmg: Option<&dyn VmgCalculator>,
        geo: &mut GeoKernel,
    ) -> Detection {
        let Some(vmg) = vmg else {
            log::warn!("tack detection needs a VMG calculator, skipping");
            return Detection::degraded(DegradationReason::NoVmgCalculator {
                detector: PointType::Tack,
            });
        };

        let mut detection = Detection::default();
        let mut skipped = 0;

        for (leg_index, leg) in course.analyzable_legs() {
            let points = &leg.path_points;
            let Some(end) = leg.last() else {
                continue;
            };
            let mut last_emitted: Option<Position> = None;

            for window in points.windows(2).take(points.len().saturating_sub(2)) {
                let (prev, point) = (&window[0], &window[1]);
                let Some(wind) = sample(point.lat, point.lon, field) else {
                    skipped += 1;
                    continue;
                };
                if geo.distance(point.lat, point.lon, end.lat, end.lon) < MIN_AXIS_DISTANCE_M {
                    continue;
                }
                if geo.distance(prev.lat, prev.lon, point.lat, point.lon) == 0.0 {
                    continue;
                }
                if let Some(position) = last_emitted {
                    let spacing = geo.distance(position.lat, position.lon, point.lat, point.lon);
                    if spacing < self.config.search_radius {
                        continue;
                    }
                }

                let heading = geo.bearing(prev.lat, prev.lon, point.lat, point.lon);
                let axis = geo.bearing(point.lat, point.lon, end.lat, end.lon);
                let Some(candidate) = self.evaluate(heading, axis, &wind, vmg) else {
                    continue;
                };

                log::trace!(
                    "leg {}: tack candidate at ({:.5}, {:.5}), gain {:.3}",
                    leg_index,
                    point.lat,
                    point.lon,
                    candidate.vmg_gain
                );
                let upwind = angle_difference(axis, wind.direction).abs() < 90.0;
                let confidence = wind.confidence * (1.0 - 0.5 * wind.variability);
                let position = Position::new(point.lat, point.lon);
                detection.points.push(StrategyPoint::new(
                    position,
                    point.timestamp,
                    confidence,
                    describe(&candidate, upwind, &wind),
                    PointKind::Tack(candidate),
                ));
                last_emitted = Some(position);
            }
        }

        detection.note_skipped(PointType::Tack, skipped);
        log::debug!("tack detection: {} candidates", detection.points.len());
        detection
    }

    /// VMG comparison of both tacks at one point
    fn evaluate(
        &self,
        heading: f64,
        axis: f64,
        wind: &WindSample,
        vmg: &dyn VmgCalculator,
    ) -> Option<TackDetails> {
        let angles = vmg.optimal_vmg_angles(wind.speed);
        let upwind = angle_difference(axis, wind.direction).abs() < 90.0;
        let angle = if upwind {
            angles.upwind_angle
        } else {
            angles.downwind_angle
        };

        let current = tack_of(heading, wind.direction);
        let other = current.opposite();
        let vmg_gain = made_good(optimal_heading(other, wind.direction, angle), axis)
            - made_good(optimal_heading(current, wind.direction, angle), axis);
        if vmg_gain < self.config.min_vmg_gain {
            return None;
        }

        let timing_sensitivity = (0.5 * wind.variability
            + 0.5 * (vmg_gain / FULL_SENSITIVITY_GAIN).min(1.0))
        .clamp(0.0, 1.0);
        Some(TackDetails {
            tack_type: other,
            vmg_gain,
            timing_sensitivity,
        })
    }
}

fn describe(details: &TackDetails, upwind: bool, wind: &WindSample) -> String {
    format!(
        "{} to {}: VMG gain {:.1}% (wind {:.0}° at {:.1} kn)",
        if upwind { "Tack" } else { "Gybe" },
        details.tack_type,
        details.vmg_gain * 100.0,
        wind.direction,
        wind.speed
    )
}
