//! Wind Shift Detection
//!
//! Walks each leg, samples the wind at every path point and compares each
//! valid sample with the previous valid one. Points without wind data are
//! skipped without breaking the walk, so a shift is still found across a
//! gap in the field.

use chrono::{DateTime, Utc};

use super::Detection;
use crate::config::WindShiftConfig;
use crate::geo::{angle_difference, midpoint};
use crate::strategy::{
    CourseTrace, PathPoint, PointKind, PointType, Position, StrategyPoint, WindShiftDetails,
};
use crate::wind::{sample, WindField, WindSample};

/// Shifts at or above this angle get the full angle weight
pub const FULL_WEIGHT_SHIFT_ANGLE: f64 = 45.0;

#[derive(Debug, Clone, Default)]
pub struct WindShiftDetector {
    config: WindShiftConfig,
}

fn time_midpoint(a: DateTime<Utc>, b: DateTime<Utc>) -> DateTime<Utc> {
    a + (b - a) / 2
}

/// Midpoint of two sampled track points that stays inside `field`.
///
/// The short way round the antimeridian can leave a bounding box that spans
/// -180..180; the plain average of two points inside the box never does.
fn position_between(a: &PathPoint, b: &PathPoint, field: &WindField) -> Position {
    let (lat, lon) = midpoint(a.lat, a.lon, b.lat, b.lon);
    if field.contains(lat, lon) {
        Position::new(lat, lon)
    } else {
        Position::new((a.lat + b.lat) / 2.0, (a.lon + b.lon) / 2.0)
    }
}

/// Probability that a direction change is a real, usable shift
pub fn shift_probability(shift_angle: f64, before: &WindSample, after: &WindSample) -> f64 {
    let confidence = before.confidence.min(after.confidence);
    let variability = before.variability.max(after.variability);
    let raw_probability = confidence * (1.0 - variability);
    let angle_weight = (shift_angle.abs() / FULL_WEIGHT_SHIFT_ANGLE).min(1.0);
    (raw_probability * (0.5 + 0.5 * angle_weight)).clamp(0.0, 1.0)
}

fn describe(shift_angle: f64, before: f64, after: f64, speed: f64) -> String {
    let kind = if shift_angle >= 0.0 { "veer" } else { "back" };
    format!(
        "Wind {} of {:.1}° ({:.0}° → {:.0}°) at {:.1} kn",
        kind,
        shift_angle.abs(),
        before,
        after,
        speed
    )
}

impl WindShiftDetector {
    pub fn new(config: WindShiftConfig) -> Self {
        WindShiftDetector { config }
    }

    pub fn min_shift_angle(&self) -> f64 {
        self.config.min_shift_angle
    }

    pub fn detect(&self, course: &CourseTrace, field: &WindField) -> Detection {
        let mut detection = Detection::default();
        let mut skipped = 0;

        for (leg_index, leg) in course.analyzable_legs() {
            let mut previous: Option<(&PathPoint, WindSample)> = None;

            for point in &leg.path_points {
                let Some(current) = sample(point.lat, point.lon, field) else {
                    skipped += 1;
                    continue;
                };

                if let Some((prev_point, prev_sample)) = previous {
                    let shift = self.compare(field, prev_point, &prev_sample, point, &current);
                    if let Some(shift) = shift {
                        log::trace!(
                            "leg {}: {} at ({:.5}, {:.5})",
                            leg_index,
                            shift.description,
                            shift.position.lat,
                            shift.position.lon
                        );
                        detection.points.push(shift);
                    }
                }
                previous = Some((point, current));
            }
        }

        detection.note_skipped(PointType::WindShift, skipped);
        log::debug!("wind shift detection: {} candidates", detection.points.len());
        detection
    }

    fn compare(
        &self,
        field: &WindField,
        before_point: &PathPoint,
        before: &WindSample,
        after_point: &PathPoint,
        after: &WindSample,
    ) -> Option<StrategyPoint> {
        let shift_angle = angle_difference(after.direction, before.direction);
        if shift_angle.abs() < self.config.min_shift_angle {
            return None;
        }

        let position = position_between(before_point, after_point, field);
        let wind_speed = (before.speed + after.speed) / 2.0;
        let confidence = before.confidence.min(after.confidence);

        Some(StrategyPoint::new(
            position,
            time_midpoint(before_point.timestamp, after_point.timestamp),
            confidence,
            describe(shift_angle, before.direction, after.direction, wind_speed),
            PointKind::WindShift(WindShiftDetails {
                shift_angle,
                before_direction: before.direction,
                after_direction: after.direction,
                wind_speed,
                shift_probability: shift_probability(shift_angle, before, after),
            }),
        ))
    }
}
