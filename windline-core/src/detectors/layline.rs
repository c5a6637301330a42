//! Layline Detection
//!
//! For every course mark, the two laylines are the bearings on which a boat
//! close-hauled on either tack fetches the mark:
//!
//! - starboard: `wind - (upwind_angle + safety_margin)`
//! - port: `wind + (upwind_angle + safety_margin)`
//!
//! A track point whose bearing to the mark is within `threshold_angle` of
//! either layline is a layline point, tagged with the nearer one.

use std::collections::HashSet;

use super::{DegradationReason, Detection};
use crate::config::LaylineConfig;
use crate::geo::{angle_difference, normalize_angle, GeoKernel};
use crate::strategy::{
    CourseTrace, LaylineDetails, Mark, PathPoint, PointKind, PointType, Position, StrategyPoint,
    TackSide, VmgCalculator,
};
use crate::wind::{sample, WindField, WindSample};

/// Closer than this the bearing to a mark is meaningless (meters)
const MIN_MARK_DISTANCE_M: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct LaylineDetector {
    config: LaylineConfig,
}

/// Starboard and port layline bearings for a wind direction and upwind angle
pub fn layline_bearings(wind: f64, upwind_angle: f64, safety_margin: f64) -> (f64, f64) {
    let offset = upwind_angle + safety_margin;
    (normalize_angle(wind - offset), normalize_angle(wind + offset))
}

impl LaylineDetector {
    pub fn new(config: LaylineConfig) -> Self {
        LaylineDetector { config }
    }

    pub fn detect(
        &self,
        course: &CourseTrace,
        field: &WindField,
        vmg: Option<&dyn VmgCalculator>,
        geo: &mut GeoKernel,
    ) -> Detection {
        let Some(vmg) = vmg else {
            log::warn!("layline detection needs a VMG calculator, skipping");
            return Detection::degraded(DegradationReason::NoVmgCalculator {
                detector: PointType::Layline,
            });
        };
        let marks = vmg.marks();
        if marks.is_empty() {
            log::warn!("layline detection needs course marks, none known");
            return Detection::degraded(DegradationReason::NoMarks);
        }

        let mut detection = Detection::default();
        // (leg, point) pairs without wind, counted once however many marks are near
        let mut off_field = HashSet::new();

        for mark in marks {
            let mark_wind = sample(mark.lat, mark.lon, field);
            if mark_wind.is_none() {
                log::debug!("mark {} is outside the wind field, using track wind", mark.id);
            }

            for (leg_index, leg) in course.analyzable_legs() {
                for (point_index, point) in leg.path_points.iter().enumerate() {
                    let mark_distance = geo.distance(point.lat, point.lon, mark.lat, mark.lon);
                    if mark_distance > self.config.max_mark_distance
                        || mark_distance < MIN_MARK_DISTANCE_M
                    {
                        continue;
                    }
                    // Points outside the field are never reported, even with wind at the mark
                    let Some(point_wind) = sample(point.lat, point.lon, field) else {
                        off_field.insert((leg_index, point_index));
                        continue;
                    };
                    let wind = mark_wind.unwrap_or(point_wind);
                    let layline = self.evaluate(mark, point, mark_distance, &wind, vmg, geo);
                    detection.points.extend(layline);
                }
            }
        }

        detection.note_skipped(PointType::Layline, off_field.len());
        log::debug!(
            "layline detection: {} candidates for {} marks",
            detection.points.len(),
            marks.len()
        );
        detection
    }

    fn evaluate(
        &self,
        mark: &Mark,
        point: &PathPoint,
        mark_distance: f64,
        wind: &WindSample,
        vmg: &dyn VmgCalculator,
        geo: &mut GeoKernel,
    ) -> Option<StrategyPoint> {
        let angles = vmg.optimal_vmg_angles(wind.speed);
        let (starboard, port) =
            layline_bearings(wind.direction, angles.upwind_angle, self.config.safety_margin);

        let to_mark = geo.bearing(point.lat, point.lon, mark.lat, mark.lon);
        let off_starboard = angle_difference(to_mark, starboard).abs();
        let off_port = angle_difference(to_mark, port).abs();
        let (tack, offset) = if off_starboard <= off_port {
            (TackSide::Starboard, off_starboard)
        } else {
            (TackSide::Port, off_port)
        };
        if offset >= self.config.threshold_angle {
            return None;
        }

        let confidence = wind.confidence * (1.0 - 0.5 * offset / self.config.threshold_angle);
        let traffic_factor = (1.0 - mark_distance / self.config.max_mark_distance).clamp(0.0, 1.0);
        let description = format!(
            "{} layline to mark {}, {:.0} m out (bearing {:.0}°, {:.1}° off)",
            match tack {
                TackSide::Starboard => "Starboard",
                TackSide::Port => "Port",
            },
            mark.id,
            mark_distance,
            to_mark,
            offset
        );

        Some(StrategyPoint::new(
            Position::new(point.lat, point.lon),
            point.timestamp,
            confidence,
            description,
            PointKind::Layline(LaylineDetails {
                mark_id: mark.id.clone(),
                mark_distance,
                approach_angle: to_mark,
                traffic_factor,
                tack,
            }),
        ))
    }
}
