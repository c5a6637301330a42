//! Duplicate Point Filtering
//!
//! Several detections of the same strategic event (neighbouring track
//! samples, current and forecast runs) are collapsed into one representative.
//!
//! # Same-event predicate
//!
//! | Type       | Condition                                                   |
//! |------------|-------------------------------------------------------------|
//! | Wind shift | distance < 300 m, Δt < 300 s, Δshift angle < 15°            |
//! | Tack       | distance < 200 m, Δvmg gain < 0.05                          |
//! | Layline    | same mark, distance < 300 m                                 |
//!
//! Points of different types never match.
//!
//! # Clustering
//!
//! Clusters are the connected components of the predicate graph over a fixed
//! snapshot of the candidates (single-link). A chain A~B~C forms one cluster
//! even when A and C do not match directly. Each cluster keeps its member
//! with the highest quality: shift probability, VMG gain or confidence.

use std::cmp::Ordering;

use petgraph::unionfind::UnionFind;

use crate::geo::{angle_difference, GeoKernel};
use crate::strategy::{PointKind, StrategyPoint};

pub const WIND_SHIFT_MAX_DISTANCE_M: f64 = 300.0;
pub const WIND_SHIFT_MAX_TIME_SECS: f64 = 300.0;
pub const WIND_SHIFT_MAX_ANGLE_DIFF: f64 = 15.0;
pub const TACK_MAX_DISTANCE_M: f64 = 200.0;
pub const TACK_MAX_VMG_GAIN_DIFF: f64 = 0.05;
pub const LAYLINE_MAX_DISTANCE_M: f64 = 300.0;

/// Whether `a` and `b` describe the same strategic event
pub fn same_event(a: &StrategyPoint, b: &StrategyPoint, geo: &mut GeoKernel) -> bool {
    let distance = || (a.position.lat, a.position.lon, b.position.lat, b.position.lon);
    match (&a.kind, &b.kind) {
        (PointKind::WindShift(sa), PointKind::WindShift(sb)) => {
            let dt = (a.time_estimate - b.time_estimate).num_milliseconds().abs() as f64 / 1000.0;
            let dangle = angle_difference(sa.shift_angle, sb.shift_angle).abs();
            if dt >= WIND_SHIFT_MAX_TIME_SECS || dangle >= WIND_SHIFT_MAX_ANGLE_DIFF {
                return false;
            }
            let (lat1, lon1, lat2, lon2) = distance();
            geo.distance(lat1, lon1, lat2, lon2) < WIND_SHIFT_MAX_DISTANCE_M
        }
        (PointKind::Tack(ta), PointKind::Tack(tb)) => {
            if (ta.vmg_gain - tb.vmg_gain).abs() >= TACK_MAX_VMG_GAIN_DIFF {
                return false;
            }
            let (lat1, lon1, lat2, lon2) = distance();
            geo.distance(lat1, lon1, lat2, lon2) < TACK_MAX_DISTANCE_M
        }
        (PointKind::Layline(la), PointKind::Layline(lb)) => {
            if la.mark_id != lb.mark_id {
                return false;
            }
            let (lat1, lon1, lat2, lon2) = distance();
            geo.distance(lat1, lon1, lat2, lon2) < LAYLINE_MAX_DISTANCE_M
        }
        _ => false,
    }
}

/// Value a cluster representative is chosen by
pub fn quality(point: &StrategyPoint) -> f64 {
    match &point.kind {
        PointKind::WindShift(shift) => shift.shift_probability,
        PointKind::Tack(tack) => tack.vmg_gain,
        PointKind::Layline(_) => point.confidence,
    }
}

/// Total order used to pick a representative; greater is better.
///
/// Quality first, then earlier time, then position, so the choice depends
/// only on the points' values and not on their input order.
fn preference(a: &StrategyPoint, b: &StrategyPoint) -> Ordering {
    quality(a)
        .total_cmp(&quality(b))
        .then_with(|| b.time_estimate.cmp(&a.time_estimate))
        .then_with(|| b.position.lat.total_cmp(&a.position.lat))
        .then_with(|| b.position.lon.total_cmp(&a.position.lon))
        .then_with(|| a.confidence.total_cmp(&b.confidence))
        .then_with(|| a.risk_score.total_cmp(&b.risk_score))
        .then_with(|| b.description.cmp(&a.description))
}

/// Group candidate indices into same-event clusters.
///
/// Clusters are ordered by their first member; members ascend.
pub fn clusters(points: &[StrategyPoint], geo: &mut GeoKernel) -> Vec<Vec<usize>> {
    let mut sets = UnionFind::<usize>::new(points.len());
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            if same_event(&points[i], &points[j], geo) {
                sets.union(i, j);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot_of_root = vec![usize::MAX; points.len()];
    for i in 0..points.len() {
        let root = sets.find_mut(i);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = groups.len();
            groups.push(Vec::new());
        }
        groups[slot_of_root[root]].push(i);
    }
    groups
}

/// Keep one representative per same-event cluster.
pub fn filter_duplicates(points: Vec<StrategyPoint>, geo: &mut GeoKernel) -> Vec<StrategyPoint> {
    let groups = clusters(&points, geo);
    let before = points.len();

    let mut keep = vec![false; points.len()];
    for group in &groups {
        let best = group
            .iter()
            .copied()
            .max_by(|&a, &b| preference(&points[a], &points[b]));
        if let Some(best) = best {
            keep[best] = true;
        }
    }

    let kept: Vec<StrategyPoint> = points
        .into_iter()
        .zip(keep)
        .filter_map(|(point, keep)| keep.then_some(point))
        .collect();
    log::debug!("duplicate filter: {} candidates -> {} clusters", before, kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{LaylineDetails, Position, TackDetails, TackSide, WindShiftDetails};
    use chrono::{TimeZone, Utc};

    fn shift(lat: f64, lon: f64, secs: i64, angle: f64, probability: f64) -> StrategyPoint {
        StrategyPoint::new(
            Position::new(lat, lon),
            Utc.timestamp_opt(secs, 0).unwrap(),
            0.8,
            format!("shift {}", angle),
            PointKind::WindShift(WindShiftDetails {
                shift_angle: angle,
                before_direction: 270.0,
                after_direction: 270.0 + angle,
                wind_speed: 12.0,
                shift_probability: probability,
            }),
        )
    }

    fn tack(lat: f64, lon: f64, gain: f64) -> StrategyPoint {
        StrategyPoint::new(
            Position::new(lat, lon),
            Utc.timestamp_opt(0, 0).unwrap(),
            0.8,
            "tack".to_string(),
            PointKind::Tack(TackDetails {
                tack_type: TackSide::Port,
                vmg_gain: gain,
                timing_sensitivity: 0.5,
            }),
        )
    }

    fn layline(lat: f64, lon: f64, mark: &str, confidence: f64) -> StrategyPoint {
        StrategyPoint::new(
            Position::new(lat, lon),
            Utc.timestamp_opt(0, 0).unwrap(),
            confidence,
            "layline".to_string(),
            PointKind::Layline(LaylineDetails {
                mark_id: mark.to_string(),
                mark_distance: 500.0,
                approach_angle: 45.0,
                traffic_factor: 0.5,
                tack: TackSide::Starboard,
            }),
        )
    }

    fn probabilities(points: &[StrategyPoint]) -> Vec<f64> {
        let mut p: Vec<f64> = points
            .iter()
            .map(|p| p.as_wind_shift().unwrap().shift_probability)
            .collect();
        p.sort_by(f64::total_cmp);
        p
    }

    #[test]
    fn test_three_point_scenario() {
        let points = vec![
            shift(35.450, 139.650, 0, 10.0, 0.7),
            shift(35.4501, 139.6501, 10, 12.0, 0.8),
            shift(35.460, 139.660, 300, 45.0, 0.9),
        ];
        let mut geo = GeoKernel::default();
        let filtered = filter_duplicates(points, &mut geo);
        assert_eq!(filtered.len(), 2);
        assert_eq!(probabilities(&filtered), vec![0.8, 0.9]);
    }

    #[test]
    fn test_wind_shift_thresholds() {
        let mut geo = GeoKernel::default();
        let a = shift(0.0, 0.0, 0, 10.0, 0.7);

        // 299 s apart matches, 300 s does not
        assert!(same_event(&a, &shift(0.0, 0.0, 299, 10.0, 0.7), &mut geo));
        assert!(!same_event(&a, &shift(0.0, 0.0, 300, 10.0, 0.7), &mut geo));

        // Angle difference across the ±180 wrap
        let b = shift(0.0, 0.0, 0, 178.0, 0.7);
        assert!(same_event(&b, &shift(0.0, 0.0, 0, -175.0, 0.7), &mut geo));
        assert!(!same_event(&a, &shift(0.0, 0.0, 0, 25.0, 0.7), &mut geo));

        // ~278 m north matches, ~334 m does not
        assert!(same_event(&a, &shift(0.0025, 0.0, 0, 10.0, 0.7), &mut geo));
        assert!(!same_event(&a, &shift(0.003, 0.0, 0, 10.0, 0.7), &mut geo));
    }

    #[test]
    fn test_tack_thresholds() {
        let mut geo = GeoKernel::default();
        let a = tack(0.0, 0.0, 0.20);
        assert!(same_event(&a, &tack(0.0015, 0.0, 0.24), &mut geo));
        assert!(!same_event(&a, &tack(0.0015, 0.0, 0.26), &mut geo));
        // ~222 m apart
        assert!(!same_event(&a, &tack(0.002, 0.0, 0.20), &mut geo));
    }

    #[test]
    fn test_layline_requires_same_mark() {
        let mut geo = GeoKernel::default();
        let a = layline(0.0, 0.0, "W1", 0.8);
        assert!(same_event(&a, &layline(0.001, 0.0, "W1", 0.6), &mut geo));
        assert!(!same_event(&a, &layline(0.001, 0.0, "L1", 0.6), &mut geo));
    }

    #[test]
    fn test_types_never_merge() {
        let mut geo = GeoKernel::default();
        let points = vec![
            shift(0.0, 0.0, 0, 10.0, 0.7),
            tack(0.0, 0.0, 0.2),
            layline(0.0, 0.0, "W1", 0.8),
        ];
        assert_eq!(filter_duplicates(points, &mut geo).len(), 3);
    }

    #[test]
    fn test_keeps_highest_quality() {
        let mut geo = GeoKernel::default();
        let tacks = filter_duplicates(
            vec![tack(0.0, 0.0, 0.20), tack(0.0005, 0.0, 0.23), tack(0.001, 0.0, 0.21)],
            &mut geo,
        );
        assert_eq!(tacks.len(), 1);
        assert_eq!(tacks[0].as_tack().unwrap().vmg_gain, 0.23);

        let laylines = filter_duplicates(
            vec![layline(0.0, 0.0, "W1", 0.5), layline(0.001, 0.0, "W1", 0.9)],
            &mut geo,
        );
        assert_eq!(laylines.len(), 1);
        assert_eq!(laylines[0].confidence, 0.9);
    }

    #[test]
    fn test_single_link_chain_merges() {
        // A~B and B~C, but A and C are ~445 m apart
        let a = shift(0.0, 0.0, 0, 10.0, 0.6);
        let b = shift(0.002, 0.0, 0, 10.0, 0.7);
        let c = shift(0.004, 0.0, 0, 10.0, 0.9);
        let mut geo = GeoKernel::default();
        assert!(same_event(&a, &b, &mut geo));
        assert!(same_event(&b, &c, &mut geo));
        assert!(!same_event(&a, &c, &mut geo));

        let filtered = filter_duplicates(vec![a, b, c], &mut geo);
        assert_eq!(filtered.len(), 1);
        assert_eq!(probabilities(&filtered), vec![0.9]);
    }

    #[test]
    fn test_chain_through_angle() {
        // Angles 0, 10, 20: ends differ by 20° but chain through 10°
        let points = vec![
            shift(0.0, 0.0, 0, 0.0, 0.5),
            shift(0.0, 0.0, 0, 20.0, 0.6),
            shift(0.0, 0.0, 0, 10.0, 0.7),
        ];
        let mut geo = GeoKernel::default();
        let groups = clusters(&points, &mut geo);
        assert_eq!(groups, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_idempotent() {
        let points = vec![
            shift(35.450, 139.650, 0, 10.0, 0.7),
            shift(35.4501, 139.6501, 10, 12.0, 0.8),
            shift(35.460, 139.660, 300, 45.0, 0.9),
            shift(35.4602, 139.6601, 320, 40.0, 0.75),
            tack(35.45, 139.65, 0.2),
            tack(35.4505, 139.65, 0.22),
            layline(35.47, 139.66, "W1", 0.7),
        ];
        let mut geo = GeoKernel::default();
        let once = filter_duplicates(points, &mut geo);
        let twice = filter_duplicates(once.clone(), &mut geo);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_order_independent() {
        let points = vec![
            shift(35.450, 139.650, 0, 10.0, 0.7),
            shift(35.4501, 139.6501, 10, 12.0, 0.8),
            shift(35.4502, 139.6502, 20, 14.0, 0.8),
            shift(35.460, 139.660, 300, 45.0, 0.9),
            tack(35.45, 139.65, 0.2),
            tack(35.4505, 139.65, 0.22),
            layline(35.47, 139.66, "W1", 0.7),
            layline(35.4705, 139.66, "W1", 0.7),
        ];
        let mut geo = GeoKernel::default();
        let reference = sorted(filter_duplicates(points.clone(), &mut geo));

        // Every rotation and the reversal of the input
        for shift_by in 0..points.len() {
            let mut rotated = points.clone();
            rotated.rotate_left(shift_by);
            assert_eq!(sorted(filter_duplicates(rotated, &mut geo)), reference);
        }
        let mut reversed = points;
        reversed.reverse();
        assert_eq!(sorted(filter_duplicates(reversed, &mut geo)), reference);
    }

    fn sorted(mut points: Vec<StrategyPoint>) -> Vec<StrategyPoint> {
        points.sort_by(|a, b| {
            a.point_type()
                .cmp(&b.point_type())
                .then_with(|| a.time_estimate.cmp(&b.time_estimate))
                .then_with(|| a.position.lat.total_cmp(&b.position.lat))
                .then_with(|| a.position.lon.total_cmp(&b.position.lon))
        });
        points
    }

    #[test]
    fn test_empty_input() {
        let mut geo = GeoKernel::default();
        assert!(filter_duplicates(Vec::new(), &mut geo).is_empty());
        assert!(clusters(&[], &mut geo).is_empty());
    }

    #[test]
    fn test_clusters_follow_union_find_components() {
        // 0~1~5~3~4 in ~167 m steps, 2 is far away
        let points = vec![
            tack(0.0, 0.0, 0.20),
            tack(0.0015, 0.0, 0.20),
            tack(0.05, 0.0, 0.20),
            tack(0.0045, 0.0, 0.20),
            tack(0.006, 0.0, 0.20),
            tack(0.003, 0.0, 0.20),
        ];
        let mut geo = GeoKernel::default();
        assert_eq!(clusters(&points, &mut geo), vec![vec![0, 1, 3, 4, 5], vec![2]]);
    }
}
