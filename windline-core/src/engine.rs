//! Strategy Detection Engine
//!
//! Runs the enabled detectors over a course trace and wind field, scores the
//! candidates, collapses duplicates and ranks the result.
//!
//! ```text
//! course + field ─┬─ wind shifts (current + forecast) ─ score ─ dedup ─ threshold ─┐
//!                 ├─ tacks ─────────────────────────── score ─ dedup ──────────────┼─ rank
//!                 └─ laylines ──────────────────────── score ─ dedup ──────────────┘
//! ```
//!
//! Missing optional collaborators (VMG calculator, marks, predictor output)
//! never fail a run; they are reported in a [`DetectionOutcome::Degraded`].

use serde::{Deserialize, Serialize};

use crate::config::{DetectionConfig, DetectorSet};
use crate::dedup::filter_duplicates;
use crate::detectors::{
    forecast_wind_shifts, DegradationReason, LaylineDetector, TackDetector, WindShiftDetector,
};
use crate::error::Result;
use crate::geo::{CacheStats, GeoKernel};
use crate::scoring::{rank, StrategicScorer, WeightedScorer, WindContext};
use crate::strategy::{CourseTrace, StrategyPoint, VmgCalculator};
use crate::wind::{WindField, WindFieldSampler, WindPropagationPredictor};

/// Ranked points of one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionOutcome {
    /// Every enabled detector saw all of its input
    Complete { points: Vec<StrategyPoint> },
    /// Some stages were skipped or cut short
    Degraded {
        points: Vec<StrategyPoint>,
        reasons: Vec<DegradationReason>,
    },
}

impl DetectionOutcome {
    fn new(points: Vec<StrategyPoint>, reasons: Vec<DegradationReason>) -> Self {
        if reasons.is_empty() {
            DetectionOutcome::Complete { points }
        } else {
            DetectionOutcome::Degraded { points, reasons }
        }
    }

    pub fn points(&self) -> &[StrategyPoint] {
        match self {
            DetectionOutcome::Complete { points } | DetectionOutcome::Degraded { points, .. } => {
                points
            }
        }
    }

    pub fn into_points(self) -> Vec<StrategyPoint> {
        match self {
            DetectionOutcome::Complete { points } | DetectionOutcome::Degraded { points, .. } => {
                points
            }
        }
    }

    pub fn reasons(&self) -> &[DegradationReason] {
        match self {
            DetectionOutcome::Complete { .. } => &[],
            DetectionOutcome::Degraded { reasons, .. } => reasons,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, DetectionOutcome::Degraded { .. })
    }
}

/// Detection engine with its optional collaborators.
///
/// The geometry cache lives as long as the engine, so repeated runs over the
/// same course reuse distances and bearings.
pub struct StrategyEngine {
    config: DetectionConfig,
    predictor: Option<Box<dyn WindPropagationPredictor>>,
    vmg: Option<Box<dyn VmgCalculator>>,
    scorer: Box<dyn StrategicScorer>,
    geo: GeoKernel,
}

impl StrategyEngine {
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        let geo = GeoKernel::new(config.cache);
        Ok(StrategyEngine {
            config,
            predictor: None,
            vmg: None,
            scorer: Box::new(WeightedScorer),
            geo,
        })
    }

    pub fn with_predictor(mut self, predictor: impl WindPropagationPredictor + 'static) -> Self {
        self.predictor = Some(Box::new(predictor));
        self
    }

    pub fn with_vmg_calculator(mut self, vmg: impl VmgCalculator + 'static) -> Self {
        self.vmg = Some(Box::new(vmg));
        self
    }

    pub fn with_scorer(mut self, scorer: impl StrategicScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.geo.stats()
    }

    /// Detect, score, deduplicate and rank strategy points.
    ///
    /// Fails only on malformed input; see [`DetectionOutcome`] for partial
    /// results.
    pub fn detect(&mut self, course: &CourseTrace, field: &WindField) -> Result<DetectionOutcome> {
        course.validate()?;

        let StrategyEngine {
            config,
            predictor,
            vmg,
            scorer,
            geo,
        } = self;
        let predictor = predictor.as_deref();
        let vmg = vmg.as_deref();
        let scorer: &dyn StrategicScorer = &**scorer;

        let mut sampler = WindFieldSampler::with_predictor(field, predictor);
        let mut points = Vec::new();
        let mut reasons = Vec::new();

        if config.detectors.contains(DetectorSet::WIND_SHIFT) {
            let detector = WindShiftDetector::new(config.wind_shift.clone());
            let current = detector.detect(course, field);
            reasons.extend(current.reasons);

            let mut candidates = current.points;
            for point in &mut candidates {
                let wind = sampler.sample(point.position.lat, point.position.lon);
                scorer.score(point, &WindContext::from_sample(wind));
            }

            match predictor {
                Some(predictor) if config.propagation.enabled => {
                    let run = forecast_wind_shifts(
                        &detector,
                        course,
                        field,
                        predictor,
                        &config.propagation,
                    );
                    reasons.extend(run.failure);
                    for (time, forecast) in run.forecasts {
                        sampler.insert_forecast(time, forecast);
                    }
                    for mut point in run.points {
                        let context = WindContext::from_sample(sampler.sample_at(
                            point.position.lat,
                            point.position.lon,
                            point.time_estimate,
                        ));
                        scorer.score(&mut point, &context);
                        candidates.push(point);
                    }
                }
                None if config.propagation.enabled => {
                    log::debug!("no wind predictor, detecting on the current field only");
                }
                _ => {}
            }

            let shifts = filter_duplicates(candidates, geo);
            let before = shifts.len();
            points.extend(shifts.into_iter().filter(|point| {
                point
                    .as_wind_shift()
                    .is_some_and(|shift| shift.shift_probability >= config.confidence_threshold)
            }));
            log::debug!(
                "wind shifts: {} of {} above probability {}",
                points.len(),
                before,
                config.confidence_threshold
            );
        }

        if config.detectors.contains(DetectorSet::TACK) {
            let detection = TackDetector::new(config.tack.clone()).detect(course, field, vmg, geo);
            reasons.extend(detection.reasons);
            points.extend(score_and_filter(detection.points, scorer, &sampler, geo));
        }

        if config.detectors.contains(DetectorSet::LAYLINE) {
            let detection =
                LaylineDetector::new(config.layline.clone()).detect(course, field, vmg, geo);
            reasons.extend(detection.reasons);
            points.extend(score_and_filter(detection.points, scorer, &sampler, geo));
        }

        rank(&mut points);
        for reason in &reasons {
            log::warn!("detection degraded: {}", reason);
        }
        log::debug!(
            "detected {} strategy points over {} track points",
            points.len(),
            course.point_count()
        );
        Ok(DetectionOutcome::new(points, reasons))
    }
}

fn score_and_filter(
    mut points: Vec<StrategyPoint>,
    scorer: &dyn StrategicScorer,
    sampler: &WindFieldSampler<'_>,
    geo: &mut GeoKernel,
) -> Vec<StrategyPoint> {
    for point in &mut points {
        let wind = sampler.sample(point.position.lat, point.position.lon);
        scorer.score(point, &WindContext::from_sample(wind));
    }
    filter_duplicates(points, geo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::tests::course;
    use crate::error::{PredictionError, StrategyError};
    use crate::strategy::{Mark, MarkType, PointType, PolarAngles, PolarTable};
    use crate::wind::{grid_field, LinearTrendPredictor};
    use chrono::{DateTime, Utc};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Wind from 270° west of lon 0.5, 290° east of it
    fn split_field() -> WindField {
        grid_field(
            3,
            11,
            0.0,
            0.0,
            0.1,
            |_, c| if c <= 5 { 270.0 } else { 290.0 },
            |_, _| 12.0,
        )
    }

    fn shifts_only() -> DetectionConfig {
        DetectionConfig {
            confidence_threshold: 0.5,
            detectors: DetectorSet::WIND_SHIFT,
            ..Default::default()
        }
    }

    fn polar() -> PolarTable {
        PolarTable::new(
            vec![PolarAngles {
                wind_speed: 10.0,
                upwind_angle: 40.0,
                downwind_angle: 150.0,
            }],
            vec![Mark {
                id: "W1".to_string(),
                lat: 0.1,
                lon: 0.9,
                mark_type: MarkType::Windward,
            }],
        )
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DetectionConfig {
            confidence_threshold: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            StrategyEngine::new(config),
            Err(StrategyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_empty_course() {
        let mut engine = StrategyEngine::new(DetectionConfig::default()).unwrap();
        let result = engine.detect(&CourseTrace::default(), &split_field());
        assert_eq!(result, Err(StrategyError::EmptyCourse));
    }

    #[test]
    fn test_wind_shift_only_run_is_complete() {
        let mut engine = StrategyEngine::new(shifts_only()).unwrap();
        let trace = course(&[(0.1, 0.3), (0.1, 0.8)]);
        let outcome = engine.detect(&trace, &split_field()).unwrap();

        assert!(!outcome.is_degraded());
        assert_eq!(outcome.points().len(), 1);
        let point = &outcome.points()[0];
        assert_eq!(point.point_type(), PointType::WindShift);
        assert!(point.risk_score > 0.0 && point.risk_score <= 100.0);
        assert!(point.importance > 0.0 && point.importance <= 1.0);
        // The cell nearest the midpoint sits on the split
        assert!(point.confidence < 0.8);
    }

    #[test]
    fn test_threshold_drops_weak_shifts() {
        let mut engine = StrategyEngine::new(DetectionConfig {
            confidence_threshold: 0.9,
            detectors: DetectorSet::WIND_SHIFT,
            ..Default::default()
        })
        .unwrap();
        let trace = course(&[(0.1, 0.3), (0.1, 0.8)]);
        let outcome = engine.detect(&trace, &split_field()).unwrap();
        assert!(outcome.points().is_empty());
        assert!(!outcome.is_degraded());
    }

    #[test]
    fn test_forecast_duplicates_collapse() {
        // A persistence forecast repeats the shift at every lead time. The
        // current point (t=5 s) and the +300 s forecast are less than 300 s
        // apart and merge; later forecasts are exactly 300 s apart and don't.
        let mut engine = StrategyEngine::new(shifts_only())
            .unwrap()
            .with_predictor(LinearTrendPredictor {
                confidence_decay_per_hour: 0.0,
                ..Default::default()
            });
        let trace = course(&[(0.1, 0.3), (0.1, 0.8)]);
        let outcome = engine.detect(&trace, &split_field()).unwrap();

        assert!(!outcome.is_degraded());
        let mut times: Vec<i64> = outcome
            .points()
            .iter()
            .map(|p| p.time_estimate.timestamp())
            .collect();
        times.sort();
        assert_eq!(times, vec![5, 600, 900, 1200, 1500, 1800]);
    }

    #[test]
    fn test_each_forecast_predicted_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let predictor = move |time: DateTime<Utc>, current: &WindField| {
            counter.set(counter.get() + 1);
            LinearTrendPredictor::default().predict(time, current)
        };
        let mut engine = StrategyEngine::new(shifts_only())
            .unwrap()
            .with_predictor(predictor);
        let trace = course(&[(0.1, 0.3), (0.1, 0.8)]);
        let outcome = engine.detect(&trace, &split_field()).unwrap();

        assert!(!outcome.is_degraded());
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn test_predictor_failure_degrades_but_keeps_current_points() {
        let failing = |_: DateTime<Utc>, _: &WindField| {
            Err::<WindField, _>(PredictionError::Unavailable("offline".into()))
        };
        let mut engine = StrategyEngine::new(shifts_only()).unwrap().with_predictor(failing);
        let trace = course(&[(0.1, 0.3), (0.1, 0.8)]);
        let outcome = engine.detect(&trace, &split_field()).unwrap();

        assert!(outcome.is_degraded());
        assert_eq!(outcome.points().len(), 1);
        assert_eq!(outcome.points()[0].time_estimate.timestamp(), 5);
        assert!(matches!(
            outcome.reasons(),
            [DegradationReason::PropagationUnavailable { lead_secs: 300, .. }]
        ));
    }

    #[test]
    fn test_missing_vmg_calculator_degrades() {
        let mut engine = StrategyEngine::new(DetectionConfig {
            confidence_threshold: 0.5,
            ..Default::default()
        })
        .unwrap();
        let trace = course(&[(0.1, 0.3), (0.1, 0.8)]);
        let outcome = engine.detect(&trace, &split_field()).unwrap();

        assert!(outcome.is_degraded());
        assert_eq!(
            outcome.reasons(),
            &[
                DegradationReason::NoVmgCalculator {
                    detector: PointType::Tack
                },
                DegradationReason::NoVmgCalculator {
                    detector: PointType::Layline
                },
            ]
        );
        // Wind shifts are still reported
        assert_eq!(outcome.points().len(), 1);
    }

    #[test]
    fn test_ranked_output_invariants() {
        let mut engine = StrategyEngine::new(DetectionConfig {
            confidence_threshold: 0.5,
            detectors: DetectorSet::WIND_SHIFT | DetectorSet::LAYLINE,
            ..Default::default()
        })
        .unwrap()
        .with_vmg_calculator(polar());
        let trace = course(&[(0.1, 0.3), (0.1, 0.8)]);
        let outcome = engine.detect(&trace, &split_field()).unwrap();

        for pair in outcome.points().windows(2) {
            assert!(pair[0].importance >= pair[1].importance);
        }
        for point in outcome.points() {
            assert!((0.0..=100.0).contains(&point.risk_score));
            assert!((0.0..=1.0).contains(&point.confidence));
            assert!((0.0..=1.0).contains(&point.importance));
        }
    }

    #[test]
    fn test_cache_reused_across_runs() {
        let mut engine = StrategyEngine::new(DetectionConfig::default())
            .unwrap()
            .with_vmg_calculator(polar());
        let trace = course(&[(0.1, 0.3), (0.1, 0.5), (0.1, 0.8)]);
        let field = split_field();
        engine.detect(&trace, &field).unwrap();
        let first = engine.cache_stats();
        let outcome = engine.detect(&trace, &field).unwrap();
        let second = engine.cache_stats();
        assert!(second.hits > first.hits);
        assert!(outcome.points().iter().all(|p| p.importance <= 1.0));
    }

    #[test]
    fn test_outcome_serializes_with_status() {
        let outcome = DetectionOutcome::new(Vec::new(), vec![DegradationReason::NoMarks]);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "degraded");
        assert_eq!(value["reasons"][0]["reason"], "no_marks");

        let complete = DetectionOutcome::new(Vec::new(), Vec::new());
        assert_eq!(serde_json::to_value(&complete).unwrap()["status"], "complete");
    }
}
