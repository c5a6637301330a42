//! Windline Core
//!
//! Platform-independent detection of strategic decision points on a sailing
//! race course: wind shifts, tacks and layline approaches, found by walking a
//! recorded GPS track through a gridded wind field.
//!
//! This crate does no I/O. Callers build a [`CourseTrace`] and a
//! [`WindField`], optionally attach a [`VmgCalculator`] and a
//! [`WindPropagationPredictor`], and get back a ranked, deduplicated list of
//! [`StrategyPoint`]s.
//!
//! ```no_run
//! use windline_core::{DetectionConfig, StrategyEngine, PolarTable};
//! # fn run(course: windline_core::CourseTrace, field: windline_core::WindField, polar: PolarTable)
//! #     -> windline_core::Result<()> {
//! let mut engine = StrategyEngine::new(DetectionConfig::default())?.with_vmg_calculator(polar);
//! let outcome = engine.detect(&course, &field)?;
//! for point in outcome.points() {
//!     println!("{:.0} {}", point.risk_score, point.description);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`geo`]: great-circle geometry with a bounded memo cache
//! - [`wind`]: wind field, sampling and forecast interface
//! - [`strategy`]: course trace, VMG calculator and output point types
//! - [`detectors`]: wind shift, forecast, tack and layline detectors
//! - [`scoring`]: risk scoring and ranking
//! - [`dedup`]: same-event clustering
//! - [`engine`]: the orchestrating [`StrategyEngine`]

pub mod config;
pub mod dedup;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod geo;
pub mod scoring;
pub mod strategy;
pub mod wind;

pub use config::{
    DetectionConfig, DetectorSet, LaylineConfig, PropagationConfig, TackConfig, WindShiftConfig,
};
pub use detectors::DegradationReason;
pub use engine::{DetectionOutcome, StrategyEngine};
pub use error::{PredictionError, Result, StrategyError};
pub use geo::{CacheStats, CacheStrategy, GeoKernel};
pub use scoring::{StrategicScorer, WeightedScorer, WindContext};
pub use strategy::{
    CourseTrace, Leg, Mark, MarkType, PathPoint, PointKind, PointType, PolarAngles, PolarTable,
    Position, StrategyPoint, TackSide, VmgAngles, VmgCalculator,
};
pub use wind::{
    LinearTrendPredictor, WindField, WindFieldData, WindFieldSampler, WindPropagationPredictor,
    WindSample,
};
