//! Strategy Data Model
//!
//! Inputs (course trace, VMG calculator) and outputs (strategy points) of the
//! detection engine.

mod course;
mod point;
mod vmg;

pub use course::{CourseTrace, Leg, PathPoint};
pub use point::{
    LaylineDetails, PointKind, PointType, Position, StrategyPoint, TackDetails, TackSide,
    WindShiftDetails,
};
pub use vmg::{
    Mark, MarkType, PolarAngles, PolarTable, VmgAngles, VmgCalculator, DEFAULT_DOWNWIND_ANGLE,
    DEFAULT_UPWIND_ANGLE,
};
