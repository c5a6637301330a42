//! Course Trace
//!
//! The recorded track of one boat, split into legs. Read-only input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrategyError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
}

impl PathPoint {
    pub fn new(lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Self {
        PathPoint { lat, lon, timestamp }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub path_points: Vec<PathPoint>,
}

impl Leg {
    pub fn new(path_points: Vec<PathPoint>) -> Self {
        Leg { path_points }
    }

    /// A leg needs two points before anything can be detected on it
    pub fn is_analyzable(&self) -> bool {
        self.path_points.len() >= 2
    }

    pub fn first(&self) -> Option<&PathPoint> {
        self.path_points.first()
    }

    pub fn last(&self) -> Option<&PathPoint> {
        self.path_points.last()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseTrace {
    pub legs: Vec<Leg>,
}

impl CourseTrace {
    pub fn new(legs: Vec<Leg>) -> Self {
        CourseTrace { legs }
    }

    /// Total number of path points across all legs
    pub fn point_count(&self) -> usize {
        self.legs.iter().map(|leg| leg.path_points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }

    /// Reject traces without a single path point
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(StrategyError::EmptyCourse);
        }
        Ok(())
    }

    /// Legs with at least two path points, with their index in the trace
    pub fn analyzable_legs(&self) -> impl Iterator<Item = (usize, &Leg)> {
        self.legs.iter().enumerate().filter(|(index, leg)| {
            if leg.is_analyzable() {
                true
            } else {
                log::debug!(
                    "leg {} has {} path points, skipping",
                    index,
                    leg.path_points.len()
                );
                false
            }
        })
    }
}
