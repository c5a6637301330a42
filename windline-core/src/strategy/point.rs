//! Strategy Point Types
//!
//! A [`StrategyPoint`] carries the fields shared by every detection plus a
//! [`PointKind`] payload for the variant-specific fields. Serialized, a point
//! is one flat record with a `type` discriminator:
//!
//! ```json
//! {
//!   "lat": 35.45, "lon": 139.65,
//!   "time_estimate": "2024-05-01T10:00:05Z",
//!   "risk_score": 32.0, "confidence": 0.8, "importance": 0.5,
//!   "description": "Wind veer of 12.0° (270° → 282°) at 14.2 kn",
//!   "alternatives": [],
//!   "type": "wind_shift",
//!   "shift_angle": 12.0, "before_direction": 270.0, "after_direction": 282.0,
//!   "wind_speed": 14.2, "shift_probability": 0.75
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side the wind comes over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TackSide {
    /// Wind over the port (left) side
    Port,
    /// Wind over the starboard (right) side
    Starboard,
}

impl TackSide {
    pub fn opposite(self) -> TackSide {
        match self {
            TackSide::Port => TackSide::Starboard,
            TackSide::Starboard => TackSide::Port,
        }
    }
}

impl std::fmt::Display for TackSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TackSide::Port => write!(f, "port"),
            TackSide::Starboard => write!(f, "starboard"),
        }
    }
}

/// Discriminator of a [`PointKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    WindShift,
    Tack,
    Layline,
}

impl std::fmt::Display for PointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointType::WindShift => write!(f, "wind_shift"),
            PointType::Tack => write!(f, "tack"),
            PointType::Layline => write!(f, "layline"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Position { lat, lon }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindShiftDetails {
    /// Signed shift, positive for a clockwise veer, `(-180, 180]`
    pub shift_angle: f64,
    pub before_direction: f64,
    pub after_direction: f64,
    /// Knots
    pub wind_speed: f64,
    /// `[0, 1]`
    pub shift_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TackDetails {
    /// Tack recommended from this point on
    pub tack_type: TackSide,
    /// Gain in velocity made on course, as a fraction of boat speed
    pub vmg_gain: f64,
    /// `[0, 1]`
    pub timing_sensitivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaylineDetails {
    pub mark_id: String,
    /// Meters
    pub mark_distance: f64,
    /// Bearing from the point to the mark
    pub approach_angle: f64,
    /// `[0, 1]`
    pub traffic_factor: f64,
    /// Which layline the point lies on
    pub tack: TackSide,
}

/// Variant-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointKind {
    WindShift(WindShiftDetails),
    Tack(TackDetails),
    Layline(LaylineDetails),
}

impl PointKind {
    pub fn point_type(&self) -> PointType {
        match self {
            PointKind::WindShift(_) => PointType::WindShift,
            PointKind::Tack(_) => PointType::Tack,
            PointKind::Layline(_) => PointType::Layline,
        }
    }
}

/// A detected strategic decision point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPoint {
    #[serde(flatten)]
    pub position: Position,
    pub time_estimate: DateTime<Utc>,
    /// `[0, 100]`
    pub risk_score: f64,
    /// `[0, 1]`
    pub confidence: f64,
    /// `[0, 1]`, set by the ranking pass
    pub importance: f64,
    pub description: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(flatten)]
    pub kind: PointKind,
}

impl StrategyPoint {
    pub fn new(
        position: Position,
        time_estimate: DateTime<Utc>,
        confidence: f64,
        description: String,
        kind: PointKind,
    ) -> Self {
        StrategyPoint {
            position,
            time_estimate,
            risk_score: 0.0,
            confidence: confidence.clamp(0.0, 1.0),
            importance: 0.0,
            description,
            alternatives: Vec::new(),
            kind,
        }
    }

    pub fn point_type(&self) -> PointType {
        self.kind.point_type()
    }

    pub fn as_wind_shift(&self) -> Option<&WindShiftDetails> {
        match &self.kind {
            PointKind::WindShift(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_wind_shift_mut(&mut self) -> Option<&mut WindShiftDetails> {
        match &mut self.kind {
            PointKind::WindShift(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_tack(&self) -> Option<&TackDetails> {
        match &self.kind {
            PointKind::Tack(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_layline(&self) -> Option<&LaylineDetails> {
        match &self.kind {
            PointKind::Layline(details) => Some(details),
            _ => None,
        }
    }
}
