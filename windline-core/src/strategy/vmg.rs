//! VMG Calculator
//!
//! Tack and layline detection need the boat's optimal sailing angles and the
//! course marks. Both come from a [`VmgCalculator`]; [`PolarTable`] is the
//! bundled implementation, interpolating a table of optimal angles by wind
//! speed.

use serde::{Deserialize, Serialize};

/// Fallback upwind true wind angle when a polar table has no entries
pub const DEFAULT_UPWIND_ANGLE: f64 = 42.0;

/// Fallback downwind true wind angle when a polar table has no entries
pub const DEFAULT_DOWNWIND_ANGLE: f64 = 150.0;

/// Optimal true wind angles for maximum VMG, degrees off the wind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VmgAngles {
    pub upwind_angle: f64,
    pub downwind_angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkType {
    Windward,
    Leeward,
    Gate,
    Start,
    Finish,
    #[serde(other)]
    Other,
}

/// A course mark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type")]
    pub mark_type: MarkType,
}

/// Boat performance and course knowledge
pub trait VmgCalculator {
    /// Optimal upwind/downwind angles at `wind_speed` knots
    fn optimal_vmg_angles(&self, wind_speed: f64) -> VmgAngles;

    /// Course marks, empty when unknown
    fn marks(&self) -> &[Mark] {
        &[]
    }
}

/// One row of a polar table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarAngles {
    /// Knots
    pub wind_speed: f64,
    pub upwind_angle: f64,
    pub downwind_angle: f64,
}

/// Optimal angles by wind speed, plus the course marks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarTable {
    angles: Vec<PolarAngles>,
    #[serde(default)]
    marks: Vec<Mark>,
}

impl PolarTable {
    pub fn new(mut angles: Vec<PolarAngles>, marks: Vec<Mark>) -> Self {
        angles.sort_by(|a, b| a.wind_speed.total_cmp(&b.wind_speed));
        PolarTable { angles, marks }
    }

    /// Table rows sorted by wind speed
    pub fn angles(&self) -> &[PolarAngles] {
        &self.angles
    }

    /// Re-sort rows after deserialization
    pub fn normalized(self) -> Self {
        PolarTable::new(self.angles, self.marks)
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

impl VmgCalculator for PolarTable {
    /// Linear interpolation between rows, clamped at the table ends
    fn optimal_vmg_angles(&self, wind_speed: f64) -> VmgAngles {
        let (Some(first), Some(last)) = (self.angles.first(), self.angles.last()) else {
            return VmgAngles {
                upwind_angle: DEFAULT_UPWIND_ANGLE,
                downwind_angle: DEFAULT_DOWNWIND_ANGLE,
            };
        };
        if wind_speed <= first.wind_speed {
            return VmgAngles {
                upwind_angle: first.upwind_angle,
                downwind_angle: first.downwind_angle,
            };
        }
        if wind_speed >= last.wind_speed {
            return VmgAngles {
                upwind_angle: last.upwind_angle,
                downwind_angle: last.downwind_angle,
            };
        }

        let upper = self
            .angles
            .iter()
            .position(|row| row.wind_speed >= wind_speed)
            .unwrap_or(self.angles.len() - 1);
        let hi = &self.angles[upper];
        let lo = &self.angles[upper.saturating_sub(1)];
        let span = hi.wind_speed - lo.wind_speed;
        let t = if span > 0.0 {
            (wind_speed - lo.wind_speed) / span
        } else {
            0.0
        };
        VmgAngles {
            upwind_angle: lerp(lo.upwind_angle, hi.upwind_angle, t),
            downwind_angle: lerp(lo.downwind_angle, hi.downwind_angle, t),
        }
    }

    fn marks(&self) -> &[Mark] {
        &self.marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PolarTable {
        PolarTable::new(
            vec![
                PolarAngles {
                    wind_speed: 16.0,
                    upwind_angle: 38.0,
                    downwind_angle: 160.0,
                },
                PolarAngles {
                    wind_speed: 6.0,
                    upwind_angle: 46.0,
                    downwind_angle: 140.0,
                },
            ],
            vec![],
        )
    }

    #[test]
    fn test_interpolation() {
        let angles = table().optimal_vmg_angles(11.0);
        assert!((angles.upwind_angle - 42.0).abs() < 1e-9);
        assert!((angles.downwind_angle - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamped_at_ends() {
        assert_eq!(table().optimal_vmg_angles(2.0).upwind_angle, 46.0);
        assert_eq!(table().optimal_vmg_angles(30.0).downwind_angle, 160.0);
    }

    #[test]
    fn test_empty_table_uses_defaults() {
        let angles = PolarTable::default().optimal_vmg_angles(10.0);
        assert_eq!(angles.upwind_angle, DEFAULT_UPWIND_ANGLE);
        assert_eq!(angles.downwind_angle, DEFAULT_DOWNWIND_ANGLE);
        assert!(PolarTable::default().marks().is_empty());
    }

    #[test]
    fn test_polar_from_json() {
        let json = r#"{
            "angles": [
                {"wind_speed": 20, "upwind_angle": 36, "downwind_angle": 165},
                {"wind_speed": 8, "upwind_angle": 44, "downwind_angle": 145}
            ],
            "marks": [
                {"id": "W1", "lat": 35.47, "lon": 139.66, "type": "windward"},
                {"id": "X", "lat": 35.44, "lon": 139.66, "type": "offset"}
            ]
        }"#;
        let polar: PolarTable = serde_json::from_str::<PolarTable>(json).unwrap().normalized();
        assert_eq!(polar.angles()[0].wind_speed, 8.0);
        assert_eq!(polar.marks().len(), 2);
        assert_eq!(polar.marks()[0].mark_type, MarkType::Windward);
        assert_eq!(polar.marks()[1].mark_type, MarkType::Other);
    }
}
