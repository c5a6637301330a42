//! Gridded wind field
//!
//! A [`WindField`] is a snapshot of wind direction, speed and confidence on a
//! 2D latitude/longitude grid. All grids share one shape; this is checked
//! once at construction so the sampler can index them without further checks.

use chrono::{DateTime, Utc};
use ndarray::Array2;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrategyError};

/// Confidence assumed for every cell when the source has no confidence grid
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Geographic bounding box of a field, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Inclusive containment test
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// Grid cell stored in the spatial index
#[derive(Debug, Clone, Copy, PartialEq)]
struct GridCell {
    row: usize,
    col: usize,
    lat: f64,
    lon: f64,
}

impl RTreeObject for GridCell {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lon])
    }
}

impl PointDistance for GridCell {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlon = self.lon - point[1];
        dlat * dlat + dlon * dlon
    }
}

/// Serialized form of a wind field: nested row arrays, confidence optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindFieldData {
    pub lat_grid: Vec<Vec<f64>>,
    pub lon_grid: Vec<Vec<f64>>,
    pub wind_direction: Vec<Vec<f64>>,
    pub wind_speed: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Vec<Vec<f64>>>,
    pub timestamp: DateTime<Utc>,
}

/// Validated wind field snapshot
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "WindFieldData", into = "WindFieldData")]
pub struct WindField {
    lat: Array2<f64>,
    lon: Array2<f64>,
    direction: Array2<f64>,
    speed: Array2<f64>,
    confidence: Array2<f64>,
    timestamp: DateTime<Utc>,
    bounds: Bounds,
    index: RTree<GridCell>,
}

impl std::fmt::Debug for WindField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindField")
            .field("shape", &self.shape())
            .field("timestamp", &self.timestamp)
            .field("bounds", &self.bounds)
            .finish()
    }
}

fn check_shape(name: &'static str, grid: &Array2<f64>, expected: (usize, usize)) -> Result<()> {
    if grid.dim() != expected {
        return Err(StrategyError::ShapeMismatch {
            grid: name,
            expected,
            found: grid.dim(),
        });
    }
    if let Some(((row, col), _)) = grid.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(StrategyError::NonFinite { grid: name, row, col });
    }
    Ok(())
}

fn to_array(name: &'static str, rows: Vec<Vec<f64>>) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map(Vec::len).unwrap_or(0);
    let mut flat = Vec::with_capacity(n_rows * n_cols);
    for (row, values) in rows.into_iter().enumerate() {
        if values.len() != n_cols {
            return Err(StrategyError::RaggedRow {
                grid: name,
                row,
                expected: n_cols,
                found: values.len(),
            });
        }
        flat.extend(values);
    }
    Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|_| StrategyError::EmptyGrid)
}

fn to_rows(grid: &Array2<f64>) -> Vec<Vec<f64>> {
    grid.outer_iter().map(|row| row.to_vec()).collect()
}

impl WindField {
    /// Build a field from grids, validating that every grid has the shape of
    /// `lat`. A missing confidence grid becomes [`DEFAULT_CONFIDENCE`].
    pub fn new(
        lat: Array2<f64>,
        lon: Array2<f64>,
        direction: Array2<f64>,
        speed: Array2<f64>,
        confidence: Option<Array2<f64>>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let shape = lat.dim();
        if shape.0 == 0 || shape.1 == 0 {
            return Err(StrategyError::EmptyGrid);
        }
        check_shape("lat", &lat, shape)?;
        check_shape("lon", &lon, shape)?;
        check_shape("wind_direction", &direction, shape)?;
        check_shape("wind_speed", &speed, shape)?;
        let confidence = match confidence {
            Some(grid) => {
                check_shape("confidence", &grid, shape)?;
                grid
            }
            None => Array2::from_elem(shape, DEFAULT_CONFIDENCE),
        };

        let bounds = Bounds {
            min_lat: lat.iter().copied().fold(f64::INFINITY, f64::min),
            max_lat: lat.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min_lon: lon.iter().copied().fold(f64::INFINITY, f64::min),
            max_lon: lon.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };

        let cells = lat
            .indexed_iter()
            .map(|((row, col), &cell_lat)| GridCell {
                row,
                col,
                lat: cell_lat,
                lon: lon[[row, col]],
            })
            .collect();
        let index = RTree::bulk_load(cells);

        log::trace!(
            "wind field {}x{} at {} indexed, bounds {:?}",
            shape.0,
            shape.1,
            timestamp,
            bounds
        );

        Ok(WindField {
            lat,
            lon,
            direction,
            speed,
            confidence,
            timestamp,
            bounds,
            index,
        })
    }

    /// A field on the same grid with new values, reusing the spatial index.
    pub fn with_values(
        &self,
        direction: Array2<f64>,
        speed: Array2<f64>,
        confidence: Array2<f64>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let shape = self.shape();
        check_shape("wind_direction", &direction, shape)?;
        check_shape("wind_speed", &speed, shape)?;
        check_shape("confidence", &confidence, shape)?;
        Ok(WindField {
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            direction,
            speed,
            confidence,
            timestamp,
            bounds: self.bounds,
            index: self.index.clone(),
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.lat.dim()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.bounds.contains(lat, lon)
    }

    pub fn lat_grid(&self) -> &Array2<f64> {
        &self.lat
    }

    pub fn lon_grid(&self) -> &Array2<f64> {
        &self.lon
    }

    pub fn direction(&self) -> &Array2<f64> {
        &self.direction
    }

    pub fn speed(&self) -> &Array2<f64> {
        &self.speed
    }

    pub fn confidence(&self) -> &Array2<f64> {
        &self.confidence
    }

    /// Grid index of the cell nearest to `(lat, lon)` in squared-degree
    /// distance, or `None` when the point is outside the field's bounds.
    pub fn nearest_cell(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        if !self.contains(lat, lon) {
            return None;
        }
        self.index
            .nearest_neighbor(&[lat, lon])
            .map(|cell| (cell.row, cell.col))
    }
}

impl TryFrom<WindFieldData> for WindField {
    type Error = StrategyError;

    fn try_from(data: WindFieldData) -> Result<Self> {
        let lat = to_array("lat", data.lat_grid)?;
        let lon = to_array("lon", data.lon_grid)?;
        let direction = to_array("wind_direction", data.wind_direction)?;
        let speed = to_array("wind_speed", data.wind_speed)?;
        let confidence = data
            .confidence
            .map(|rows| to_array("confidence", rows))
            .transpose()?;
        WindField::new(lat, lon, direction, speed, confidence, data.timestamp)
    }
}

impl From<WindField> for WindFieldData {
    fn from(field: WindField) -> Self {
        WindFieldData {
            lat_grid: to_rows(&field.lat),
            lon_grid: to_rows(&field.lon),
            wind_direction: to_rows(&field.direction),
            wind_speed: to_rows(&field.speed),
            confidence: Some(to_rows(&field.confidence)),
            timestamp: field.timestamp,
        }
    }
}
