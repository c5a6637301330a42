//! Geometry Kernel
//!
//! Great-circle helpers on WGS84 latitude/longitude in degrees. All functions
//! are pure; [`GeoKernel`] adds an optional per-instance memo cache on top.
//!
//! # Conventions
//!
//! - Distances are in meters.
//! - Bearings are true bearings in `[0, 360)`.
//! - Signed angle differences are in `(-180, 180]`; positive means `a` lies
//!   clockwise of `b`.

mod cache;

pub use cache::{CacheStats, CacheStrategy, GeoKernel};

/// Mean earth radius used by the haversine formula (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two positions in meters (haversine).
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial bearing from position 1 towards position 2, in `[0, 360)`.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    normalize_angle(y.atan2(x).to_degrees())
}

/// Signed minimal difference `a - b` in `(-180, 180]`.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Midpoint of two nearby positions.
///
/// Plain coordinate average, with the longitude taken the short way round the
/// antimeridian. Good enough for the sub-kilometer spacing of a GPS track.
pub fn midpoint(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64) {
    let lat = (lat1 + lat2) / 2.0;
    let lon = lon1 + angle_difference(lon2, lon1) / 2.0;
    let lon = if lon > 180.0 {
        lon - 360.0
    } else if lon <= -180.0 {
        lon + 360.0
    } else {
        lon
    };
    (lat, lon)
}
