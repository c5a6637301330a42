//! Memoized geometry
//!
//! Distance and bearing lookups are repeated many times by the detectors and
//! the duplicate filter (every candidate pair). [`GeoKernel`] caches them
//! per instance, keyed by the bit patterns of the input coordinates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a [`GeoKernel`] memoizes its results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Always compute
    Disabled,
    /// Cache up to `capacity` entries per function, then start over
    Bounded { capacity: usize },
}

impl Default for CacheStrategy {
    fn default() -> Self {
        CacheStrategy::Bounded { capacity: 4096 }
    }
}

/// Hit/miss counters, for tuning cache capacity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub resets: u64,
}

type Key = [u64; 4];

/// Geometry functions with an instance-owned memo cache
#[derive(Debug, Clone, Default)]
pub struct GeoKernel {
    strategy: CacheStrategy,
    distances: HashMap<Key, f64>,
    bearings: HashMap<Key, f64>,
    stats: CacheStats,
}

fn key(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Key {
    // Adding 0.0 folds -0.0 into +0.0 so equal values share a key
    [
        (lat1 + 0.0).to_bits(),
        (lon1 + 0.0).to_bits(),
        (lat2 + 0.0).to_bits(),
        (lon2 + 0.0).to_bits(),
    ]
}

impl GeoKernel {
    pub fn new(strategy: CacheStrategy) -> Self {
        GeoKernel {
            strategy,
            distances: HashMap::new(),
            bearings: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn strategy(&self) -> CacheStrategy {
        self.strategy
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of cached entries across both tables
    pub fn len(&self) -> usize {
        self.distances.len() + self.bearings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all cached values
    pub fn clear(&mut self) {
        self.distances.clear();
        self.bearings.clear();
    }

    /// Memoized [`super::distance`]
    pub fn distance(&mut self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let capacity = match self.strategy {
            CacheStrategy::Disabled => return super::distance(lat1, lon1, lat2, lon2),
            CacheStrategy::Bounded { capacity } => capacity,
        };
        lookup(
            &mut self.distances,
            &mut self.stats,
            capacity,
            key(lat1, lon1, lat2, lon2),
            || super::distance(lat1, lon1, lat2, lon2),
        )
    }

    /// Memoized [`super::bearing`]
    pub fn bearing(&mut self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let capacity = match self.strategy {
            CacheStrategy::Disabled => return super::bearing(lat1, lon1, lat2, lon2),
            CacheStrategy::Bounded { capacity } => capacity,
        };
        lookup(
            &mut self.bearings,
            &mut self.stats,
            capacity,
            key(lat1, lon1, lat2, lon2),
            || super::bearing(lat1, lon1, lat2, lon2),
        )
    }
}

fn lookup(
    table: &mut HashMap<Key, f64>,
    stats: &mut CacheStats,
    capacity: usize,
    key: Key,
    compute: impl FnOnce() -> f64,
) -> f64 {
    if let Some(value) = table.get(&key) {
        stats.hits += 1;
        return *value;
    }
    stats.misses += 1;
    let value = compute();
    if capacity == 0 {
        return value;
    }
    if table.len() >= capacity {
        log::trace!("geometry cache full at {} entries, resetting", table.len());
        table.clear();
        stats.resets += 1;
    }
    table.insert(key, value);
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_values_match_pure_functions() {
        let mut kernel = GeoKernel::new(CacheStrategy::default());
        let d = kernel.distance(35.45, 139.65, 35.46, 139.66);
        assert_eq!(d, super::super::distance(35.45, 139.65, 35.46, 139.66));
        let b = kernel.bearing(35.45, 139.65, 35.46, 139.66);
        assert_eq!(b, super::super::bearing(35.45, 139.65, 35.46, 139.66));
    }

    #[test]
    fn test_equal_values_hit_the_same_entry() {
        let mut kernel = GeoKernel::new(CacheStrategy::Bounded { capacity: 16 });
        let lat = 35.0_f64;
        let lat_copy = 70.0_f64 / 2.0;
        kernel.distance(lat, 139.0, 35.1, 139.1);
        kernel.distance(lat_copy, 139.0, 35.1, 139.1);
        assert_eq!(kernel.stats().misses, 1);
        assert_eq!(kernel.stats().hits, 1);
    }

    #[test]
    fn test_negative_zero_shares_key() {
        let mut kernel = GeoKernel::new(CacheStrategy::Bounded { capacity: 16 });
        kernel.distance(0.0, 0.0, 1.0, 1.0);
        kernel.distance(-0.0, -0.0, 1.0, 1.0);
        assert_eq!(kernel.stats().hits, 1);
    }

    #[test]
    fn test_distinct_values_do_not_collide() {
        let mut kernel = GeoKernel::new(CacheStrategy::default());
        let a = kernel.distance(0.0, 0.0, 0.0, 1.0);
        let b = kernel.distance(0.0, 0.0, 0.0, 2.0);
        assert!(b > a);
        assert_eq!(kernel.stats().misses, 2);
    }

    #[test]
    fn test_bounded_capacity_resets() {
        let mut kernel = GeoKernel::new(CacheStrategy::Bounded { capacity: 2 });
        for i in 0..5 {
            kernel.distance(0.0, 0.0, 0.0, i as f64);
        }
        assert!(kernel.len() <= 2);
        assert!(kernel.stats().resets >= 1);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let mut kernel = GeoKernel::new(CacheStrategy::Disabled);
        kernel.distance(0.0, 0.0, 1.0, 1.0);
        kernel.bearing(0.0, 0.0, 1.0, 1.0);
        assert!(kernel.is_empty());
        assert_eq!(kernel.stats(), CacheStats::default());
    }
}
