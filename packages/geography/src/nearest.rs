//! Nearest known location to a query point.
//!
//! Lookups are a linear scan over every candidate, so cost grows with the
//! candidate count. That is fine for the tens of thousands of locations a
//! single city has; larger sets would need a spatial index.

use std::time::Duration;

use accident_risk_cache::TtlCache;
use accident_risk_features_models::LocationRecord;
use geo::Point;

use crate::{Units, distance, point};

/// Anything with a position.
pub trait Located {
    fn location(&self) -> Point<f64>;
}

impl Located for Point<f64> {
    fn location(&self) -> Point<f64> {
        *self
    }
}

impl Located for LocationRecord {
    fn location(&self) -> Point<f64> {
        point(self.latitude, self.longitude)
    }
}

/// The closest candidate and how far away it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMatch<'a, T> {
    /// Position of the match in the candidate slice.
    pub index: usize,
    pub item: &'a T,
    pub distance: f64,
}

/// Returns the candidate closest to `query`.
///
/// Ties go to the earliest candidate. Returns `None` for an empty slice.
#[must_use]
pub fn nearest<T: Located>(
    query: Point<f64>,
    candidates: &[T],
    units: Units,
) -> Option<NearestMatch<'_, T>> {
    let mut best: Option<NearestMatch<'_, T>> = None;

    for (index, item) in candidates.iter().enumerate() {
        let d = distance(query, item.location(), units);
        if best.as_ref().is_none_or(|b| d < b.distance) {
            best = Some(NearestMatch {
                index,
                item,
                distance: d,
            });
        }
    }

    best
}

type CoordinateKey = (u64, u64);

/// A fixed candidate set with a cache of recent query results.
///
/// The cache is keyed by the exact bit patterns of the query coordinates,
/// so only identical repeats hit it.
#[derive(Debug)]
pub struct NearestMatcher<T> {
    candidates: Vec<T>,
    units: Units,
    cache: TtlCache<CoordinateKey, (usize, f64)>,
}

impl<T: Located> NearestMatcher<T> {
    #[must_use]
    pub fn new(candidates: Vec<T>, units: Units) -> Self {
        Self::with_cache(candidates, units, TtlCache::default())
    }

    #[must_use]
    pub fn with_cache_limits(
        candidates: Vec<T>,
        units: Units,
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        Self::with_cache(candidates, units, TtlCache::new(capacity, ttl))
    }

    fn with_cache(
        candidates: Vec<T>,
        units: Units,
        cache: TtlCache<CoordinateKey, (usize, f64)>,
    ) -> Self {
        log::debug!("Nearest matcher over {} candidates", candidates.len());
        Self {
            candidates,
            units,
            cache,
        }
    }

    #[must_use]
    pub fn candidates(&self) -> &[T] {
        &self.candidates
    }

    #[must_use]
    pub const fn units(&self) -> Units {
        self.units
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Finds the candidate nearest to a latitude/longitude.
    #[must_use]
    pub fn find(&self, latitude: f64, longitude: f64) -> Option<NearestMatch<'_, T>> {
        let key = (latitude.to_bits(), longitude.to_bits());

        if let Some((index, distance)) = self.cache.get(&key) {
            return self.candidates.get(index).map(|item| NearestMatch {
                index,
                item,
                distance,
            });
        }

        let found = nearest(point(latitude, longitude), &self.candidates, self.units)?;
        self.cache.insert(key, (found.index, found.distance));
        Some(found)
    }

    /// Cache hit and miss counts.
    #[must_use]
    pub fn cache_stats(&self) -> accident_risk_cache::CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use accident_risk_features_models::RoadFeatures;

    use super::*;

    fn location(latitude: f64, longitude: f64) -> LocationRecord {
        LocationRecord {
            latitude,
            longitude,
            road: RoadFeatures::default(),
            zip_code: None,
        }
    }

    #[test]
    fn returns_closest_candidate() {
        let candidates = vec![point(34.05, -118.25), point(34.10, -118.30)];
        let found = nearest(point(34.06, -118.26), &candidates, Units::Imperial).unwrap();
        assert_eq!(found.index, 0);
        assert!(found.distance > 0.0);
    }

    #[test]
    fn matches_brute_force_minimum() {
        let candidates: Vec<Point<f64>> = (0..50)
            .map(|i| {
                let i = f64::from(i);
                point(33.7 + (i * 0.37) % 0.6, -118.6 + (i * 0.53) % 0.5)
            })
            .collect();
        let query = point(34.0, -118.3);

        let found = nearest(query, &candidates, Units::Metric).unwrap();
        let min = candidates
            .iter()
            .map(|c| distance(query, *c, Units::Metric))
            .fold(f64::INFINITY, f64::min);
        assert!((found.distance - min).abs() < f64::EPSILON);
    }

    #[test]
    fn ties_go_to_first_candidate() {
        let candidates = vec![
            location(34.0, -118.0),
            location(34.0, -118.0),
            location(34.0, -118.0),
        ];
        let found = nearest(point(34.1, -118.1), &candidates, Units::Imperial).unwrap();
        assert_eq!(found.index, 0);
    }

    #[test]
    fn empty_candidates_have_no_match() {
        let candidates: Vec<Point<f64>> = Vec::new();
        assert!(nearest(point(34.0, -118.0), &candidates, Units::Imperial).is_none());
    }

    #[test]
    fn matcher_caches_repeated_queries() {
        let matcher = NearestMatcher::new(
            vec![location(34.05, -118.25), location(34.10, -118.30)],
            Units::Imperial,
        );

        let first = matcher.find(34.09, -118.29).unwrap();
        let second = matcher.find(34.09, -118.29).unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(second.index, 1);
        assert!((first.distance - second.distance).abs() < f64::EPSILON);

        let stats = matcher.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn disabled_cache_still_matches() {
        let matcher = NearestMatcher::with_cache_limits(
            vec![point(34.05, -118.25)],
            Units::Metric,
            0,
            Duration::from_secs(1),
        );
        assert_eq!(matcher.find(34.0, -118.0).unwrap().index, 0);
        assert_eq!(matcher.cache_stats().len, 0);
    }
}
