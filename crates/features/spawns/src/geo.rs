//! Great-circle distances and the nearby-branch lookup.

use crate::model::NearbyBranch;
use crate::repository::{BranchRepository, StoreResult};
use std::sync::Arc;
use tracing::debug;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// Widens the prefilter box so rounding never drops a branch sitting on its edge.
const BOX_MARGIN: f64 = 1.001;

/// Haversine distance between two points in metres.
#[must_use]
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a.min(1.0)).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Latitude/longitude rectangle, in degrees, that contains every point within a
/// given distance of its centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub const WORLD: Self = Self { min_lat: -90.0, max_lat: 90.0, min_lng: -180.0, max_lng: 180.0 };

    /// Box around `(lat, lng)` covering `radius` metres.
    ///
    /// Falls back to the full longitude range when the circle reaches a pole or
    /// crosses the antimeridian.
    #[must_use]
    pub fn around(lat: f64, lng: f64, radius: f64) -> Self {
        let angular = (radius / EARTH_RADIUS_METERS).to_degrees() * BOX_MARGIN;
        if angular >= 90.0 {
            return Self::WORLD;
        }

        let min_lat = lat - angular;
        let max_lat = lat + angular;
        if min_lat <= -90.0 || max_lat >= 90.0 {
            return Self { min_lat: min_lat.max(-90.0), max_lat: max_lat.min(90.0), ..Self::WORLD };
        }

        let ratio = angular.to_radians().sin() / lat.to_radians().cos();
        if ratio >= 1.0 {
            return Self { min_lat, max_lat, ..Self::WORLD };
        }
        let span = ratio.asin().to_degrees();
        let (min_lng, max_lng) = (lng - span, lng + span);
        if min_lng < -180.0 || max_lng > 180.0 {
            return Self { min_lat, max_lat, ..Self::WORLD };
        }

        Self { min_lat, max_lat, min_lng, max_lng }
    }

    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }
}

/// Point/radius lookup over branch locations.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    branches: Arc<dyn BranchRepository>,
}

impl SpatialIndex {
    pub fn new(branches: Arc<dyn BranchRepository>) -> Self {
        Self { branches }
    }

    /// Branches within `max_distance` metres, nearest first; ties break on id.
    ///
    /// Coordinates are expected to be validated by the caller.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        max_distance: f64,
    ) -> StoreResult<Vec<NearbyBranch>> {
        let bounds = BoundingBox::around(latitude, longitude, max_distance);
        let candidates = self.branches.branches_within(&bounds).await?;
        let scanned = candidates.len();

        let mut found: Vec<NearbyBranch> = candidates
            .into_iter()
            .filter_map(|branch| {
                let distance =
                    haversine_distance(latitude, longitude, branch.latitude, branch.longitude);
                (distance <= max_distance).then_some(NearbyBranch { branch, distance })
            })
            .collect();
        found.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.branch.id.cmp(&b.branch.id)));

        debug!(scanned, matched = found.len(), "Nearby lookup");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_distances() {
        assert!(haversine_distance(10.0, 20.0, 10.0, 20.0).abs() < f64::EPSILON);

        // One degree of latitude.
        let degree = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((degree - 111_194.9).abs() < 1.0, "{degree}");

        // Paris to London, roughly 343.5 km.
        let d = haversine_distance(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((d - 343_500.0).abs() < 1_000.0, "{d}");
    }

    #[test]
    fn box_contains_circle() {
        let bounds = BoundingBox::around(48.0, 11.0, 5_000.0);
        assert!(bounds.contains(48.0, 11.0));
        // A point 5 km due east must still be inside.
        let east = 11.0 + (5_000.0 / (EARTH_RADIUS_METERS * 48.0_f64.to_radians().cos())).to_degrees();
        assert!(bounds.contains(48.0, east));
        assert!(!bounds.contains(48.5, 11.0));
    }

    #[test]
    fn box_widens_near_antimeridian_and_poles() {
        let wrapped = BoundingBox::around(0.0, 179.99, 10_000.0);
        assert!((wrapped.min_lng + 180.0).abs() < f64::EPSILON);
        assert!((wrapped.max_lng - 180.0).abs() < f64::EPSILON);

        let polar = BoundingBox::around(89.99, 0.0, 10_000.0);
        assert_eq!(polar.max_lat, 90.0);
        assert!(polar.contains(89.995, -170.0));

        assert_eq!(BoundingBox::around(0.0, 0.0, 30_000_000.0), BoundingBox::WORLD);
    }
}
