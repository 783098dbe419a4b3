use tracing::debug;

use crate::config::FacilityConfig;
use crate::models::{FacilityCandidate, Location};

/// Spatial lookup of known facilities.
pub trait FacilityIndex {
    /// False until the index has facility data to search.
    fn is_loaded(&self) -> bool;

    /// Up to `max_results` facilities within `radius_m` meters of the point,
    /// closest first.
    fn nearest(&self, lat: f64, lng: f64, radius_m: f64, max_results: usize) -> Vec<FacilityCandidate>;
}

impl<T: FacilityIndex + ?Sized> FacilityIndex for &T {
    fn is_loaded(&self) -> bool {
        (**self).is_loaded()
    }

    fn nearest(&self, lat: f64, lng: f64, radius_m: f64, max_results: usize) -> Vec<FacilityCandidate> {
        (**self).nearest(lat, lng, radius_m, max_results)
    }
}

/// Nearby facilities for `location`, in the index's order.
///
/// Empty when there is no usable location or the index has nothing loaded.
pub fn query_nearby<I: FacilityIndex + ?Sized>(
    index: &I,
    location: Option<Location>,
    radius_m: f64,
    max_results: usize,
) -> Vec<FacilityCandidate> {
    let Some(location) = location.filter(Location::is_valid) else {
        return Vec::new();
    };
    if !index.is_loaded() || max_results == 0 {
        return Vec::new();
    }
    debug!(lat = location.lat, lng = location.lng, radius_m, max_results, "Querying nearby facilities");
    let mut candidates = index.nearest(location.lat, location.lng, radius_m, max_results);
    candidates.truncate(max_results);
    candidates
}

/// A facility index bound to the configured search radius and result cap.
#[derive(Debug, Clone)]
pub struct FacilityQuery<I> {
    index: I,
    radius_m: f64,
    max_results: usize,
}

impl<I: FacilityIndex> FacilityQuery<I> {
    pub fn new(index: I, config: &FacilityConfig) -> Self {
        Self {
            index,
            radius_m: config.search_radius_m,
            max_results: config.max_results,
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn query(&self, location: Option<Location>) -> Vec<FacilityCandidate> {
        query_nearby(&self.index, location, self.radius_m, self.max_results)
    }
}
