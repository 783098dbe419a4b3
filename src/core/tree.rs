use std::{cmp::Ordering, f64::consts::FRAC_PI_2, path::Path};

use anyhow::Context;
use rstar::{AABB, RTree, RTreeObject};
use tracing::{info, warn};

use crate::core::query::FacilityIndex;
use crate::models::{EARTH_RADIUS_M, FacilityCandidate, Location};

#[derive(Debug, Clone, PartialEq)]
struct IndexedFacility {
    /// `[lng, lat]`
    point: [f64; 2],
    candidate: FacilityCandidate,
}

impl RTreeObject for IndexedFacility {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

/// In-memory facility index over an R-tree of facility coordinates.
pub struct RTreeFacilityIndex {
    tree: RTree<IndexedFacility>,
    loaded: bool,
}

impl std::fmt::Debug for RTreeFacilityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RTreeFacilityIndex")
            .field("facilities", &self.tree.size())
            .field("loaded", &self.loaded)
            .finish()
    }
}

impl Default for RTreeFacilityIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RTreeFacilityIndex {
    /// An index with nothing loaded yet; every query comes back empty.
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            loaded: false,
        }
    }

    pub fn from_candidates(candidates: Vec<FacilityCandidate>) -> Self {
        let total = candidates.len();
        let entries: Vec<_> = candidates
            .into_iter()
            .filter(|c| c.location().is_valid())
            .map(|candidate| IndexedFacility {
                point: candidate.coordinates,
                candidate,
            })
            .collect();
        if entries.len() < total {
            warn!(skipped = total - entries.len(), "Skipped facilities with invalid coordinates");
        }
        Self {
            tree: RTree::bulk_load(entries),
            loaded: true,
        }
    }

    /// Parse a JSON array of facilities.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let candidates: Vec<FacilityCandidate> =
            serde_json::from_str(raw).context("Facility list is not valid JSON")?;
        Ok(Self::from_candidates(candidates))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read facility list {:?}", path))?;
        let index = Self::from_json_str(&raw)?;
        info!(path = ?path, facilities = index.len(), "Loaded facility list");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// Degree box that contains every point within `radius_m` of `center`.
fn bounding_box(center: &Location, radius_m: f64) -> AABB<[f64; 2]> {
    let angular = radius_m / EARTH_RADIUS_M;
    let lat = center.lat.to_radians();
    let d_lat = angular.to_degrees();
    let min_lat = (center.lat - d_lat).max(-90.0);
    let max_lat = (center.lat + d_lat).min(90.0);

    // a circle touching a pole spans every longitude
    if angular + lat.abs() >= FRAC_PI_2 {
        return AABB::from_corners([-180.0, min_lat], [180.0, max_lat]);
    }
    let d_lng = (angular.sin() / lat.cos()).asin().to_degrees();
    let (min_lng, max_lng) = (center.lng - d_lng, center.lng + d_lng);
    if min_lng < -180.0 || max_lng > 180.0 {
        return AABB::from_corners([-180.0, min_lat], [180.0, max_lat]);
    }
    AABB::from_corners([min_lng, min_lat], [max_lng, max_lat])
}

impl FacilityIndex for RTreeFacilityIndex {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn nearest(&self, lat: f64, lng: f64, radius_m: f64, max_results: usize) -> Vec<FacilityCandidate> {
        let center = Location::new(lat, lng);
        if !center.is_valid() || !radius_m.is_finite() || radius_m < 0.0 {
            return Vec::new();
        }

        let envelope = bounding_box(&center, radius_m);
        let mut hits: Vec<(f64, &FacilityCandidate)> = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|entry| (center.distance_to(&entry.candidate.location()), &entry.candidate))
            .filter(|(distance, _)| *distance <= radius_m)
            .collect();

        // id breaks ties so equal distances come back in a stable order
        hits.sort_by(|(da, a), (db, b)| {
            da.partial_cmp(db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.uuid.cmp(&b.uuid))
        });
        hits.into_iter()
            .take(max_results)
            .map(|(_, candidate)| candidate.clone())
            .collect()
    }
}
