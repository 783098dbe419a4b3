use std::time::Duration;

use facility_picker::{
    AnswerKey, FacilityCandidate, FacilityId, FacilityProperties, LocateError, Location, PositionSource, SurveyDb,
    core::locate::PositionOptions,
};
use uuid::Uuid;

/// Where the worker stands in most tests.
pub const HOME: Location = Location { lat: 1.0, lng: 2.0 };

/// Roughly 111 m per 0.001 degree of latitude.
pub const DEG_PER_100M: f64 = 0.0009;

pub fn test_key() -> AnswerKey {
    AnswerKey::new("survey-1", "question-facility")
}

/// Creates a facility candidate with a fresh uuid as its id.
pub fn make_candidate(name: &str, lat: f64, lng: f64, sector: Option<&str>) -> FacilityCandidate {
    FacilityCandidate {
        uuid: FacilityId::from(Uuid::new_v4().to_string()),
        name: name.to_string(),
        coordinates: [lng, lat],
        properties: FacilityProperties {
            sector: sector.map(str::to_string),
        },
    }
}

/// Three facilities north of [`HOME`] at ~100 m, ~300 m and ~2 km.
pub fn make_nearby_facilities() -> Vec<FacilityCandidate> {
    vec![
        make_candidate("Far Well", HOME.lat + 18.0 * DEG_PER_100M, HOME.lng, Some("water")),
        make_candidate("Central Clinic", HOME.lat + DEG_PER_100M, HOME.lng, Some("health")),
        make_candidate("Primary School", HOME.lat + 3.0 * DEG_PER_100M, HOME.lng, Some("education")),
    ]
}

/// Creates a SurveyDb in a temporary directory.
/// Returns both the store and the temp directory (which must be kept alive).
pub async fn create_test_store() -> (SurveyDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("answers.db");
    let store = SurveyDb::new(&path)
        .await
        .expect("Failed to create test store");
    (store, dir)
}

/// Reports `location` after `delay`.
#[derive(Debug, Clone, Copy)]
pub struct SlowPosition {
    pub delay: Duration,
    pub location: Location,
}

impl PositionSource for SlowPosition {
    async fn current_position(&self, _options: PositionOptions) -> Result<Location, LocateError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.location)
    }
}

/// Always refuses, like a user denying the permission prompt.
#[derive(Debug, Clone, Copy)]
pub struct DeniedPosition;

impl PositionSource for DeniedPosition {
    async fn current_position(&self, _options: PositionOptions) -> Result<Location, LocateError> {
        Err(LocateError::PermissionDenied)
    }
}
