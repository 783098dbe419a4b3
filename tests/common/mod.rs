mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from facility_picker for tests
pub use facility_picker::{
    Answer, AnswerKey, AnswerReconciler, AnswerRepository, FacilityCandidate, FacilityConfig,
    FacilityEdit, FacilityId, FacilityIndex, FacilityMessage, FacilityQuestion, FacilityView, LocateError,
    InputQueue, LocateOutcome, Location, LocationCache, MemoryStore, Mode, RTreeFacilityIndex, SectorClass,
    SurveyDb,
};
