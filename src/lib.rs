pub mod config;
pub mod core;
pub mod models;
pub mod question;

pub use config::FacilityConfig;
pub use models::{FacilityCandidate, FacilityId, FacilityProperties, Location};
pub use question::{FacilityMessage, FacilityQuestion, FacilityView, InputQueue, Mode};
pub use crate::core::answer::{Answer, AnswerError, ExistingFacility, FacilityDraft, StoredResponse};
pub use crate::core::db::{AnswerKey, AnswerRepository, LocationCache, MemoryStore, SurveyDb};
pub use crate::core::locate::{FixedPosition, LocateError, LocateHandle, LocateOutcome, LocateRequestId, Locator, NoPosition, PositionSource};
pub use crate::core::object_id::ObjectId;
pub use crate::core::query::{FacilityIndex, FacilityQuery, query_nearby};
pub use crate::core::reconciler::{AnswerReconciler, FacilityEdit};
pub use crate::core::sector::{SECTOR_CHOICES, Sector, SectorClass};
pub use crate::core::tree::RTreeFacilityIndex;

#[cfg(feature = "gui")]
pub mod gui;
