use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::core::object_id::ObjectId;
use crate::core::sector::SectorClass;
use crate::models::{FacilityCandidate, FacilityId, Location};

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("stored answer is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("stored answer is missing {0}")]
    MissingField(&'static str),
}

/// Response body as the host application persists it.
///
/// Every field is optional on the wire; [`Answer::from_responses`] decides
/// which combinations are meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Answer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub is_new: bool,
}

/// One entry of the per-question response list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub response: FacilityResponse,
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

impl StoredResponse {
    pub fn is_new(&self) -> bool {
        self.metadata.is_some_and(|m| m.is_new)
    }
}

pub fn decode_responses(raw: &str) -> Result<Vec<StoredResponse>, AnswerError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn encode_responses(responses: &[StoredResponse]) -> Result<String, AnswerError> {
    Ok(serde_json::to_string(responses)?)
}

/// A reference to a facility that already exists in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingFacility {
    pub facility_id: FacilityId,
    pub facility_name: String,
    pub facility_sector: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl From<&FacilityCandidate> for ExistingFacility {
    fn from(candidate: &FacilityCandidate) -> Self {
        Self {
            facility_id: candidate.uuid.clone(),
            facility_name: candidate.name.clone(),
            facility_sector: candidate.properties.sector.clone(),
            lat: candidate.lat(),
            lng: candidate.lng(),
        }
    }
}

/// A facility being authored on the device.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityDraft {
    pub facility_id: ObjectId,
    pub facility_name: Option<String>,
    pub facility_sector: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl FacilityDraft {
    pub fn new(facility_id: ObjectId) -> Self {
        Self {
            facility_id,
            facility_name: None,
            facility_sector: None,
            lat: None,
            lng: None,
        }
    }

    /// Overwrite both coordinates; `None` clears them.
    pub fn stamp_location(&mut self, location: Option<Location>) {
        self.lat = location.map(|l| l.lat);
        self.lng = location.map(|l| l.lng);
    }

    pub fn location(&self) -> Option<Location> {
        Some(Location::new(self.lat?, self.lng?))
    }
}

/// The answer currently held for one facility question.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Answer {
    #[default]
    Empty,
    Existing(ExistingFacility),
    Draft(FacilityDraft),
}

impl Answer {
    /// Interpret a stored response list. Only the first entry is considered.
    pub fn from_responses(responses: &[StoredResponse]) -> Result<Self, AnswerError> {
        let Some(first) = responses.first() else {
            return Ok(Answer::Empty);
        };
        let r = &first.response;
        if first.is_new() {
            // a draft saved without an id keeps its fields; the next write stores the new id
            let facility_id = r
                .facility_id
                .clone()
                .map(ObjectId::from)
                .unwrap_or_else(ObjectId::generate);
            return Ok(Answer::Draft(FacilityDraft {
                facility_id,
                facility_name: r.facility_name.clone(),
                facility_sector: r.facility_sector.clone(),
                lat: r.lat,
                lng: r.lng,
            }));
        }

        let facility_id = r
            .facility_id
            .clone()
            .ok_or(AnswerError::MissingField("facility_id"))?;
        Ok(Answer::Existing(ExistingFacility {
            facility_id: FacilityId::from(facility_id),
            facility_name: r
                .facility_name
                .clone()
                .ok_or(AnswerError::MissingField("facility_name"))?,
            facility_sector: r.facility_sector.clone(),
            lat: r.lat.ok_or(AnswerError::MissingField("lat"))?,
            lng: r.lng.ok_or(AnswerError::MissingField("lng"))?,
        }))
    }

    /// The response list to persist: empty for no answer, otherwise exactly one entry.
    pub fn to_responses(&self) -> Vec<StoredResponse> {
        match self {
            Answer::Empty => Vec::new(),
            Answer::Existing(existing) => vec![StoredResponse {
                response: FacilityResponse {
                    facility_id: Some(existing.facility_id.as_str().to_string()),
                    facility_name: Some(existing.facility_name.clone()),
                    facility_sector: existing.facility_sector.clone(),
                    lat: Some(existing.lat),
                    lng: Some(existing.lng),
                },
                response_type: ResponseType::Answer,
                metadata: None,
            }],
            Answer::Draft(draft) => vec![StoredResponse {
                response: FacilityResponse {
                    facility_id: Some(draft.facility_id.as_str().to_string()),
                    facility_name: draft.facility_name.clone(),
                    facility_sector: draft.facility_sector.clone(),
                    lat: draft.lat,
                    lng: draft.lng,
                },
                response_type: ResponseType::Answer,
                metadata: Some(ResponseMetadata { is_new: true }),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Answer::Empty)
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Answer::Draft(_))
    }

    pub fn as_draft(&self) -> Option<&FacilityDraft> {
        match self {
            Answer::Draft(draft) => Some(draft),
            _ => None,
        }
    }

    pub fn as_existing(&self) -> Option<&ExistingFacility> {
        match self {
            Answer::Existing(existing) => Some(existing),
            _ => None,
        }
    }

    pub fn facility_name(&self) -> Option<&str> {
        match self {
            Answer::Empty => None,
            Answer::Existing(existing) => Some(&existing.facility_name),
            Answer::Draft(draft) => draft.facility_name.as_deref(),
        }
    }

    pub fn facility_sector(&self) -> Option<&str> {
        match self {
            Answer::Empty => None,
            Answer::Existing(existing) => existing.facility_sector.as_deref(),
            Answer::Draft(draft) => draft.facility_sector.as_deref(),
        }
    }

    /// Sector classification of the live answer; never cache this.
    pub fn sector_class(&self) -> SectorClass {
        SectorClass::classify(self.facility_sector())
    }
}
