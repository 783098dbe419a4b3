//! Keeps the single stored answer of a facility question consistent across
//! independent input events.
//!
//! Two shapes share one slot: a reference to a facility picked from the
//! nearby list, or a draft of a facility the worker is registering. Picking a
//! facility overwrites whatever was there. Field edits merge into the current
//! draft, or start a fresh one (with a fresh id) when the slot holds anything
//! else.

use tracing::{debug, warn};

use crate::core::answer::{Answer, AnswerError, ExistingFacility, FacilityDraft};
use crate::core::db::{AnswerKey, AnswerRepository, LocationCache};
use crate::core::object_id::ObjectId;
use crate::models::{FacilityCandidate, FacilityId, Location};

/// A single field edit of the facility being authored.
#[derive(Debug, Clone, PartialEq)]
pub enum FacilityEdit {
    Name(String),
    /// A value from the fixed sector list; `None` when the selection was emptied.
    ListedSector(Option<String>),
    /// A sector typed into the "other" field.
    OtherSector(String),
}

impl FacilityEdit {
    /// Build a listed-sector edit from a single-select widget's selection.
    /// Only the first value counts.
    pub fn from_selection<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        FacilityEdit::ListedSector(values.into_iter().next().map(Into::into))
    }

    fn apply(self, draft: &mut FacilityDraft) {
        match self {
            FacilityEdit::Name(name) => draft.facility_name = Some(name),
            FacilityEdit::ListedSector(sector) => draft.facility_sector = sector,
            FacilityEdit::OtherSector(sector) => draft.facility_sector = Some(sector),
        }
    }
}

#[derive(Debug)]
pub struct AnswerReconciler<S> {
    store: S,
    key: AnswerKey,
    location: Option<Location>,
}

impl<S> AnswerReconciler<S>
where
    S: AnswerRepository + LocationCache,
{
    /// Bind to one answer slot, picking up the session's cached location.
    pub async fn new(store: S, key: AnswerKey) -> Self {
        let location = match store.get_location().await {
            Ok(location) => location.filter(Location::is_valid),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cached location");
                None
            }
        };
        Self { store, key, location }
    }

    pub fn key(&self) -> &AnswerKey {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// Record a fresh fix: kept for later drafts and written to the session cache.
    pub async fn set_location(&mut self, location: Location) -> anyhow::Result<()> {
        self.store.set_location(&location).await?;
        self.location = Some(location);
        Ok(())
    }

    /// The stored answer. A slot whose content cannot be interpreted reads as empty.
    pub async fn answer(&self) -> anyhow::Result<Answer> {
        let responses = match self.store.get_responses(&self.key).await {
            Ok(responses) => responses,
            Err(e) => match e.downcast_ref::<AnswerError>() {
                Some(corrupt) => {
                    warn!(key = %self.key, error = %corrupt, "Treating corrupt answer as unanswered");
                    return Ok(Answer::Empty);
                }
                None => return Err(e),
            },
        };
        match Answer::from_responses(&responses) {
            Ok(answer) => Ok(answer),
            Err(corrupt) => {
                warn!(key = %self.key, error = %corrupt, "Treating corrupt answer as unanswered");
                Ok(Answer::Empty)
            }
        }
    }

    /// Replace the answer with a reference to `candidate_id`.
    ///
    /// Returns `false` and leaves the stored answer alone when the id is not
    /// part of `candidates`.
    pub async fn select(&self, candidate_id: &FacilityId, candidates: &[FacilityCandidate]) -> anyhow::Result<bool> {
        let Some(candidate) = candidates.iter().find(|c| &c.uuid == candidate_id) else {
            debug!(key = %self.key, %candidate_id, "Ignoring selection outside the current candidates");
            return Ok(false);
        };
        let answer = Answer::Existing(ExistingFacility::from(candidate));
        self.store.set_responses(&self.key, &answer.to_responses()).await?;
        debug!(key = %self.key, %candidate_id, name = %candidate.name, "Selected existing facility");
        Ok(true)
    }

    /// Merge one field edit into the draft and store it.
    pub async fn edit_field(&self, edit: FacilityEdit) -> anyhow::Result<FacilityDraft> {
        let mut draft = match self.answer().await? {
            Answer::Draft(draft) => draft,
            Answer::Existing(_) | Answer::Empty => {
                let draft = FacilityDraft::new(ObjectId::generate());
                debug!(key = %self.key, facility_id = %draft.facility_id, "Starting new facility draft");
                draft
            }
        };
        // last observed fix, not re-queried per edit
        draft.stamp_location(self.location);
        edit.apply(&mut draft);

        let responses = Answer::Draft(draft.clone()).to_responses();
        self.store.set_responses(&self.key, &responses).await?;
        Ok(draft)
    }
}
