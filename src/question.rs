use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::config::FacilityConfig;
use crate::core::answer::Answer;
use crate::core::db::{AnswerKey, AnswerRepository, LocationCache};
use crate::core::locate::{LocateCanceller, LocateHandle, LocateOutcome, LocateRequestId, Locator, PositionSource};
use crate::core::query::{FacilityIndex, FacilityQuery};
use crate::core::reconciler::{AnswerReconciler, FacilityEdit};
use crate::core::sector::SectorClass;
use crate::models::{FacilityCandidate, FacilityId, Location};

/// Which half of the question is shown. Purely presentational: switching
/// never touches the stored answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Selecting,
    Authoring,
}

impl Mode {
    /// Authoring when the stored answer is a draft, otherwise selecting.
    pub fn for_answer(answer: &Answer) -> Self {
        if answer.is_draft() {
            Mode::Authoring
        } else {
            Mode::Selecting
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FacilityMessage {
    /// Ask for a position fix; `update` hands back the request handle.
    Locate,
    /// Result of a request started by [`FacilityMessage::Locate`].
    Located(LocateRequestId, LocateOutcome),
    SelectFacility(FacilityId),
    NameInput(String),
    /// Selection of the single-choice sector list.
    SectorSelected(Vec<String>),
    /// Text typed into the "other" sector field.
    OtherSectorInput(String),
    ToggleAddFacility,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectingView {
    pub candidates: Vec<FacilityCandidate>,
    /// Id of the facility currently referenced by the answer.
    pub selected: Option<FacilityId>,
    /// Authoring a new facility is only offered once a location is known.
    pub can_add_facility: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthoringView {
    pub name: Option<String>,
    /// The location a new draft is stamped with.
    pub location: Option<Location>,
    pub sector: SectorClass,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FacilityView {
    Selecting(SelectingView),
    Authoring(AuthoringView),
}

/// Hands input messages to a [`FacilityQuestion`] one at a time, in arrival
/// order.
///
/// For front ends that run `update` off the event loop: push every message,
/// and start the next one only after the previous one has finished.
#[derive(Debug, Default)]
pub struct InputQueue {
    pending: VecDeque<FacilityMessage>,
    in_flight: bool,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: FacilityMessage) {
        self.pending.push_back(message);
    }

    /// The next message to handle, or `None` while one is still being handled.
    pub fn start_next(&mut self) -> Option<FacilityMessage> {
        if self.in_flight {
            return None;
        }
        let next = self.pending.pop_front();
        self.in_flight = next.is_some();
        next
    }

    /// Mark the message returned by the last [`InputQueue::start_next`] as handled.
    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    /// Nothing queued and nothing being handled.
    pub fn is_idle(&self) -> bool {
        !self.in_flight && self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// One facility question: nearby-facility selection plus new-facility authoring,
/// driven one message at a time.
pub struct FacilityQuestion<S, I, P> {
    reconciler: AnswerReconciler<S>,
    query: FacilityQuery<I>,
    locator: Locator<P>,
    mode: Mode,
    candidates: Vec<FacilityCandidate>,
    pending_locate: Option<LocateCanceller>,
}

impl<S, I, P> FacilityQuestion<S, I, P>
where
    S: AnswerRepository + LocationCache,
    I: FacilityIndex,
    P: PositionSource,
{
    pub async fn new(
        store: S,
        key: AnswerKey,
        index: I,
        source: P,
        config: &FacilityConfig,
    ) -> anyhow::Result<Self> {
        let reconciler = AnswerReconciler::new(store, key).await;
        let mode = Mode::for_answer(&reconciler.answer().await?);
        let query = FacilityQuery::new(index, config);
        let candidates = query.query(reconciler.location());
        Ok(Self {
            reconciler,
            query,
            locator: Locator::new(source, config),
            mode,
            candidates,
            pending_locate: None,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn candidates(&self) -> &[FacilityCandidate] {
        &self.candidates
    }

    pub fn location(&self) -> Option<Location> {
        self.reconciler.location()
    }

    pub fn reconciler(&self) -> &AnswerReconciler<S> {
        &self.reconciler
    }

    pub async fn answer(&self) -> anyhow::Result<Answer> {
        self.reconciler.answer().await
    }

    pub fn is_locating(&self) -> bool {
        self.pending_locate.is_some()
    }

    /// Handle one message. Only [`FacilityMessage::Locate`] returns a handle;
    /// its outcome should be fed back as [`FacilityMessage::Located`].
    pub async fn update(&mut self, message: FacilityMessage) -> anyhow::Result<Option<LocateHandle>> {
        match message {
            FacilityMessage::Locate => return Ok(Some(self.locate())),
            FacilityMessage::Located(request, outcome) => {
                self.apply_locate(request, outcome).await?;
            }
            FacilityMessage::SelectFacility(id) => {
                self.reconciler.select(&id, &self.candidates).await?;
            }
            FacilityMessage::NameInput(name) => {
                self.reconciler.edit_field(FacilityEdit::Name(name)).await?;
            }
            FacilityMessage::SectorSelected(values) => {
                self.reconciler
                    .edit_field(FacilityEdit::from_selection(values))
                    .await?;
            }
            FacilityMessage::OtherSectorInput(sector) => {
                self.reconciler
                    .edit_field(FacilityEdit::OtherSector(sector))
                    .await?;
            }
            FacilityMessage::ToggleAddFacility => self.toggle_mode(),
        }
        Ok(None)
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            Mode::Selecting => Mode::Authoring,
            Mode::Authoring => Mode::Selecting,
        };
        debug!(key = %self.reconciler.key(), mode = ?self.mode, "Toggled facility mode");
    }

    /// Start a position request. A request still in flight is superseded and
    /// its outcome will read as cancelled.
    pub fn locate(&mut self) -> LocateHandle {
        if let Some(previous) = self.pending_locate.take() {
            previous.cancel();
        }
        let handle = self.locator.locate();
        self.pending_locate = Some(handle.canceller());
        handle
    }

    /// Fold a locate outcome into the question. Returns whether the location changed.
    ///
    /// Only the outcome of the request still pending is applied; anything
    /// superseded or torn down is ignored. A failed request keeps the previous
    /// location and candidates.
    pub async fn apply_locate(&mut self, request: LocateRequestId, outcome: LocateOutcome) -> anyhow::Result<bool> {
        if self.pending_locate.as_ref().map(LocateCanceller::id) != Some(request) {
            debug!(?request, "Ignoring outcome of a superseded locate");
            return Ok(false);
        }
        match outcome {
            LocateOutcome::Located(location) => {
                self.pending_locate = None;
                self.reconciler.set_location(location).await?;
                self.candidates = self.query.query(Some(location));
                info!(
                    lat = location.lat,
                    lng = location.lng,
                    candidates = self.candidates.len(),
                    "Location updated"
                );
                Ok(true)
            }
            LocateOutcome::Failed(e) => {
                self.pending_locate = None;
                warn!(error = %e, "Location could not be obtained");
                Ok(false)
            }
            LocateOutcome::Cancelled => {
                self.pending_locate = None;
                Ok(false)
            }
        }
    }

    /// Request a fix, wait for it and apply it.
    pub async fn refresh_location(&mut self) -> anyhow::Result<bool> {
        let handle = self.locate();
        let request = handle.id();
        let outcome = handle.outcome().await;
        self.apply_locate(request, outcome).await
    }

    /// Re-run the nearby query against the current location.
    pub fn refresh_candidates(&mut self) {
        self.candidates = self.query.query(self.reconciler.location());
    }

    /// Build the view from the live answer.
    pub async fn view(&self) -> anyhow::Result<FacilityView> {
        let answer = self.reconciler.answer().await?;
        Ok(match self.mode {
            Mode::Selecting => FacilityView::Selecting(SelectingView {
                candidates: self.candidates.clone(),
                selected: answer.as_existing().map(|existing| existing.facility_id.clone()),
                can_add_facility: self.reconciler.location().is_some(),
            }),
            Mode::Authoring => {
                let draft = answer.as_draft();
                FacilityView::Authoring(AuthoringView {
                    name: draft.and_then(|d| d.facility_name.clone()),
                    location: self.reconciler.location(),
                    sector: match draft {
                        Some(_) => answer.sector_class(),
                        None => SectorClass::Unset,
                    },
                })
            }
        })
    }

    /// Cancel any in-flight position request. Also runs on drop.
    pub fn teardown(&mut self) {
        if let Some(pending) = self.pending_locate.take() {
            debug!("Cancelling in-flight locate");
            pending.cancel();
        }
    }
}

impl<S, I, P> Drop for FacilityQuestion<S, I, P> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending_locate.take() {
            pending.cancel();
        }
    }
}
