use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use thiserror::Error;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

use crate::config::FacilityConfig;
use crate::models::Location;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocateError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("no position fix within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the source may hand back.
    pub maximum_age: Duration,
}

impl From<&FacilityConfig> for PositionOptions {
    fn from(config: &FacilityConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: config.locate_timeout,
            maximum_age: Duration::ZERO,
        }
    }
}

/// Something that can report where the device currently is.
pub trait PositionSource: Send + Sync + 'static {
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> impl Future<Output = Result<Location, LocateError>> + Send;
}

/// Always reports the same position. Useful when the fix comes from outside
/// the process, e.g. command-line arguments.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Location);

impl PositionSource for FixedPosition {
    async fn current_position(&self, _options: PositionOptions) -> Result<Location, LocateError> {
        Ok(self.0)
    }
}

/// A source with no fix available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPosition;

impl PositionSource for NoPosition {
    async fn current_position(&self, _options: PositionOptions) -> Result<Location, LocateError> {
        Err(LocateError::Unavailable("no position source".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocateOutcome {
    Located(Location),
    Failed(LocateError),
    /// Cancelled before completion; carries no information.
    Cancelled,
}

/// Identifies one request started by a [`Locator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocateRequestId(u64);

/// Cancels one in-flight locate request. Cloneable so the requester can keep
/// it while the handle travels elsewhere.
#[derive(Debug, Clone)]
pub struct LocateCanceller {
    id: LocateRequestId,
    cancelled: Arc<AtomicBool>,
    abort: Arc<AbortHandle>,
}

impl LocateCanceller {
    pub fn id(&self) -> LocateRequestId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// An in-flight, one-shot locate request.
#[derive(Debug)]
pub struct LocateHandle {
    task: JoinHandle<Result<Location, LocateError>>,
    canceller: LocateCanceller,
}

impl LocateHandle {
    pub fn id(&self) -> LocateRequestId {
        self.canceller.id
    }

    pub fn canceller(&self) -> LocateCanceller {
        self.canceller.clone()
    }

    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the request. Once cancelled, this always yields
    /// [`LocateOutcome::Cancelled`], even if a fix had already arrived.
    pub async fn outcome(self) -> LocateOutcome {
        let LocateHandle { task, canceller } = self;
        let result = task.await;
        if canceller.is_cancelled() {
            return LocateOutcome::Cancelled;
        }
        match result {
            Ok(Ok(location)) => LocateOutcome::Located(location),
            Ok(Err(e)) => LocateOutcome::Failed(e),
            Err(e) if e.is_cancelled() => LocateOutcome::Cancelled,
            Err(e) => LocateOutcome::Failed(LocateError::Unavailable(e.to_string())),
        }
    }
}

/// Runs one-shot position requests against a [`PositionSource`] with a
/// bounded time budget.
#[derive(Debug)]
pub struct Locator<P> {
    source: Arc<P>,
    options: PositionOptions,
    next_id: AtomicU64,
}

impl<P: PositionSource> Locator<P> {
    pub fn new(source: P, config: &FacilityConfig) -> Self {
        Self {
            source: Arc::new(source),
            options: PositionOptions::from(config),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> PositionOptions {
        self.options
    }

    /// Start a request on the current tokio runtime.
    pub fn locate(&self) -> LocateHandle {
        let source = self.source.clone();
        let options = self.options;
        let id = LocateRequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(?id, ?options, "Requesting position");
        let task = tokio::spawn(async move {
            let location = tokio::time::timeout(options.timeout, source.current_position(options))
                .await
                .map_err(|_| LocateError::Timeout(options.timeout))??;
            if !location.is_valid() {
                return Err(LocateError::Unavailable(format!(
                    "invalid fix ({}, {})",
                    location.lat, location.lng
                )));
            }
            Ok::<Location, LocateError>(location)
        });
        let canceller = LocateCanceller {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
            abort: Arc::new(task.abort_handle()),
        };
        LocateHandle { task, canceller }
    }
}
