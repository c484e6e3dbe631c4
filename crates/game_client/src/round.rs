//! Round orchestration: two concurrent metadata → image chains joined into one result.
//!
//! Each round owns a cancellation token and the task driving it. Starting a new
//! round or calling [`RoundOrchestrator::cancel_round`] drops the previous
//! `ActiveRound`, which cancels and aborts it. Completion is only delivered
//! while the finishing round is still the current one, so a superseded round
//! never reaches the observer.

use std::{
    fmt,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use futures::{future, FutureExt};
use shared::error::GameError;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    images::{DecodedImage, ImageSource},
    unsplash::RandomImageSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoundId(pub u64);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The two images of a successful round. `first` always comes from the first chain.
#[derive(Debug, Clone)]
pub struct RoundResult {
    pub first: DecodedImage,
    pub second: DecodedImage,
}

#[derive(Debug)]
pub enum RoundOutcome {
    Succeeded(RoundResult),
    Failed(GameError),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Idle,
    FetchingBoth,
}

/// Consumer of round completions.
///
/// Called with the orchestrator's round lock held: implementations must not
/// block or call back into the orchestrator synchronously.
pub trait RoundObserver: Send + Sync {
    fn on_round_succeeded(&self, round_id: RoundId, first: DecodedImage, second: DecodedImage);
    fn on_round_failed(&self, round_id: RoundId, error: GameError);
}

#[derive(Debug)]
pub enum RoundEvent {
    Succeeded {
        round_id: RoundId,
        result: RoundResult,
    },
    Failed {
        round_id: RoundId,
        error: GameError,
    },
}

impl RoundObserver for mpsc::UnboundedSender<RoundEvent> {
    fn on_round_succeeded(&self, round_id: RoundId, first: DecodedImage, second: DecodedImage) {
        let event = RoundEvent::Succeeded {
            round_id,
            result: RoundResult { first, second },
        };
        if self.send(event).is_err() {
            debug!(%round_id, "round event receiver dropped");
        }
    }

    fn on_round_failed(&self, round_id: RoundId, error: GameError) {
        if self.send(RoundEvent::Failed { round_id, error }).is_err() {
            debug!(%round_id, "round event receiver dropped");
        }
    }
}

struct ActiveRound {
    id: RoundId,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ActiveRound {
    /// Releases a round whose task has already produced its outcome.
    fn finish(mut self) {
        self.task.take();
    }
}

impl Drop for ActiveRound {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct RoundInner {
    metadata: Arc<dyn RandomImageSource>,
    images: Arc<dyn ImageSource>,
    observer: Arc<dyn RoundObserver>,
    current: Mutex<Option<ActiveRound>>,
    next_round: AtomicU64,
}

impl RoundInner {
    fn lock_current(&self) -> MutexGuard<'_, Option<ActiveRound>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_chain(&self, slot: &'static str) -> Result<DecodedImage, GameError> {
        let metadata = self.metadata.fetch_random_image_metadata().await?;
        debug!(slot, photo_id = %metadata.id, "chain resolved image url");
        self.images.download_image(&metadata.image_url).await
    }

    async fn run_round(&self, cancel: &CancellationToken) -> RoundOutcome {
        let first = self.run_chain("first");
        let second = self.run_chain("second");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => RoundOutcome::Cancelled,
            joined = future::try_join(first, second) => match joined {
                Ok((first, second)) => {
                    if first.source_url() == second.source_url() {
                        warn!(url = %first.source_url(), "both chains returned the same image");
                    }
                    RoundOutcome::Succeeded(RoundResult { first, second })
                }
                Err(error) => RoundOutcome::Failed(error),
            },
        }
    }

    fn complete(&self, round_id: RoundId, outcome: RoundOutcome) {
        let delivery = match outcome {
            RoundOutcome::Succeeded(result) => Ok(result),
            RoundOutcome::Failed(error) => Err(error),
            RoundOutcome::Cancelled => {
                debug!(%round_id, "round cancelled before completion");
                return;
            }
        };

        let mut current = self.lock_current();
        let is_current = matches!(
            current.as_ref(),
            Some(active) if active.id == round_id && !active.cancel.is_cancelled()
        );
        if !is_current {
            debug!(%round_id, "discarding outcome of superseded round");
            return;
        }
        if let Some(active) = current.take() {
            active.finish();
        }

        match delivery {
            Ok(result) => {
                info!(%round_id, "round succeeded");
                self.observer
                    .on_round_succeeded(round_id, result.first, result.second);
            }
            Err(error) => {
                warn!(%round_id, code = error.code(), "round failed: {error}");
                self.observer.on_round_failed(round_id, error);
            }
        }
    }
}

#[derive(Clone)]
pub struct RoundOrchestrator {
    inner: Arc<RoundInner>,
}

impl RoundOrchestrator {
    pub fn new(
        metadata: Arc<dyn RandomImageSource>,
        images: Arc<dyn ImageSource>,
        observer: Arc<dyn RoundObserver>,
    ) -> Self {
        Self {
            inner: Arc::new(RoundInner {
                metadata,
                images,
                observer,
                current: Mutex::new(None),
                next_round: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> RoundState {
        if self.inner.lock_current().is_some() {
            RoundState::FetchingBoth
        } else {
            RoundState::Idle
        }
    }

    /// Cancels any in-flight round and spawns a new one on the current tokio runtime.
    pub fn start_round(&self) -> RoundId {
        let mut current = self.inner.lock_current();
        if let Some(previous) = current.take() {
            info!(round_id = %previous.id, "cancelling superseded round");
            drop(previous);
        }

        let round_id = RoundId(self.inner.next_round.fetch_add(1, Ordering::Relaxed) + 1);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            // A panicking source must still release the slot and report a failure.
            let outcome = AssertUnwindSafe(inner.run_round(&token))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(%round_id, "round task panicked");
                    RoundOutcome::Failed(GameError::transport("round task panicked"))
                });
            inner.complete(round_id, outcome);
        });

        info!(%round_id, "round started");
        *current = Some(ActiveRound {
            id: round_id,
            cancel,
            task: Some(task),
        });
        round_id
    }

    /// Returns whether a round was in flight.
    pub fn cancel_round(&self) -> bool {
        let previous = self.inner.lock_current().take();
        match previous {
            Some(active) => {
                info!(round_id = %active.id, "round cancelled");
                drop(active);
                true
            }
            None => false,
        }
    }

    /// Runs one round inline without touching the current-round slot or the observer.
    pub async fn run_round(&self, cancel: &CancellationToken) -> RoundOutcome {
        self.inner.run_round(cancel).await
    }
}

#[cfg(test)]
#[path = "tests/round_tests.rs"]
mod tests;
