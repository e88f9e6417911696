use crate::error::ItemError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Caps how many remote calls are in flight. A permit is held for one network
/// attempt only, so items waiting out a backoff do not hold capacity.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl ConcurrencyGate {
    #[must_use]
    pub fn new(limit: usize, cancel: CancellationToken) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            cancel,
        }
    }

    /// Waits for a free slot.
    ///
    /// # Errors
    ///
    /// * [`ItemError::Cancelled`] once the run is cancelled, even if a slot is free.
    pub async fn acquire(&self) -> Result<GatePermit, ItemError> {
        let permit = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(ItemError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                permit.map_err(|_| ItemError::Cancelled)?
            }
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(GatePermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at the same time so far.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
