//! Counting-credit admission for transport writes
//!
//! The radio link gives no flow-control signal the host can observe, so the
//! number of writes in flight is bounded by credits. How a credit comes back
//! is up to the implementation:
//!
//! - [`PacedAdmission`] returns each credit a fixed delay after the write
//! - [`CompletionAdmission`] returns credits only when the transport reports
//!   a finished write through [`CompletionAdmission::complete`]
//!
//! Callers only ever `admit()`, write, then hand the credit back with `sent()`.

use crate::{ProtocolError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

/// Permission to have one write in flight.
///
/// Dropping a credit returns it to its admission.
#[derive(Debug)]
pub struct Credit {
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
pub trait Admission: Send + Sync + 'static {
    /// Wait until a write may be issued.
    async fn admit(&self) -> Result<Credit>;

    /// Hand back the credit of a write that has been issued.
    fn sent(&self, credit: Credit);

    /// Maximum number of writes in flight.
    fn window(&self) -> usize;

    /// Writes currently holding a credit.
    fn in_flight(&self) -> usize;
}

async fn acquire(semaphore: &Arc<Semaphore>) -> Result<Credit> {
    let permit = semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ProtocolError::Aborted { phase: "transfer admission".to_string() })?;
    Ok(Credit { _permit: permit })
}

/// Releases each credit a fixed delay after its write.
pub struct PacedAdmission {
    semaphore: Arc<Semaphore>,
    window: usize,
    pacing: Duration,
}

impl PacedAdmission {
    pub fn new(window: usize, pacing: Duration) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(window)), window, pacing }
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }
}

#[async_trait]
impl Admission for PacedAdmission {
    async fn admit(&self) -> Result<Credit> {
        acquire(&self.semaphore).await
    }

    fn sent(&self, credit: Credit) {
        if self.pacing.is_zero() {
            return;
        }
        let pacing = self.pacing;
        tokio::spawn(async move {
            tokio::time::sleep(pacing).await;
            drop(credit);
        });
    }

    fn window(&self) -> usize {
        self.window
    }

    fn in_flight(&self) -> usize {
        self.window - self.semaphore.available_permits()
    }
}

/// Releases credits on genuine write-completion events, oldest first.
pub struct CompletionAdmission {
    semaphore: Arc<Semaphore>,
    window: usize,
    outstanding: Mutex<VecDeque<Credit>>,
}

impl CompletionAdmission {
    pub fn new(window: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(window)),
            window,
            outstanding: Mutex::new(VecDeque::with_capacity(window)),
        }
    }

    /// Report one finished write. Returns `false` if nothing was outstanding.
    pub fn complete(&self) -> bool {
        let credit = self.outstanding.lock().pop_front();
        trace!(released = credit.is_some(), "Write completion");
        credit.is_some()
    }
}

#[async_trait]
impl Admission for CompletionAdmission {
    async fn admit(&self) -> Result<Credit> {
        acquire(&self.semaphore).await
    }

    fn sent(&self, credit: Credit) {
        self.outstanding.lock().push_back(credit);
    }

    fn window(&self) -> usize {
        self.window
    }

    fn in_flight(&self) -> usize {
        self.window - self.semaphore.available_permits()
    }
}
