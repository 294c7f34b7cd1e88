//! Segmenting payloads into transport writes under a bounded window

use super::admission::Admission;
use crate::transport::Transport;
use crate::{ProtocolError, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Progress of one payload transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub job_id: u16,
    /// Payload size in bytes
    pub total: usize,
    pub chunk_size: usize,
    pub window: usize,
    /// Bytes handed to the transport so far
    pub cursor: usize,
    pub complete: bool,
}

impl TransferJob {
    pub fn new(job_id: u16, total: usize, chunk_size: usize, window: usize) -> Self {
        Self { job_id, total, chunk_size, window, cursor: 0, complete: total == 0 }
    }

    /// Number of segments the payload splits into.
    pub fn segment_count(&self) -> usize {
        self.total.div_ceil(self.chunk_size)
    }

    fn advance(&mut self, len: usize) {
        self.cursor += len;
        self.complete = self.cursor >= self.total;
    }
}

/// Split `payload` into ordered segments of at most `max` bytes.
pub(crate) fn segments(payload: &[u8], max: usize) -> std::slice::Chunks<'_, u8> {
    payload.chunks(max.max(1))
}

/// Writes payloads segment by segment, one admission credit per segment.
pub struct TransferScheduler {
    admission: Arc<dyn Admission>,
    max_write: usize,
    cancel: CancellationToken,
}

impl TransferScheduler {
    pub fn new(admission: Arc<dyn Admission>, max_write: usize, cancel: CancellationToken) -> Self {
        Self { admission, max_write: max_write.max(1), cancel }
    }

    pub fn max_write(&self) -> usize {
        self.max_write
    }

    pub fn admission(&self) -> &Arc<dyn Admission> {
        &self.admission
    }

    /// Send `payload` through `transport`.
    ///
    /// Each segment waits for a credit first, so no more than the admission
    /// window is ever in flight. Cancellation stops the transfer between
    /// segments with [`ProtocolError::Aborted`].
    pub async fn send<T>(&self, transport: &T, job_id: u16, payload: &[u8]) -> Result<TransferJob>
    where
        T: Transport + ?Sized,
    {
        let window = self.admission.window();
        let mut job = TransferJob::new(job_id, payload.len(), self.max_write, window);
        debug!(
            job_id,
            total = job.total,
            segments = job.segment_count(),
            window = job.window,
            "Starting transfer"
        );

        for segment in segments(payload, self.max_write) {
            let credit = tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(ProtocolError::Aborted { phase: "StreamingData".to_string() });
                }
                credit = self.admission.admit() => credit?,
            };

            transport.write(segment).await?;
            self.admission.sent(credit);
            job.advance(segment.len());

            trace!(
                job_id,
                cursor = job.cursor,
                len = segment.len(),
                in_flight = self.admission.in_flight(),
                "Segment written"
            );
        }

        debug!(job_id, total = job.total, "Transfer complete");
        Ok(job)
    }
}
