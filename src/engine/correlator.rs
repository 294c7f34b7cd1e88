//! Per-opcode correlation of requests and notifications
//!
//! A single dispatcher task owns the inbound notification stream and routes
//! each notification to the slot registered for its opcode. Waiters register
//! before issuing the triggering write, so a fast answer cannot slip past.

use super::notification::Notification;
use super::state::EngineState;
use super::status::PrinterStatus;
use crate::codec::opcode;
use crate::stream::NotificationsExt;
use crate::{ProtocolError, Result};
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

struct Slot {
    id: u64,
    tx: oneshot::Sender<Notification>,
}

#[derive(Default)]
struct Slots {
    open: HashMap<u8, Slot>,
    closed: bool,
}

/// Routes notifications to the waiter registered for their opcode.
pub struct Correlator {
    slots: Mutex<Slots>,
    next_id: AtomicU64,
    unclaimed: AtomicU64,
    status: watch::Sender<Option<PrinterStatus>>,
    cancel: CancellationToken,
}

impl Correlator {
    pub fn new(cancel: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            slots: Mutex::new(Slots::default()),
            next_id: AtomicU64::new(0),
            unclaimed: AtomicU64::new(0),
            status: watch::channel(None).0,
            cancel,
        })
    }

    /// Open the slot for `opcode`.
    ///
    /// Fails with [`ProtocolError::RequestInFlight`] while another waiter
    /// holds the same opcode.
    pub fn register(self: &Arc<Self>, opcode: u8) -> Result<PendingAck> {
        let mut slots = self.slots.lock();
        if slots.closed {
            return Err(ProtocolError::transport_failed("notification stream ended"));
        }
        if slots.open.contains_key(&opcode) {
            return Err(ProtocolError::RequestInFlight { opcode });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        slots.open.insert(opcode, Slot { id, tx });
        trace!(opcode, id, "Registered correlation slot");

        Ok(PendingAck { opcode, id, rx, correlator: Arc::clone(self) })
    }

    /// Route one notification. Returns whether a waiter claimed it.
    pub fn dispatch(&self, notification: Notification) -> bool {
        if notification.opcode == opcode::COMPLETION && !notification.is_completion() {
            return self.unclaimed(notification, "completion notification too short");
        }

        let is_status = notification.opcode == opcode::STATUS;
        if is_status {
            self.publish_status(PrinterStatus::from_notification(&notification));
        }

        let slot = self.slots.lock().open.remove(&notification.opcode);
        match slot {
            Some(slot) => {
                trace!(opcode = notification.opcode, id = slot.id, "Notification routed");
                match slot.tx.send(notification) {
                    Ok(()) => true,
                    Err(notification) => self.unclaimed(notification, "waiter gone"),
                }
            }
            None if is_status => {
                debug!(%notification, "Status update published");
                true
            }
            None => self.unclaimed(notification, "no outstanding request"),
        }
    }

    /// Replace the latest known printer status.
    pub fn publish_status(&self, status: PrinterStatus) {
        self.status.send_replace(Some(status));
    }

    /// Subscribe to printer status updates.
    pub fn status_updates(&self) -> watch::Receiver<Option<PrinterStatus>> {
        self.status.subscribe()
    }

    fn unclaimed(&self, notification: Notification, reason: &str) -> bool {
        let count = self.unclaimed.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(%notification, reason, count, "Unclaimed notification");
        false
    }

    /// Notifications nobody was waiting for.
    pub fn unclaimed_count(&self) -> u64 {
        self.unclaimed.load(Ordering::Relaxed)
    }

    /// Opcodes with an outstanding waiter.
    pub fn outstanding(&self) -> Vec<u8> {
        let mut opcodes: Vec<u8> = self.slots.lock().open.keys().copied().collect();
        opcodes.sort_unstable();
        opcodes
    }

    /// Refuse new registrations and release every waiter.
    pub fn close(&self) {
        let mut slots = self.slots.lock();
        slots.closed = true;
        slots.open.clear();
    }

    /// Spawn the dispatcher task that owns `stream`.
    ///
    /// The task ends when the stream ends or the cancellation token fires;
    /// either way the correlator is closed.
    pub fn spawn_dispatcher(
        self: &Arc<Self>,
        stream: BoxStream<'static, Vec<u8>>,
    ) -> JoinHandle<()> {
        let correlator = Arc::clone(self);
        tokio::spawn(async move { correlator.dispatch_loop(stream).await })
    }

    async fn dispatch_loop(&self, stream: BoxStream<'static, Vec<u8>>) {
        info!("Notification dispatcher started");
        let mut notifications = stream.notifications();
        let mut routed = 0u64;

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Notification dispatcher cancelled");
                    break;
                }
                next = notifications.next() => next,
            };

            match next {
                Some(notification) => {
                    if self.dispatch(notification) {
                        routed += 1;
                    }
                }
                None => {
                    info!("Notification stream ended");
                    break;
                }
            }
        }

        self.close();
        info!(
            routed,
            unclaimed = self.unclaimed_count(),
            skipped = notifications.skipped(),
            "Notification dispatcher ended"
        );
    }

    fn release(&self, opcode: u8, id: u64) {
        let mut slots = self.slots.lock();
        if slots.open.get(&opcode).is_some_and(|slot| slot.id == id) {
            slots.open.remove(&opcode);
        }
    }
}

/// An outstanding request waiting for its notification.
///
/// Dropping it frees the opcode for the next request.
pub struct PendingAck {
    opcode: u8,
    id: u64,
    rx: oneshot::Receiver<Notification>,
    correlator: Arc<Correlator>,
}

impl PendingAck {
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Wait for the notification under `timeout`.
    ///
    /// Fails with [`ProtocolError::AckTimeout`] once the timeout elapses and
    /// with [`ProtocolError::Aborted`] if the engine is aborted first.
    pub async fn wait(mut self, phase: EngineState, timeout: Duration) -> Result<Notification> {
        let cancel = self.correlator.cancel.clone();
        let opcode = self.opcode;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProtocolError::Aborted { phase: phase.to_string() }),
            result = tokio::time::timeout(timeout, &mut self.rx) => match result {
                Ok(Ok(notification)) => Ok(notification),
                Ok(Err(_)) => Err(ProtocolError::transport_failed(format!(
                    "notification stream ended while waiting for opcode {:#04x}",
                    opcode
                ))),
                Err(_) => Err(ProtocolError::AckTimeout {
                    opcode,
                    phase: phase.to_string(),
                    timeout,
                }),
            },
        }
    }
}

impl Drop for PendingAck {
    fn drop(&mut self) {
        self.correlator.release(self.opcode, self.id);
    }
}
