//! Command transaction engine

use super::correlator::Correlator;
use super::job::{JobStart, PrintJob, TaggedJob};
use super::notification::Notification;
use super::state::EngineState;
use super::status::PrinterStatus;
use crate::codec::{ControlFrame, opcode};
use crate::config::EngineConfig;
use crate::transfer::{Admission, TransferScheduler};
use crate::transport::Transport;
use crate::{ProtocolError, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of a completed print job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job_id: u16,
    /// Transport writes issued, control frames included
    pub writes: usize,
    /// Bytes written, control frames included
    pub bytes: usize,
    /// Words of the completion notification
    pub completion: Vec<u16>,
}

impl JobReport {
    fn record(&mut self, writes: usize, bytes: usize) {
        self.writes += writes;
        self.bytes += bytes;
    }
}

/// Drives print jobs and ad-hoc commands over a [`Transport`].
///
/// Starting the engine subscribes to the transport and spawns the
/// notification dispatcher. Requests are correlated with their answers by
/// opcode; the lifecycle state is published on a watch channel.
///
/// The abort token is shared by every wait and transfer of the engine.
/// Cancelling it fails the running operation with [`ProtocolError::Aborted`]
/// and ends the engine's session.
pub struct PrintEngine {
    transport: Arc<dyn Transport>,
    config: EngineConfig,
    correlator: Arc<Correlator>,
    scheduler: TransferScheduler,
    state: watch::Sender<EngineState>,
    cancel: CancellationToken,
    dispatcher: JoinHandle<()>,
    next_job_id: u16,
}

impl PrintEngine {
    /// Start an engine with paced admission sized from `config`.
    pub async fn start(transport: Arc<dyn Transport>, config: EngineConfig) -> Result<Self> {
        let admission = config.admission();
        Self::with_admission(transport, config, admission).await
    }

    /// Start an engine with a caller-provided admission policy.
    pub async fn with_admission(
        transport: Arc<dyn Transport>,
        config: EngineConfig,
        admission: Arc<dyn Admission>,
    ) -> Result<Self> {
        config.validate()?;

        let cancel = CancellationToken::new();
        let correlator = Correlator::new(cancel.clone());
        let inbound = transport.subscribe().await?;
        let dispatcher = correlator.spawn_dispatcher(inbound);
        let scheduler = TransferScheduler::new(admission, config.max_write, cancel.clone());
        let (state, _) = watch::channel(EngineState::Idle);

        info!(
            max_write = config.max_write,
            window = config.window,
            framing = ?config.framing,
            "Print engine started"
        );

        Ok(Self {
            transport,
            config,
            correlator,
            scheduler,
            state,
            cancel,
            dispatcher,
            next_job_id: 1,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to lifecycle state changes.
    pub fn state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Token that aborts the engine when cancelled.
    pub fn abort_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn abort(&self) {
        info!(state = %self.current_state(), "Print engine aborted");
        self.cancel.cancel();
    }

    /// Notifications that arrived with no request waiting for them.
    pub fn unclaimed_notifications(&self) -> u64 {
        self.correlator.unclaimed_count()
    }

    /// Send one control frame and wait for its answer.
    ///
    /// Uses the configure timeout. The lifecycle state is left untouched.
    pub async fn command(&mut self, frame: ControlFrame) -> Result<Notification> {
        let mut report = JobReport::default();
        self.exchange(frame, EngineState::Configuring, &mut report).await
    }

    /// Ask the printer for its detailed status.
    ///
    /// A reported error code is part of the returned status rather than a
    /// failure. The answer also becomes the latest published status.
    pub async fn query_status(&mut self) -> Result<PrinterStatus> {
        let mut report = JobReport::default();
        let frame = ControlFrame::detailed_status();
        let reply = self.request(frame, EngineState::Configuring, &mut report).await?;

        let status = PrinterStatus::from_notification(&reply);
        debug!(%status, "Printer status");
        self.correlator.publish_status(status.clone());
        Ok(status)
    }

    /// Subscribe to printer status, updated by unsolicited status
    /// notifications and by [`PrintEngine::query_status`].
    pub fn status_updates(&self) -> watch::Receiver<Option<PrinterStatus>> {
        self.correlator.status_updates()
    }

    /// Run `job` through the full lifecycle.
    ///
    /// On failure the state moves to [`EngineState::Error`] and the error of
    /// the failing phase is returned; nothing is retried.
    pub async fn print(&mut self, job: PrintJob) -> Result<JobReport> {
        let job_id = self.take_job_id();
        info!(job_id, start = ?job.start, bytes = job.data.len(), "Print job started");

        let result = self.run(job_id, &job).await;
        self.finish(job_id, result)
    }

    /// Print `job` in the tagged dialect.
    ///
    /// Nothing is awaited from the printer: frames go out in order, each
    /// through the scheduler, and the job is done once the feed is written.
    pub async fn print_tagged(&mut self, job: TaggedJob) -> Result<JobReport> {
        let job_id = self.take_job_id();
        info!(job_id, frames = job.frames.len(), "Tagged print job started");

        let result = self.run_tagged(job_id, &job).await;
        self.finish(job_id, result)
    }

    fn take_job_id(&mut self) -> u16 {
        let job_id = self.next_job_id;
        self.next_job_id = self.next_job_id.wrapping_add(1);
        job_id
    }

    fn finish(&self, job_id: u16, result: Result<JobReport>) -> Result<JobReport> {
        match result {
            Ok(report) => {
                self.enter(EngineState::Done);
                info!(job_id, writes = report.writes, bytes = report.bytes, "Print job done");
                Ok(report)
            }
            Err(e) => {
                warn!(job_id, state = %self.current_state(), error = %e, "Print job failed");
                self.enter(EngineState::Error);
                Err(e)
            }
        }
    }

    async fn run(&self, job_id: u16, job: &PrintJob) -> Result<JobReport> {
        let mut report = JobReport { job_id, ..JobReport::default() };
        let framing = self.config.framing;

        self.enter(EngineState::Initializing);
        let init = ControlFrame::init().with_framing(framing);
        self.exchange(init, EngineState::Initializing, &mut report).await?;

        self.enter(EngineState::Configuring);
        for frame in &job.configure {
            self.exchange(frame.clone(), EngineState::Configuring, &mut report).await?;
        }

        self.enter(EngineState::AwaitingLengthAck);
        let start = match job.start {
            JobStart::SetLength => job.start_frame()?.with_framing(framing),
            _ => job.start_frame()?,
        };
        self.exchange(start, EngineState::AwaitingLengthAck, &mut report).await?;

        // Armed before streaming: block jobs complete straight after the last block.
        let completion = self.correlator.register(opcode::COMPLETION)?;

        self.enter(EngineState::StreamingData);
        self.send(job_id, &job.data, &mut report).await?;

        let trailer = job.trailer();
        if !trailer.is_empty() {
            if self.config.await_checksum_ack {
                let checksum = self.correlator.register(job.start.opcode())?;
                self.send(job_id, &trailer, &mut report).await?;
                self.enter(EngineState::AwaitingChecksumAck);
                let timeout = self.config.timeouts.for_state(EngineState::AwaitingChecksumAck);
                let reply = checksum.wait(EngineState::AwaitingChecksumAck, timeout).await?;
                check_status(&reply)?;
            } else {
                self.send(job_id, &trailer, &mut report).await?;
            }
        }

        if !matches!(job.start, JobStart::StartBlocks { .. }) {
            self.enter(EngineState::AwaitingExecuteAck);
            let execute = ControlFrame::execute().with_framing(framing);
            self.exchange(execute, EngineState::AwaitingExecuteAck, &mut report).await?;
        }

        self.enter(EngineState::AwaitingCompletionNotification);
        let phase = EngineState::AwaitingCompletionNotification;
        let done = completion.wait(phase, self.config.timeouts.for_state(phase)).await?;
        report.completion = done.words();
        debug!(job_id, completion = ?report.completion, "Completion notification received");

        self.enter(EngineState::Acknowledged);
        let ack = job.completion_ack().to_bytes()?;
        self.send(job_id, &ack, &mut report).await?;

        Ok(report)
    }

    async fn run_tagged(&self, job_id: u16, job: &TaggedJob) -> Result<JobReport> {
        let mut report = JobReport { job_id, ..JobReport::default() };
        self.enter(EngineState::StreamingData);
        for frame in job.encode()? {
            self.send(job_id, &frame, &mut report).await?;
        }
        Ok(report)
    }

    /// Write `frame` and wait for an accepted answer carrying its opcode.
    async fn exchange(
        &self,
        frame: ControlFrame,
        phase: EngineState,
        report: &mut JobReport,
    ) -> Result<Notification> {
        let request = frame.to_bytes()?;
        let reply = self.request(frame, phase, report).await?;

        if !reply.mirrors(&request) {
            check_status(&reply)?;
        }
        debug!(%phase, %reply, "Control frame acknowledged");
        Ok(reply)
    }

    /// Write `frame` and wait for the answer carrying its opcode.
    async fn request(
        &self,
        frame: ControlFrame,
        phase: EngineState,
        report: &mut JobReport,
    ) -> Result<Notification> {
        let request = frame.to_bytes()?;
        let pending = self.correlator.register(frame.opcode)?;
        debug!(%phase, opcode = frame.opcode, len = request.len(), "Sending control frame");

        self.send(report.job_id, &request, report).await?;
        pending.wait(phase, self.config.timeouts.for_state(phase)).await
    }

    async fn send(&self, job_id: u16, payload: &[u8], report: &mut JobReport) -> Result<()> {
        let transfer = self.scheduler.send(self.transport.as_ref(), job_id, payload).await?;
        report.record(transfer.segment_count(), transfer.total);
        Ok(())
    }

    fn enter(&self, state: EngineState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "State transition");
        }
    }
}

/// Accept an answer whose status byte is absent or zero.
fn check_status(reply: &Notification) -> Result<()> {
    match reply.status() {
        None | Some(0) => Ok(()),
        Some(code) => Err(ProtocolError::CommandRejected { opcode: reply.opcode, code }),
    }
}

impl Drop for PrintEngine {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
