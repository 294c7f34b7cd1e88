//! Print jobs driven end to end against a scripted printer link

use anyhow::Result;
use futures::stream::BoxStream;
use lxwire::codec::{Bitmap, ControlFrame, opcode};
use lxwire::{
    EngineConfig, EngineState, PrintEngine, PrintJob, ProtocolError, TaggedJob, Transport,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Echoes every canonical control frame, counts the announced stream and
/// answers execute with the completion notification. Scripted replies
/// replace the echo for their opcode.
struct ScriptedPrinter {
    writes: Mutex<Vec<Vec<u8>>>,
    replies: Mutex<HashMap<u8, Vec<u8>>>,
    remaining: Mutex<usize>,
    silent: bool,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    block_count: u16,
}

impl ScriptedPrinter {
    fn new(block_count: u16) -> Arc<Self> {
        Self::build(block_count, false)
    }

    fn silent() -> Arc<Self> {
        Self::build(0, true)
    }

    fn build(block_count: u16, silent: bool) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            writes: Mutex::new(Vec::new()),
            replies: Mutex::new(HashMap::new()),
            remaining: Mutex::new(0),
            silent,
            tx,
            rx: Mutex::new(Some(rx)),
            block_count,
        })
    }

    fn reply_with(&self, op: u8, raw: &[u8]) {
        self.replies.lock().insert(op, raw.to_vec());
    }

    fn notify(&self, raw: &[u8]) {
        let _ = self.tx.send(raw.to_vec());
    }

    fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().clone()
    }

    fn answer(&self, data: &[u8]) {
        let mut remaining = self.remaining.lock();
        if *remaining > 0 {
            *remaining = remaining.saturating_sub(data.len());
            return;
        }

        let op = data[1];
        match op {
            opcode::SET_LENGTH => *remaining = u16::from_le_bytes([data[4], data[5]]) as usize,
            // Final acknowledgment gets no answer.
            opcode::START_JOB => return,
            _ => {}
        }
        let reply = self.replies.lock().get(&op).cloned();
        let _ = self.tx.send(reply.unwrap_or_else(|| data.to_vec()));

        if op == opcode::EXECUTE {
            let mut completion = vec![0x5A, opcode::COMPLETION];
            completion.extend_from_slice(&self.block_count.to_le_bytes());
            completion.extend_from_slice(&[0x01, 0x00]);
            let _ = self.tx.send(completion);
        }
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedPrinter {
    async fn write(&self, data: &[u8]) -> lxwire::Result<()> {
        self.writes.lock().push(data.to_vec());
        if !self.silent {
            self.answer(data);
        }
        Ok(())
    }

    async fn subscribe(&self) -> lxwire::Result<BoxStream<'static, Vec<u8>>> {
        let rx = self
            .rx
            .lock()
            .take()
            .ok_or_else(|| ProtocolError::transport_failed("already subscribed"))?;
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

fn checkerboard() -> Result<Bitmap> {
    let data = (0..48).map(|i| if i % 2 == 0 { 0xAA } else { 0x55 }).collect();
    Ok(Bitmap::new(96, 4, data)?)
}

#[tokio::test(start_paused = true)]
async fn set_length_job_completes() -> Result<()> {
    let config = EngineConfig::default();
    let bitmap = checkerboard()?;
    let job = PrintJob::blocks(&bitmap, &config)?.configure(ControlFrame::energy(0x3000));
    let printer = ScriptedPrinter::new(job.block_count);

    let mut engine = PrintEngine::start(printer.clone(), config.clone()).await?;
    let report = engine.print(job.clone()).await?;

    assert_eq!(engine.current_state(), EngineState::Done);
    assert_eq!(report.completion, vec![job.block_count, 1]);
    assert_eq!(engine.unclaimed_notifications(), 0);

    let writes = printer.writes();
    assert!(writes.iter().all(|w| w.len() <= config.max_write));
    assert_eq!(writes[0], ControlFrame::init().encode()?);
    assert_eq!(writes[1], ControlFrame::energy(0x3000).encode()?);
    assert_eq!(writes.last(), Some(&job.completion_ack().encode()?));

    let streamed: usize = writes[3..writes.len() - 2].iter().map(Vec::len).sum();
    assert_eq!(streamed, job.data.len() + job.trailer().len());
    assert_eq!(report.bytes, writes.iter().map(Vec::len).sum::<usize>());
    assert_eq!(report.writes, writes.len());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn yaml_config_shapes_the_writes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("engine.yaml");
    std::fs::write(&path, "max_write: 8\nwindow: 1\ntimeouts:\n  completion_ms: 500\n")?;

    let config = EngineConfig::load(&path)?;
    assert_eq!(config.timeouts.init_ms, 1000);

    let job = PrintJob::blocks(&checkerboard()?, &config)?;
    let printer = ScriptedPrinter::new(job.block_count);
    let mut engine = PrintEngine::start(printer.clone(), config).await?;
    engine.print(job).await?;

    assert!(printer.writes().iter().all(|w| w.len() <= 8));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn silent_printer_times_out_in_initialization() -> Result<()> {
    let printer = ScriptedPrinter::silent();
    let mut engine = PrintEngine::start(printer.clone(), EngineConfig::default()).await?;

    let start = tokio::time::Instant::now();
    let err = engine.print(PrintJob::raster(&checkerboard()?)).await.unwrap_err();
    let elapsed = start.elapsed();

    match err {
        ProtocolError::AckTimeout { opcode, phase, timeout } => {
            assert_eq!(opcode, opcode::INIT);
            assert_eq!(phase, "Initializing");
            assert_eq!(timeout, Duration::from_secs(1));
            assert!(elapsed >= timeout && elapsed < timeout + Duration::from_millis(100));
        }
        other => panic!("expected AckTimeout, got {other:?}"),
    }
    assert_eq!(engine.current_state(), EngineState::Error);
    assert_eq!(printer.writes().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn status_query_reads_battery_and_error() -> Result<()> {
    let printer = ScriptedPrinter::new(0);
    printer.reply_with(opcode::DETAILED_STATUS, &[0x5A, 0xA5, 0x4B, 0x00, 0x02, 0x00]);
    let mut engine = PrintEngine::start(printer.clone(), EngineConfig::default()).await?;

    let status = engine.query_status().await?;
    assert_eq!(status.battery, 0x4B);
    assert_eq!(status.error, Some(0x02));
    assert!(!status.is_ok());
    assert_eq!(printer.writes(), vec![vec![0x5A, 0xA5, 0x01, 0x00, 0x00]]);
    assert_eq!(engine.status_updates().borrow().as_ref(), Some(&status));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unsolicited_status_update_is_delivered() -> Result<()> {
    let printer = ScriptedPrinter::new(0);
    let engine = PrintEngine::start(printer.clone(), EngineConfig::default()).await?;
    let mut updates = engine.status_updates();

    printer.notify(&[0x5A, 0x02, 0x14, 0x00, 0x00]);
    tokio::time::timeout(Duration::from_secs(1), updates.changed()).await??;

    let status = updates.borrow_and_update().clone().expect("status published");
    assert_eq!(status.opcode, opcode::STATUS);
    assert_eq!(status.battery, 20);
    assert!(status.is_ok());
    assert_eq!(engine.unclaimed_notifications(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn tagged_job_sends_energy_rows_and_feed() -> Result<()> {
    let printer = ScriptedPrinter::new(0);
    let config = EngineConfig { max_write: 32, ..EngineConfig::default() };
    let mut engine = PrintEngine::start(printer.clone(), config).await?;

    let job = TaggedJob::from_bitmap(&checkerboard()?, 0x0001)?;
    let report = engine.print_tagged(job).await?;

    let writes = printer.writes();
    assert_eq!(writes.len(), 6);
    assert_eq!(report.writes, 6);
    assert_eq!(writes[0][2], 0xAF);
    assert!(writes[1..5].iter().all(|w| w[2] == 0xA2 && w.len() == 12 + 8));
    assert_eq!(writes[5][2..8], [0xA1, 0x00, 0x02, 0x00, 0x50, 0x00]);
    assert_eq!(engine.current_state(), EngineState::Done);
    Ok(())
}
