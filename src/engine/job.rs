//! Print job descriptions

use crate::codec::tagged::DEFAULT_FEED_LINES;
use crate::codec::{Bitmap, ControlFrame, TaggedFrame, TrailerChecksum, opcode, print_sequence};
use crate::config::EngineConfig;
use crate::{ProtocolError, Result};

/// How a job announces its data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStart {
    /// `0x0B` with the stream length, CRC-16 trailer
    SetLength,
    /// `0xA1` with the raster size, CRC-32 trailer
    StartRaster { width: u16, height: u16 },
    /// `0x04` with the block count and a job id, no trailer
    StartBlocks { job_id: u16 },
}

impl JobStart {
    pub fn opcode(self) -> u8 {
        match self {
            JobStart::SetLength => opcode::SET_LENGTH,
            JobStart::StartRaster { .. } => opcode::START_RASTER,
            JobStart::StartBlocks { .. } => opcode::START_JOB,
        }
    }

    pub fn checksum(self) -> TrailerChecksum {
        TrailerChecksum::for_opcode(self.opcode())
    }
}

/// One job for [`PrintEngine::print`](super::PrintEngine::print).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    pub start: JobStart,
    /// Frames sent while configuring, each acknowledged before the next
    pub configure: Vec<ControlFrame>,
    /// Data stream written after the start frame is acknowledged
    pub data: Vec<u8>,
    /// Block count reported in the final acknowledgment
    pub block_count: u16,
}

impl PrintJob {
    /// Bitmap sent as data blocks behind a set-length announcement.
    pub fn blocks(bitmap: &Bitmap, config: &EngineConfig) -> Result<Self> {
        let blocks = bitmap.to_blocks(config.block_size, config.lines_per_block)?;
        let data = bitmap.block_stream(config.block_size, config.lines_per_block)?;
        Ok(Self {
            start: JobStart::SetLength,
            configure: Vec::new(),
            data,
            block_count: block_count(blocks.len())?,
        })
    }

    /// Bitmap sent as raw raster rows.
    pub fn raster(bitmap: &Bitmap) -> Self {
        Self {
            start: JobStart::StartRaster { width: bitmap.width(), height: bitmap.height() },
            configure: Vec::new(),
            data: bitmap.as_bytes().to_vec(),
            block_count: bitmap.height(),
        }
    }

    /// Bitmap sent as data blocks behind a numbered job start.
    pub fn numbered_blocks(bitmap: &Bitmap, job_id: u16, config: &EngineConfig) -> Result<Self> {
        let job = Self::blocks(bitmap, config)?;
        Ok(Self { start: JobStart::StartBlocks { job_id }, ..job })
    }

    /// Add a configuration frame, sent after initialization.
    pub fn configure(mut self, frame: ControlFrame) -> Self {
        self.configure.push(frame);
        self
    }

    /// Frame that announces the data stream.
    pub fn start_frame(&self) -> Result<ControlFrame> {
        match self.start {
            JobStart::SetLength => {
                let total = self.data.len() + self.start.checksum().len();
                let total = u16::try_from(total).map_err(|_| {
                    ProtocolError::malformed_frame(format!(
                        "stream of {} bytes does not fit a 16-bit length",
                        total
                    ))
                })?;
                Ok(ControlFrame::set_length(total))
            }
            JobStart::StartRaster { width, height } => {
                Ok(ControlFrame::start_raster(width, height))
            }
            JobStart::StartBlocks { job_id } => {
                Ok(ControlFrame::start_job(self.block_count, job_id))
            }
        }
    }

    /// Checksum bytes written after the data stream.
    pub fn trailer(&self) -> Vec<u8> {
        self.start.checksum().trailer(&self.data)
    }

    /// Frame written after the completion notification.
    pub fn completion_ack(&self) -> ControlFrame {
        ControlFrame::completion_ack(self.block_count)
    }
}

/// Bitmap printed in the tagged dialect.
///
/// The printer acknowledges none of these frames; they are written back to
/// back under the scheduler's pacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedJob {
    pub frames: Vec<TaggedFrame>,
}

impl TaggedJob {
    /// Energy, one draw frame per row, then the default paper feed.
    pub fn from_bitmap(bitmap: &Bitmap, energy: u16) -> Result<Self> {
        Self::with_feed(bitmap, energy, DEFAULT_FEED_LINES)
    }

    pub fn with_feed(bitmap: &Bitmap, energy: u16, feed_lines: u16) -> Result<Self> {
        Ok(Self { frames: print_sequence(bitmap, energy, feed_lines)? })
    }

    /// Wire bytes of every frame, in order.
    pub fn encode(&self) -> Result<Vec<Vec<u8>>> {
        self.frames.iter().map(TaggedFrame::encode).collect()
    }
}

fn block_count(count: usize) -> Result<u16> {
    u16::try_from(count).map_err(|_| {
        ProtocolError::malformed_frame(format!("{} blocks exceed a 16-bit block count", count))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::crc16_xmodem;

    fn bitmap() -> Bitmap {
        // 64 dots wide, 5 rows: 40 bytes, three 16-byte blocks.
        Bitmap::new(64, 5, (0..40).collect()).unwrap()
    }

    #[test]
    fn set_length_counts_the_trailer() {
        let job = PrintJob::blocks(&bitmap(), &EngineConfig::default()).unwrap();
        assert_eq!(job.block_count, 3);
        assert_eq!(job.data.len(), 3 * 20);

        let start = job.start_frame().unwrap();
        assert_eq!(start.opcode, opcode::SET_LENGTH);
        assert_eq!(start.words(), vec![62]);
        assert_eq!(job.trailer(), crc16_xmodem(&job.data).to_be_bytes().to_vec());
    }

    #[test]
    fn tagged_job_wraps_rows_in_energy_and_feed() {
        let job = TaggedJob::from_bitmap(&bitmap(), 0x0001).unwrap();
        assert_eq!(job.frames.len(), 7);
        assert_eq!(job.frames[0], TaggedFrame::energy(1));
        assert_eq!(job.frames[1], TaggedFrame::draw((0..8).collect::<Vec<u8>>()));
        assert_eq!(job.frames[6], TaggedFrame::feed(0x50));

        let bytes = job.encode().unwrap();
        assert!(bytes.iter().all(|frame| frame.starts_with(&[0x51, 0x78])));
        assert_eq!(bytes[5].len(), 8 + 8);
    }

    #[test]
    fn raster_job_uses_crc32() {
        let job = PrintJob::raster(&bitmap());
        assert_eq!(job.start_frame().unwrap().words(), vec![64, 5, 0]);
        assert_eq!(job.trailer().len(), 4);
        assert_eq!(job.block_count, 5);
    }

    #[test]
    fn numbered_blocks_carry_the_job_id() {
        let job = PrintJob::numbered_blocks(&bitmap(), 7, &EngineConfig::default())
            .unwrap()
            .configure(ControlFrame::energy(0x3000));
        let start = job.start_frame().unwrap();
        assert_eq!(start.to_bytes().unwrap()[..6], [0x5A, 0x04, 0x03, 0x00, 0x07, 0x00]);
        assert!(job.trailer().is_empty());
        assert_eq!(job.configure.len(), 1);
        assert_eq!(job.completion_ack().words(), vec![3, 0x0100, 0, 0, 0]);
    }

    #[test]
    fn oversized_stream_is_rejected() {
        let job = PrintJob {
            start: JobStart::SetLength,
            configure: Vec::new(),
            data: vec![0; 70_000],
            block_count: 0,
        };
        assert!(matches!(job.start_frame(), Err(ProtocolError::MalformedApplicationFrame { .. })));
    }
}
