//! Command-line front end: capture conversion, decoding and frame inspection

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use lxwire::btsnoop::format::CAPTURE_MAGIC;
use lxwire::codec::{AppFrame, CodecConfig, Dialect};
use lxwire::snooz::bugreport::BEGIN_MARKER;
use lxwire::{CaptureReader, CaptureReport, CaptureWriter, SnoozContainer};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Decode LX-D01 printer traffic and inspect its frames.
#[derive(Parser, Debug)]
#[command(name = "lxwire")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a bug report or btsnooz container into a btsnoop capture
    Convert {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Capture file to write
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: PathBuf,
    },

    /// Summarize a capture layer by layer
    Decode {
        /// btsnoop capture, btsnooz container or bug report
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(long = "format", value_enum, default_value = "text")]
        format: ReportFormat,

        /// Data block payload size
        #[arg(long = "block-size", default_value = "16")]
        block_size: usize,
    },

    /// Classify one application frame given as hex
    Frame {
        #[arg(value_name = "HEX")]
        hex: String,

        /// Data block payload size
        #[arg(long = "block-size", default_value = "16")]
        block_size: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Yaml,
}

/// What an input file turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Capture,
    Container,
    BugReport,
}

fn sniff(data: &[u8]) -> InputKind {
    if data.starts_with(&CAPTURE_MAGIC) {
        InputKind::Capture
    } else if data.windows(BEGIN_MARKER.len()).any(|w| w == BEGIN_MARKER.as_bytes()) {
        InputKind::BugReport
    } else {
        InputKind::Container
    }
}

fn load_container(path: &Path, data: &[u8], kind: InputKind) -> anyhow::Result<SnoozContainer> {
    let container = match kind {
        InputKind::BugReport => SnoozContainer::from_bugreport(&String::from_utf8_lossy(data))?,
        _ => SnoozContainer::parse(data)?,
    };
    info!(
        path = %path.display(),
        version = ?container.header().version,
        bytes = container.body_len(),
        "Container loaded"
    );
    Ok(container)
}

fn convert(input: &Path, output: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let kind = sniff(&data);
    if kind == InputKind::Capture {
        bail!("{} is already a btsnoop capture", input.display());
    }

    let container = load_container(input, &data, kind)?;
    let mut writer = CaptureWriter::create(output)?;
    let mut records = 0usize;
    for record in container.into_records()? {
        writer.write_record(&record?)?;
        records += 1;
    }
    writer.finish()?;

    info!(output = %output.display(), records, "Capture written");
    println!("wrote {} records to {}", records, output.display());
    Ok(())
}

fn decode(input: &Path, format: ReportFormat, codec: &CodecConfig) -> anyhow::Result<()> {
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let report = match sniff(&data) {
        InputKind::Capture => {
            let reader = CaptureReader::new(Cursor::new(data))?;
            CaptureReport::from_records(reader, codec)?
        }
        kind => {
            let container = load_container(input, &data, kind)?;
            CaptureReport::from_records(container.into_records()?, codec)?
        }
    };

    match format {
        ReportFormat::Text => print!("{}", report),
        ReportFormat::Yaml => print!("{}", report.to_yaml()?),
    }
    Ok(())
}

fn parse_hex(text: &str) -> anyhow::Result<Vec<u8>> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits");
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

fn frame(hex: &str, codec: &CodecConfig) -> anyhow::Result<()> {
    let bytes = parse_hex(hex)?;
    println!("dialect: {}", Dialect::of(&bytes));
    match AppFrame::decode(&bytes, codec) {
        Ok(frame) => println!("frame: {}", frame),
        Err(e) => {
            println!("error: {}", e);
            for suggestion in e.recovery_suggestions() {
                println!("  - {}", suggestion);
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match args.command {
        Command::Convert { input, output } => convert(&input, &output),
        Command::Decode { input, format, block_size } => {
            decode(&input, format, &CodecConfig { block_size })
        }
        Command::Frame { hex, block_size } => frame(&hex, &CodecConfig { block_size }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_accepts_common_separators() {
        assert_eq!(parse_hex("5a 01 00 00").unwrap(), vec![0x5A, 0x01, 0x00, 0x00]);
        assert_eq!(parse_hex("0x5A:0B").unwrap(), vec![0x5A, 0x0B]);
        assert!(parse_hex("5a0").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn inputs_are_sniffed() {
        assert_eq!(sniff(b"btsnoop\0\0\0\0\x01"), InputKind::Capture);
        let report = b"== dumpsys ==\n--- BEGIN:BTSNOOP_LOG_SUMMARY (1 bytes)\n";
        assert_eq!(sniff(report), InputKind::BugReport);
        assert_eq!(sniff(&[0x02, 0x00]), InputKind::Container);
    }
}
