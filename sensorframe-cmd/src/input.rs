use std::fs::File;
use std::io::stdin;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use sensorframe::{
    Advance, ByteSource, FrameLayout, LayoutConfig, Limit, ReaderSource, ScanOpts, SourceSpec,
};
use tracing::{debug, info};

/// Where the raw bytes come from.
#[derive(Args)]
pub struct Input {
    /// Input dump path or file:// URL; use - for stdin.
    pub input: String,

    /// Link bit rate, recorded for device inputs.
    #[arg(long, default_value_t = SourceSpec::DEFAULT_BAUDRATE)]
    pub baudrate: u32,

    /// Maximum number of bytes to read from the input.
    #[arg(long, default_value_t = ReaderSource::<File>::DEFAULT_MAX_BYTES, value_name = "num")]
    pub max_bytes: usize,
}

impl Input {
    pub fn acquire(&self) -> Result<Vec<u8>> {
        let buf = if self.input == "-" {
            ReaderSource::new(stdin().lock())
                .with_max_bytes(self.max_bytes)
                .acquire()
                .context("reading stdin")?
        } else {
            SourceSpec::new(&self.input)
                .with_baudrate(self.baudrate)
                .open()
                .with_context(|| format!("opening {}", self.input))?
                .with_max_bytes(self.max_bytes)
                .acquire()
                .with_context(|| format!("reading {}", self.input))?
        };
        info!("read {} bytes from {}", buf.len(), self.input);
        Ok(buf)
    }
}

/// Frame layout, either from a JSON layout file or given inline.
#[derive(Args)]
pub struct LayoutArgs {
    /// JSON layout file with names, format, scales and optional sync_marker.
    #[arg(short, long, value_name = "path", conflicts_with_all = ["names", "format", "scales"])]
    pub layout: Option<PathBuf>,

    /// Field names.
    #[arg(short, long, value_delimiter = ',', value_name = "csv")]
    pub names: Vec<String>,

    /// Field format codes, e.g., Iffff.
    #[arg(short, long, value_name = "codes")]
    pub format: Option<String>,

    /// Per-field scale factors.
    #[arg(short, long, value_delimiter = ',', value_name = "csv", allow_negative_numbers = true)]
    pub scales: Vec<f64>,
}

impl LayoutArgs {
    pub fn load(&self) -> Result<FrameLayout> {
        let config = match (&self.layout, &self.format) {
            (Some(path), _) => {
                let file = File::open(path).with_context(|| format!("opening {path:?}"))?;
                serde_json::from_reader::<_, LayoutConfig>(file)
                    .with_context(|| format!("parsing layout {path:?}"))?
            }
            (None, Some(format)) => LayoutConfig {
                names: self.names.clone(),
                format: format.clone(),
                scales: self.scales.clone(),
                sync_marker: None,
            },
            (None, None) => bail!("a layout is required; use --layout or --names/--format/--scales"),
        };
        let layout = FrameLayout::try_from(config).context("invalid layout")?;
        debug!(
            "layout {} with {} byte frames",
            layout.format(),
            layout.frame_size()
        );
        Ok(layout)
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum AdvanceArg {
    /// Test every byte offset.
    One,
    /// Skip a whole frame after a sync match.
    Frame,
}

/// Scan tuning shared by all subcommands.
#[derive(Args)]
pub struct ScanArgs {
    /// Offset advance after a sync match.
    #[arg(long, default_value = "one")]
    pub advance: AdvanceArg,

    /// Stop after this many sync-matched attempts; defaults to input length / frame size.
    #[arg(long, value_name = "num", conflicts_with = "no_limit")]
    pub limit: Option<usize>,

    /// Scan every offset of the input regardless of its length.
    #[arg(long, action)]
    pub no_limit: bool,
}

impl ScanArgs {
    pub fn opts(&self) -> ScanOpts {
        let limit = match (self.limit, self.no_limit) {
            (Some(max), _) => Limit::Max(max),
            (None, true) => Limit::Unbounded,
            (None, false) => Limit::FromLength,
        };
        let advance = match self.advance {
            AdvanceArg::One => Advance::ByOne,
            AdvanceArg::Frame => Advance::ByFrame,
        };
        ScanOpts::new().with_advance(advance).with_limit(limit)
    }
}
