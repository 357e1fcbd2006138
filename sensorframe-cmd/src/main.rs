mod decode;
mod info;
mod input;
mod scan;

use std::io::stderr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use input::{Input, LayoutArgs, ScanArgs};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a telemetry dump into column series.
    ///
    /// Every byte offset is checked for the sync marker. Frames failing the CRC-8
    /// check are output as rows with crc=0 and NaN (null in JSON) values.
    Decode {
        #[command(flatten)]
        input: Input,

        #[command(flatten)]
        layout: LayoutArgs,

        #[command(flatten)]
        scan: ScanArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: decode::Format,

        /// Number of rows to show with text output.
        #[arg(long, default_value = "10", value_name = "num")]
        rows: usize,
    },
    /// Show frame statistics for a telemetry dump.
    Info {
        #[command(flatten)]
        input: Input,

        #[command(flatten)]
        layout: LayoutArgs,

        #[command(flatten)]
        scan: ScanArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: info::Format,
    },
    /// List every frame decode attempt in a telemetry dump.
    Scan {
        #[command(flatten)]
        input: Input,

        #[command(flatten)]
        layout: LayoutArgs,

        #[command(flatten)]
        scan: ScanArgs,

        /// Also list offsets where the sync marker did not match.
        ///
        /// This produces one line for nearly every input byte.
        #[arg(long, action)]
        diagnostics: bool,

        /// Output one JSON object per attempt rather than text.
        #[arg(long, action)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("SENSORFRAME_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Decode {
            input,
            layout,
            scan,
            output,
            rows,
        } => {
            let layout = layout.load()?;
            let buf = input.acquire()?;
            decode::decode(&buf, &layout, scan.opts(), output, *rows)
        }
        Commands::Info {
            input,
            layout,
            scan,
            output,
        } => {
            let layout = layout.load()?;
            let buf = input.acquire()?;
            info::info(&input.input, &buf, &layout, scan.opts(), output)
        }
        Commands::Scan {
            input,
            layout,
            scan,
            diagnostics,
            json,
        } => {
            let layout = layout.load()?;
            let buf = input.acquire()?;
            let opts = scan.opts().with_diagnostics(*diagnostics);
            scan::scan(&buf, &layout, opts, *json)
        }
    }
}
