use std::io::{stdout, Write};

use anyhow::{Context, Result};
use sensorframe::{DecodeAttempt, FrameLayout, FrameScanner, ScanOpts, Summary};
use tracing::info;

pub fn scan(buf: &[u8], layout: &FrameLayout, opts: ScanOpts, json: bool) -> Result<()> {
    let mut out = stdout().lock();
    let mut summary = Summary::default();
    for attempt in FrameScanner::new(buf, layout).with_opts(opts).attempts() {
        summary.add(&attempt);
        if json {
            serde_json::to_writer(&mut out, &attempt).context("serializing to json")?;
            writeln!(out).context("writing to stdout")?;
        } else {
            write_attempt(&mut out, &attempt).context("writing to stdout")?;
        }
    }
    info!(
        "{} sync matches, {} valid, {} invalid",
        summary.rows, summary.valid, summary.invalid
    );
    Ok(())
}

fn write_attempt<W: Write>(out: &mut W, attempt: &DecodeAttempt) -> std::io::Result<()> {
    if !attempt.sync_matched {
        return writeln!(out, "{:>10} nosync", attempt.offset);
    }
    let status = if attempt.checksum_valid { "valid" } else { "invalid" };
    write!(out, "{:>10} {status:<7}", attempt.offset)?;
    if let (Some(checksum), Some(expected)) = (attempt.checksum, attempt.expected) {
        write!(out, " crc={checksum:02x} expected={expected:02x}")?;
    }
    writeln!(out)
}
