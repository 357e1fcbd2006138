use std::io::{stdout, Write};

use anyhow::{Context, Result};
use sensorframe::{decode_with, Capacity, FrameLayout, ScanOpts, SeriesDataset};
use tracing::info;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Format {
    Json,
    Csv,
    Text,
}

pub fn decode(
    buf: &[u8],
    layout: &FrameLayout,
    opts: ScanOpts,
    format: &Format,
    rows: usize,
) -> Result<()> {
    let data = decode_with(buf, layout, opts, Capacity::Grow).context("decoding")?;
    info!("decoded {} rows, {} valid", data.len(), data.valid_count());

    let mut out = stdout().lock();
    match format {
        Format::Json => {
            serde_json::to_writer(&mut out, &data).context("serializing to json")?;
            writeln!(out).context("writing to stdout")
        }
        Format::Csv => write_csv(&mut out, &data).context("writing csv"),
        Format::Text => write_text(&mut out, &data, rows).context("writing to stdout"),
    }
}

/// One line per row, led by the stream offset. NaN values are left empty.
fn write_csv<W: Write>(out: &mut W, data: &SeriesDataset) -> std::io::Result<()> {
    let header: Vec<&str> = std::iter::once("offset").chain(data.names()).collect();
    writeln!(out, "{}", header.join(","))?;
    for (idx, offset) in data.offsets().iter().enumerate() {
        let Some(row) = data.row(idx) else {
            break;
        };
        write!(out, "{offset}")?;
        for value in row {
            if value.is_nan() {
                write!(out, ",")?;
            } else {
                write!(out, ",{value}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

const WIDTH: usize = 14;

fn write_text<W: Write>(out: &mut W, data: &SeriesDataset, rows: usize) -> std::io::Result<()> {
    writeln!(
        out,
        "rows: {}  valid: {}  invalid: {}",
        data.len(),
        data.valid_count(),
        data.len() - data.valid_count()
    )?;
    if data.is_empty() {
        return Ok(());
    }

    write!(out, "{:>10}", "offset")?;
    for name in data.names() {
        write!(out, " {name:>WIDTH$}")?;
    }
    writeln!(out)?;
    for idx in 0..rows.min(data.len()) {
        let Some(row) = data.row(idx) else {
            break;
        };
        write!(out, "{:>10}", data.offsets()[idx])?;
        for value in row {
            write!(out, " {:>WIDTH$}", format!("{value:.6}"))?;
        }
        writeln!(out)?;
    }
    if data.len() > rows {
        writeln!(out, "... {} more rows", data.len() - rows)?;
    }
    Ok(())
}
