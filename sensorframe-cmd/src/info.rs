use anyhow::{Context, Result};
use sensorframe::{FrameLayout, FrameScanner, ScanOpts, Summary};
use serde::Serialize;
use std::io::{stdout, Write};

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    input: String,
    bytes: usize,
    format: String,
    fields: Vec<String>,
    frame_size: usize,
    summary: Summary,
    /// Percent of rows passing the checksum.
    valid_pct: Option<String>,
    /// Percent of input bytes covered by valid frames.
    coverage_pct: Option<String>,
}

fn pct(v: Option<f64>) -> Option<String> {
    v.map(|v| format!("{:.2}", v * 100.0))
}

fn summarize(input: &str, buf: &[u8], layout: &FrameLayout, opts: ScanOpts) -> Info {
    let mut summary = Summary::default();
    FrameScanner::new(buf, layout)
        .with_opts(opts)
        .attempts()
        .for_each(|a| summary.add(&a));

    Info {
        input: input.to_string(),
        bytes: buf.len(),
        format: layout.format(),
        fields: layout.fields().iter().map(|f| f.name.clone()).collect(),
        frame_size: layout.frame_size(),
        valid_pct: pct(summary.valid_ratio()),
        coverage_pct: pct(summary.coverage(buf.len(), layout.frame_size())),
        summary,
    }
}

pub fn info(
    input: &str,
    buf: &[u8],
    layout: &FrameLayout,
    opts: ScanOpts,
    format: &Format,
) -> Result<()> {
    let info = summarize(input, buf, layout, opts);

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &info).context("serializing to json")
        }
        Format::Text => {
            let data = render_text(&info).context("serializing info")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn render_text(info: &Info) -> Result<String> {
    let mut hb = handlebars::Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_template_string("info", TEXT_TEMPLATE)
        .context("compiling template")?;

    hb.render("info", &info).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ input }}
===============================================================================
Bytes:       {{ bytes }}
Layout:      {{ format }} ({{ frame_size }} byte frames)
Fields:      {{ #each fields }}{{ this }}{{ #if @last }}{{ else }}, {{ /if }}{{ /each }}
-------------------------------------------------------------------------------
Rows:        {{ summary.rows }}
Valid:       {{ summary.valid }}{{ #if valid_pct }} ({{ valid_pct }}%){{ /if }}
Invalid:     {{ summary.invalid }}
Coverage:    {{ #if coverage_pct }}{{ coverage_pct }}%{{ /if }}
First valid: {{ summary.first_valid_offset }}
Last valid:  {{ summary.last_valid_offset }}
";
