use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use imghdr::{
    BYTE_ARRAY_ID, DecodeOptions, Decoder, FormatDetails, ImageDescriptor, ImageError, ImageSource,
};

#[derive(Parser)]
#[command(name = "imghdr")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Identify images and print their header metadata")]
struct Cli {
    /// Files, file:// or http(s):// URLs. `-` reads standard input.
    #[arg(required = true)]
    sources: Vec<String>,

    /// One JSON object per line instead of the text summary.
    #[arg(long)]
    json: bool,

    /// Skip ICC profile reassembly.
    #[arg(long)]
    no_icc: bool,

    #[arg(long, value_name = "BYTES")]
    max_header_bytes: Option<u64>,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Report<'a> {
    source: &'a str,
    #[serde(flatten)]
    descriptor: &'a ImageDescriptor,
    icc_profile_len: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut options = DecodeOptions::new();
    if cli.no_icc {
        options = options.without_icc_profile();
    }
    if let Some(limit) = cli.max_header_bytes {
        options = options.with_max_header_bytes(limit);
    }
    let decoder = Decoder::new(options);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failures = 0usize;

    for raw in &cli.sources {
        match decode_one(&decoder, raw) {
            Ok(descriptor) => print_descriptor(&mut out, raw, &descriptor, cli.json)?,
            Err(e) => {
                failures += 1;
                eprintln!("[!] {e}");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} sources failed", cli.sources.len());
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "imghdr=debug",
        _ => "imghdr=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn decode_one(decoder: &Decoder, raw: &str) -> std::result::Result<ImageDescriptor, ImageError> {
    if raw == "-" {
        return decoder.decode_reader(io::stdin().lock(), BYTE_ARRAY_ID);
    }
    let source = if raw.contains("://") {
        ImageSource::url(raw)
    } else {
        ImageSource::path(PathBuf::from(raw))
    };
    decoder.decode(&source)
}

fn print_descriptor(
    out: &mut impl Write,
    source: &str,
    descriptor: &ImageDescriptor,
    json: bool,
) -> Result<()> {
    if json {
        let report = Report {
            source,
            descriptor,
            icc_profile_len: descriptor.icc_profile().map(<[u8]>::len),
        };
        serde_json::to_writer(&mut *out, &report).context("Failed to serialize report")?;
        writeln!(out).context("Failed to write output")?;
        return Ok(());
    }

    let mut line = format!(
        "{source}: {} {}x{} {} bpc={} components={}",
        descriptor.format(),
        descriptor.width(),
        descriptor.height(),
        descriptor.color_space(),
        descriptor.bits_per_component(),
        descriptor.components(),
    );
    if descriptor.dpi_x() > 0 || descriptor.dpi_y() > 0 {
        line.push_str(&format!(" dpi={}x{}", descriptor.dpi_x(), descriptor.dpi_y()));
    }
    if let Some(profile) = descriptor.icc_profile() {
        line.push_str(&format!(" icc={}B", profile.len()));
    }
    if descriptor.is_inverted() {
        line.push_str(" inverted");
    }
    match descriptor.details() {
        FormatDetails::Jpeg2000(details) if details.is_jp2 => line.push_str(" jp2"),
        FormatDetails::Tiff(details) if details.is_ccitt() => line.push_str(" ccitt"),
        _ => {}
    }
    writeln!(out, "{line}").context("Failed to write output")?;
    Ok(())
}
