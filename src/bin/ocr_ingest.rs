//! ocr_ingest - submit an image file to the stub engine and report what it received
//!
//! This tool:
//! 1. Loads ingest configuration (file + env overrides)
//! 2. Reads the image as an encoded stream, or as raw RGBA with --raw-width/--raw-height
//! 3. Submits it through an `Ingestor` bound to a `StubEngine`
//! 4. Prints a JSON report of the engine's view of the submission

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use ocr_ingest::config::IngestConfig;
use ocr_ingest::{scan_orientation, Ingestor, InputImage, StubEngine, StubReport};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Image file to submit.
    input: PathBuf,
    /// Rotation hint passed to the engine (encoded input only).
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    angle: i32,
    /// Treat the file as raw RGBA samples of this width.
    #[arg(long, requires = "raw_height")]
    raw_width: Option<u32>,
    /// Treat the file as raw RGBA samples of this height.
    #[arg(long, requires = "raw_width")]
    raw_height: Option<u32>,
    /// JSON configuration file.
    #[arg(long, env = "OCR_INGEST_CONFIG")]
    config: Option<PathBuf>,
    /// Pretty-print the report.
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct SubmissionReport {
    input: String,
    kind: String,
    bytes: usize,
    /// Orientation the scanner derived (encoded input only).
    exif_orientation: Option<u8>,
    angle: i32,
    input_path: String,
    engine: StubReport,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = IngestConfig::load_from(args.config.as_deref())?;
    let image = load_image(&args)?;
    let (bytes, exif_orientation) = match &image {
        InputImage::Pixels(pixels) => (pixels.byte_len(), None),
        InputImage::Encoded(bytes) => (bytes.len(), Some(scan_orientation(bytes))),
    };
    let kind = image.kind();
    log::info!(
        "submitting {} ({}, {} bytes)",
        args.input.display(),
        kind,
        bytes
    );

    let engine = StubEngine::from_config(&cfg);
    let mut session = engine.session();
    let mut ingestor = Ingestor::from_config(engine.clone(), &cfg)?;
    ingestor
        .submit(&mut session, &image, args.angle)
        .with_context(|| format!("submission of {} failed", args.input.display()))?;

    let report = SubmissionReport {
        input: args.input.display().to_string(),
        kind,
        bytes,
        exif_orientation,
        angle: args.angle,
        input_path: cfg.input_path.clone(),
        engine: engine.report(),
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);

    drop(ingestor);
    let leaked = engine.live_allocations().len();
    if leaked != 0 {
        return Err(anyhow!("{} engine allocations outstanding after release", leaked));
    }
    Ok(())
}

fn load_image(args: &Args) -> Result<InputImage> {
    match (args.raw_width, args.raw_height) {
        (Some(width), Some(height)) => {
            let data = std::fs::read(&args.input)
                .with_context(|| format!("failed to read {}", args.input.display()))?;
            Ok(InputImage::pixels(width, height, data)?)
        }
        _ => Ok(InputImage::from_path(&args.input)?),
    }
}
