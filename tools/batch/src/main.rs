//! Batch classification harness.
//! Reads one frame per line (JSON with `vision`, optional `geo` and `id`),
//! classifies every frame in parallel and writes one JSON line per frame.

use anyhow::{Context, Result};
use clap::Parser;
use rollup_core::{classify_frames, Frame, FrameResult, RollupConfig, TaxonFilter, TaxonId};
use serde::Serialize;
use std::{
    fs,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::PathBuf,
    time::Instant,
};
use tracing::{info, warn};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "batch", about = "Roll up classifier scores for a file of frames")]
struct Args {
    /// Taxa table (.csv or .json).
    #[arg(short, long)]
    taxonomy: PathBuf,

    /// JSON-lines frame file; `-` reads stdin.
    #[arg(short, long, default_value = "-")]
    frames: String,

    /// Output JSON-lines file; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with rollup settings; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Confidence threshold in [0, 1].
    #[arg(long)]
    threshold: Option<f32>,

    /// Only roll up through major Linnean ranks.
    #[arg(long)]
    linnean_only: bool,

    /// Keep only leaves under this taxon.
    #[arg(long, conflicts_with = "exclude")]
    include: Option<TaxonId>,

    /// Drop leaves under this taxon.
    #[arg(long)]
    exclude: Option<TaxonId>,
}

fn resolve_config(args: &Args) -> Result<RollupConfig> {
    let mut cfg: RollupConfig = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&text).context("invalid rollup config")?
        }
        None => RollupConfig::default(),
    };
    if let Some(t) = args.threshold {
        cfg.confidence_threshold = t;
    }
    cfg.linnean_only |= args.linnean_only;
    if let Some(id) = args.include {
        cfg.filter = Some(TaxonFilter::include(id));
    } else if let Some(id) = args.exclude {
        cfg.filter = Some(TaxonFilter::exclude(id));
    }
    cfg.validate()?;
    Ok(cfg)
}

// ── Frames ────────────────────────────────────────────────────────────────────

/// Parse JSON-lines frames, skipping blank lines. Errors name the line.
fn parse_frames<R: BufRead>(reader: R) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: Frame =
            serde_json::from_str(&line).with_context(|| format!("frame on line {}", n + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Output line: the result, or the error that replaced it.
#[derive(Serialize)]
#[serde(untagged)]
enum Line<'a> {
    Ok(&'a FrameResult),
    Failed { id: Option<&'a str>, error: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = resolve_config(&args)?;

    let tree = taxa_table::load_taxonomy(&args.taxonomy)
        .with_context(|| format!("loading taxonomy {}", args.taxonomy.display()))?;
    info!(nodes = tree.len(), leaves = tree.leaf_count(), "taxonomy loaded");

    let frames = if args.frames == "-" {
        parse_frames(io::stdin().lock())?
    } else {
        let file = fs::File::open(&args.frames).with_context(|| format!("opening {}", args.frames))?;
        parse_frames(BufReader::new(file))?
    };
    info!(frames = frames.len(), threshold = cfg.confidence_threshold, "classifying");

    let t0 = Instant::now();
    let results = classify_frames(cfg.engine(&tree), &cfg, &frames);
    let elapsed = t0.elapsed();

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut failed = 0usize;
    for (i, (frame, result)) in frames.iter().zip(&results).enumerate() {
        let line = match result {
            Ok(r) => Line::Ok(r),
            Err(e) => {
                failed += 1;
                if e.is_inconclusive() {
                    warn!(frame = i, "no prediction: {e}");
                } else {
                    warn!(frame = i, "frame rejected: {e}");
                }
                Line::Failed {
                    id: frame.id.as_deref(),
                    error: e.to_string(),
                }
            }
        };
        serde_json::to_writer(&mut out, &line)?;
        writeln!(out)?;
    }
    out.flush()?;

    info!(
        classified = results.len() - failed,
        failed,
        elapsed_ms = elapsed.as_millis() as u64,
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_parse_one_per_line() {
        let input = "{\"id\": \"a\", \"vision\": [0.5, 0.5]}\n\n{\"vision\": [1.0, 0.0], \"geo\": [0.2, 0.8]}\n";
        let frames = parse_frames(input.as_bytes()).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].id.as_deref(), Some("a"));
        assert_eq!(frames[1].geo.as_deref(), Some(&[0.2f32, 0.8][..]));
    }

    #[test]
    fn bad_frame_reports_its_line() {
        let input = "{\"vision\": [0.5]}\nnot json\n";
        let err = parse_frames(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "got: {err}");
    }

    #[test]
    fn failed_line_serializes_flat() {
        let line = Line::Failed {
            id: Some("x"),
            error: "boom".into(),
        };
        let json = serde_json::to_string(&line).unwrap();
        assert_eq!(json, r#"{"id":"x","error":"boom"}"#);
    }

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from(["batch", "-t", "t.csv", "--threshold", "0.25", "--exclude", "9"]).unwrap();
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.confidence_threshold, 0.25);
        assert_eq!(cfg.filter, Some(TaxonFilter::exclude(9)));
        assert_eq!(args.frames, "-");
    }
}
