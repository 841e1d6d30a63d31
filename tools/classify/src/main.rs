//! Single-frame classification: load a taxa table and classifier score
//! vectors, run one rollup policy, print the result as JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rollup_core::{combine, normalize, RollupConfig, RollupEngine, RollupError, TaxonFilter, TaxonId};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// Top leaf, rolled up to the first ancestor over the threshold.
    TopPrediction,
    /// Top leaf and all its ancestors.
    TopBranch,
    /// Common ancestor of the leaves close to the top score.
    CommonAncestor,
    /// Greedy root-to-leaf descent along the heaviest child.
    BestBranch,
    /// Taxa expected near the location (geo scores only).
    Nearby,
}

#[derive(Parser, Debug)]
#[command(name = "classify", about = "Roll up classifier scores for one observation over a taxonomy")]
struct Args {
    /// Taxa table (.csv or .json).
    #[arg(short, long)]
    taxonomy: PathBuf,

    /// JSON array of vision scores, one per leaf.
    #[arg(short, long)]
    vision: Option<PathBuf>,

    /// JSON array of location scores, one per leaf.
    #[arg(short, long)]
    geo: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "top-prediction")]
    policy: Policy,

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

    /// Normalize the vision vector before rolling up.
    #[arg(long)]
    normalize: bool,
}

// ── Config ────────────────────────────────────────────────────────────────────

fn parse_config(text: &str) -> Result<RollupConfig> {
    toml::from_str(text).context("invalid rollup config")
}

/// File settings (or defaults) with command line flags layered on top.
fn resolve_config(args: &Args) -> Result<RollupConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            parse_config(&text)?
        }
        None => RollupConfig::default(),
    };
    if let Some(t) = args.threshold {
        cfg.confidence_threshold = t;
    }
    if args.linnean_only {
        cfg.linnean_only = true;
    }
    if let Some(id) = args.include {
        cfg.filter = Some(TaxonFilter::include(id));
    } else if let Some(id) = args.exclude {
        cfg.filter = Some(TaxonFilter::exclude(id));
    }
    cfg.validate()?;
    Ok(cfg)
}

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Score vector from JSON text; `null` entries become NaN and never win.
fn parse_vector(text: &str) -> Result<Vec<f32>> {
    let v: Vec<Option<f32>> =
        serde_json::from_str(text).context("score vector must be a JSON array of numbers")?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f32::NAN)).collect())
}

fn read_vector(path: &Path) -> Result<Vec<f32>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_vector(&text).with_context(|| format!("parsing {}", path.display()))
}

// ── Run ───────────────────────────────────────────────────────────────────────

fn run(engine: RollupEngine<'_>, cfg: &RollupConfig, args: &Args) -> Result<serde_json::Value> {
    let tree = engine.taxonomy();
    let geo = args.geo.as_deref().map(read_vector).transpose()?;

    if args.policy == Policy::Nearby {
        let Some(geo) = geo else {
            bail!("--policy nearby needs --geo");
        };
        let nearby = engine.expected_nearby(&geo)?;
        info!(count = nearby.len(), "expected nearby taxa");
        return Ok(serde_json::to_value(nearby)?);
    }

    let Some(vision_path) = args.vision.as_deref() else {
        bail!("--policy {:?} needs --vision", args.policy);
    };
    let mut vision = read_vector(vision_path)?;
    if args.normalize {
        vision = normalize(&vision)?;
    }
    if let Some(filter) = &cfg.filter {
        vision = filter.apply(tree, &vision)?;
    }

    let value = match args.policy {
        Policy::TopPrediction => {
            let prediction = match &geo {
                Some(geo) => engine.inflate_top_prediction_fused(&vision, geo, cfg.confidence_threshold)?,
                None => engine.inflate_top_prediction(&vision, cfg.confidence_threshold)?,
            };
            serde_json::to_value(prediction)?
        }
        policy => {
            let scores = match &geo {
                Some(geo) => combine(&vision, geo)?,
                None => vision,
            };
            let branch = match policy {
                Policy::TopBranch => engine.inflate_top_branch(&scores)?,
                Policy::BestBranch => engine.best_branch(&scores)?,
                _ => {
                    let mut session = engine.session();
                    let cutoff = session.derive_top_score_ratio_cutoff(&scores)?;
                    info!(ratio = cutoff.ratio(), "derived ratio cutoff");
                    session.inflate_common_ancestor(&scores)?
                }
            };
            serde_json::to_value(branch)?
        }
    };
    Ok(value)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = resolve_config(&args)?;

    let tree = taxa_table::load_taxonomy(&args.taxonomy)
        .with_context(|| format!("loading taxonomy {}", args.taxonomy.display()))?;
    info!(
        nodes = tree.len(),
        leaves = tree.leaf_count(),
        depth = tree.max_depth(),
        "taxonomy loaded"
    );
    info!(policy = ?args.policy, threshold = cfg.confidence_threshold, linnean_only = cfg.linnean_only, "classifying");

    match run(cfg.engine(&tree), &cfg, &args) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(e) => match e.downcast_ref::<RollupError>() {
            Some(inner) if inner.is_inconclusive() => {
                warn!("no prediction: {inner}");
                println!("null");
            }
            _ => return Err(e),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollup_core::FilterMode;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["classify", "--taxonomy", "taxa.csv"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn config_file_fields_default() {
        let cfg = parse_config("linnean_only = true\n").unwrap();
        assert_eq!(cfg.confidence_threshold, 0.5);
        assert!(cfg.linnean_only);
    }

    #[test]
    fn config_file_carries_filter_table() {
        let cfg = parse_config("[filter]\ntaxon_id = 47126\nmode = \"exclude\"\n").unwrap();
        let filter = cfg.filter.unwrap();
        assert_eq!(filter.taxon_id, 47126);
        assert_eq!(filter.mode, FilterMode::Exclude);
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = resolve_config(&args(&["--threshold", "0.8", "--linnean-only", "--include", "3"])).unwrap();
        assert_eq!(cfg.confidence_threshold, 0.8);
        assert!(cfg.linnean_only);
        assert_eq!(cfg.filter, Some(TaxonFilter::include(3)));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!(resolve_config(&args(&["--threshold", "1.5"])).is_err());
    }

    #[test]
    fn include_and_exclude_conflict() {
        let argv = ["classify", "--taxonomy", "t.csv", "--include", "1", "--exclude", "2"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn policy_names_are_kebab_case() {
        assert_eq!(args(&["--policy", "common-ancestor"]).policy, Policy::CommonAncestor);
        assert_eq!(args(&[]).policy, Policy::TopPrediction);
    }

    #[test]
    fn null_scores_become_nan() {
        let v = parse_vector("[0.5, null, 0.25]").unwrap();
        assert_eq!(v[0], 0.5);
        assert!(v[1].is_nan());
        assert!(parse_vector("{\"a\": 1}").is_err());
    }
}
