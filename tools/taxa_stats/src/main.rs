//! Taxa table inspection: row counts, tree shape, and release-to-release diffs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollup_core::{TaxonId, TaxonRecord, Taxonomy};
use serde::Serialize;
use std::path::{Path, PathBuf};
use taxa_table::{TaxaDiff, TaxaSummary};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "taxa_stats", about = "Summarize and compare taxa tables")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Row, leaf, and rank counts of one table.
    Summary { table: PathBuf },
    /// Build the tree and report its shape; fails on a malformed table.
    Check { table: PathBuf },
    /// Taxa added and removed between two releases.
    Diff { old: PathBuf, new: PathBuf },
}

#[derive(Debug, Serialize)]
struct TreeShape {
    nodes: usize,
    leaves: usize,
    max_depth: usize,
    root_id: TaxonId,
    root_name: String,
}

impl TreeShape {
    fn of(tree: &Taxonomy) -> Self {
        let root = tree.node(tree.root());
        Self {
            nodes: tree.len(),
            leaves: tree.leaf_count(),
            max_depth: tree.max_depth(),
            root_id: root.taxon_id(),
            root_name: root.name().to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DiffReport {
    added_count: usize,
    removed_count: usize,
    removed_species: Vec<TaxonId>,
    #[serde(flatten)]
    diff: TaxaDiff,
}

impl From<TaxaDiff> for DiffReport {
    fn from(diff: TaxaDiff) -> Self {
        Self {
            added_count: diff.added.len(),
            removed_count: diff.removed.len(),
            removed_species: diff.removed_species(),
            diff,
        }
    }
}

fn load(path: &Path) -> Result<Vec<TaxonRecord>> {
    let records = taxa_table::load_records(path).with_context(|| format!("loading {}", path.display()))?;
    info!(rows = records.len(), path = %path.display(), "table loaded");
    Ok(records)
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
    let value = match args.command {
        Command::Summary { table } => serde_json::to_value(TaxaSummary::from_records(&load(&table)?))?,
        Command::Check { table } => {
            let tree = Taxonomy::build(load(&table)?).context("taxonomy does not build")?;
            serde_json::to_value(TreeShape::of(&tree))?
        }
        Command::Diff { old, new } => {
            let diff = TaxaDiff::between(&load(&old)?, &load(&new)?);
            info!(added = diff.added.len(), removed = diff.removed.len(), "diff computed");
            serde_json::to_value(DiffReport::from(diff))?
        }
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
