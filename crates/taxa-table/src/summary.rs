//! Row counts of a taxa table.

use std::collections::BTreeMap;

use rollup_core::{RankLevel, TaxonRecord};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaxaSummary {
    pub rows: usize,
    /// Rows carrying a leaf index.
    pub leaves: usize,
    /// Leaf rows at species rank.
    pub species_leaves: usize,
    pub with_geo_threshold: usize,
    /// Rows per rank name; unknown levels are keyed by their number.
    pub by_rank: BTreeMap<String, usize>,
}

impl TaxaSummary {
    pub fn from_records(records: &[TaxonRecord]) -> Self {
        let mut summary = Self {
            rows: records.len(),
            ..Default::default()
        };
        for r in records {
            if r.is_leaf_bearing() {
                summary.leaves += 1;
                if r.rank == RankLevel::SPECIES {
                    summary.species_leaves += 1;
                }
            }
            if r.geo_threshold.is_some() {
                summary.with_geo_threshold += 1;
            }
            let key = match r.rank.name() {
                Some(name) => name.to_owned(),
                None => r.rank.0.to_string(),
            };
            *summary.by_rank.entry(key).or_default() += 1;
        }
        summary
    }
}
