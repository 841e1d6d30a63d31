//! Restricting a score vector to (or away from) one branch of the taxonomy.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RollupError};
use crate::record::TaxonId;
use crate::scores::check_len;
use crate::taxonomy::Taxonomy;

/// Whether the filtered taxon's leaves are kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Keep only leaves under the taxon.
    #[default]
    Include,
    /// Drop leaves under the taxon.
    Exclude,
}

/// Taxon filter applied to raw leaf scores before any rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonFilter {
    pub taxon_id: TaxonId,
    #[serde(default)]
    pub mode: FilterMode,
}

impl TaxonFilter {
    pub fn include(taxon_id: TaxonId) -> Self {
        Self { taxon_id, mode: FilterMode::Include }
    }

    pub fn exclude(taxon_id: TaxonId) -> Self {
        Self { taxon_id, mode: FilterMode::Exclude }
    }

    /// Return a copy of `scores` with filtered-out leaves set to zero.
    pub fn apply(&self, taxonomy: &Taxonomy, scores: &[f32]) -> Result<Vec<f32>> {
        check_len(taxonomy.leaf_count(), scores.len())?;
        if taxonomy.find(self.taxon_id).is_none() {
            return Err(RollupError::UnknownTaxon(self.taxon_id));
        }

        let mut out = scores.to_vec();
        for &leaf in taxonomy.leaves() {
            let under = taxonomy.has_ancestor(leaf, self.taxon_id);
            let drop = match self.mode {
                FilterMode::Include => !under,
                FilterMode::Exclude => under,
            };
            if drop {
                if let Some(i) = taxonomy.node(leaf).leaf_index() {
                    out[i] = 0.0;
                }
            }
        }
        Ok(out)
    }
}
