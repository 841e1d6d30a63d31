//! Comparing two releases of a taxa table by taxon id.

use std::collections::HashSet;

use rollup_core::{RankLevel, TaxonId, TaxonRecord};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaxaDiff {
    /// Present only in the new table, in new-table order.
    pub added: Vec<TaxonRecord>,
    /// Present only in the old table, in old-table order.
    pub removed: Vec<TaxonRecord>,
}

impl TaxaDiff {
    pub fn between(old: &[TaxonRecord], new: &[TaxonRecord]) -> Self {
        let old_ids: HashSet<TaxonId> = old.iter().map(|r| r.id).collect();
        let new_ids: HashSet<TaxonId> = new.iter().map(|r| r.id).collect();
        Self {
            added: new.iter().filter(|r| !old_ids.contains(&r.id)).cloned().collect(),
            removed: old.iter().filter(|r| !new_ids.contains(&r.id)).cloned().collect(),
        }
    }

    /// Ids of removed taxa at species rank.
    pub fn removed_species(&self) -> Vec<TaxonId> {
        self.removed
            .iter()
            .filter(|r| r.rank == RankLevel::SPECIES)
            .map(|r| r.id)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
