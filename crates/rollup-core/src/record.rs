//! Taxon records as delivered by the taxa table, and rank levels.

use serde::{Deserialize, Serialize};

/// Taxon identifier as used by the taxa table.
pub type TaxonId = u32;

/// Taxon id given to the synthesized root when a table has several
/// top-level records.
pub const LIFE_TAXON_ID: TaxonId = 48460;

// ── Rank levels ───────────────────────────────────────────────────────────────

/// Numeric rank level. Lower is more specific (species = 10, genus = 20).
/// Levels are fractional for a few zoological ranks (parvorder = 34.5).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankLevel(pub f32);

/// Known rank levels, most general first.
const RANK_NAMES: [(f32, &str); 29] = [
    (100.0, "stateofmatter"),
    (70.0, "kingdom"),
    (67.0, "subkingdom"),
    (60.0, "phylum"),
    (57.0, "subphylum"),
    (53.0, "superclass"),
    (50.0, "class"),
    (47.0, "subclass"),
    (45.0, "infraclass"),
    (43.0, "superorder"),
    (40.0, "order"),
    (37.0, "suborder"),
    (35.0, "infraorder"),
    (34.5, "parvorder"),
    (34.0, "zoosection"),
    (33.5, "zoosubsection"),
    (33.0, "superfamily"),
    (32.0, "epifamily"),
    (30.0, "family"),
    (27.0, "subfamily"),
    (26.0, "supertribe"),
    (25.0, "tribe"),
    (24.0, "subtribe"),
    (20.0, "genus"),
    (15.0, "subgenus"),
    (13.0, "section"),
    (12.0, "subsection"),
    (10.0, "species"),
    (5.0, "subspecies"),
];

const LINNEAN_LEVELS: [f32; 8] = [100.0, 70.0, 60.0, 50.0, 40.0, 30.0, 20.0, 10.0];

impl RankLevel {
    pub const STATE_OF_MATTER: Self = Self(100.0);
    pub const KINGDOM: Self = Self(70.0);
    pub const PHYLUM: Self = Self(60.0);
    pub const CLASS: Self = Self(50.0);
    pub const ORDER: Self = Self(40.0);
    pub const FAMILY: Self = Self(30.0);
    pub const GENUS: Self = Self(20.0);
    pub const SPECIES: Self = Self(10.0);
    pub const SUBSPECIES: Self = Self(5.0);

    /// Rank name for a known level, e.g. `"genus"` for 20.
    pub fn name(self) -> Option<&'static str> {
        RANK_NAMES
            .iter()
            .find(|(level, _)| *level == self.0)
            .map(|(_, name)| *name)
    }

    /// Major ranks: life, kingdom, phylum, class, order, family, genus, species.
    pub fn is_linnean(self) -> bool {
        LINNEAN_LEVELS.contains(&self.0)
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// One row of the taxa table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonRecord {
    pub id: TaxonId,
    pub name: String,
    pub rank: RankLevel,
    /// Position in the classifier output, for leaf-bearing taxa only.
    pub leaf_index: Option<usize>,
    pub parent_id: Option<TaxonId>,
    pub iconic_group_id: Option<u32>,
    /// Location score above which the taxon counts as expected nearby.
    pub geo_threshold: Option<f32>,
}

impl TaxonRecord {
    pub fn new(id: TaxonId, name: impl Into<String>, rank: RankLevel) -> Self {
        Self {
            id,
            name: name.into(),
            rank,
            leaf_index: None,
            parent_id: None,
            iconic_group_id: None,
            geo_threshold: None,
        }
    }

    pub fn with_parent(mut self, parent_id: TaxonId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_leaf_index(mut self, leaf_index: usize) -> Self {
        self.leaf_index = Some(leaf_index);
        self
    }

    pub fn with_geo_threshold(mut self, threshold: f32) -> Self {
        self.geo_threshold = Some(threshold);
        self
    }

    pub fn is_leaf_bearing(&self) -> bool {
        self.leaf_index.is_some()
    }
}
