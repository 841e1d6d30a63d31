//! Result records handed to the presentation layer.

use serde::Serialize;

use crate::record::{RankLevel, TaxonId};
use crate::taxonomy::{NodeId, Taxonomy};

/// A single chosen taxon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(skip)]
    pub node: NodeId,
    pub taxon_id: TaxonId,
    pub name: String,
    pub rank: RankLevel,
    pub rank_name: Option<&'static str>,
    /// Score the accept decision was made on: raw for the top leaf,
    /// aggregated for a rolled-up ancestor.
    pub score: f32,
    pub rolled_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_score: Option<f32>,
    /// Ancestors of the predicted taxon, parent first, root last.
    pub ancestor_ids: Vec<TaxonId>,
}

impl Prediction {
    pub(crate) fn at(taxonomy: &Taxonomy, node: NodeId, score: f32, rolled_up: bool) -> Self {
        let n = taxonomy.node(node);
        Self {
            node,
            taxon_id: n.taxon_id(),
            name: n.name().to_owned(),
            rank: n.rank(),
            rank_name: n.rank().name(),
            score,
            rolled_up,
            vision_score: None,
            geo_score: None,
            ancestor_ids: taxonomy
                .ancestors(node)
                .skip(1)
                .map(|a| taxonomy.node(a).taxon_id())
                .collect(),
        }
    }
}

/// One step of a branch: a node and its aggregated score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchEntry {
    #[serde(skip)]
    pub node: NodeId,
    pub taxon_id: TaxonId,
    pub name: String,
    pub rank: RankLevel,
    pub rank_name: Option<&'static str>,
    pub score: f32,
}

impl BranchEntry {
    pub(crate) fn at(taxonomy: &Taxonomy, node: NodeId, score: f32) -> Self {
        let n = taxonomy.node(node);
        Self {
            node,
            taxon_id: n.taxon_id(),
            name: n.name().to_owned(),
            rank: n.rank(),
            rank_name: n.rank().name(),
            score,
        }
    }
}

/// How the entries of a [`BranchResult`] are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    /// Top leaf first, root last.
    LeafToRoot,
    /// Root first, following the best child at every level.
    RootToLeaf,
    /// Common ancestor first, then each qualifying candidate leaf.
    CommonAncestor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchResult {
    pub kind: BranchKind,
    pub entries: Vec<BranchEntry>,
}

impl BranchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry: the top leaf, the root, or the common ancestor.
    pub fn anchor(&self) -> Option<&BranchEntry> {
        self.entries.first()
    }

    /// Candidate leaves of a common-ancestor result. A single candidate is
    /// its own ancestor, so it is the anchor itself. With several candidates
    /// the anchor may also appear here when it bears a leaf of its own.
    pub fn candidates(&self) -> &[BranchEntry] {
        match (self.kind, self.entries.len()) {
            (BranchKind::CommonAncestor, 1) => &self.entries,
            (BranchKind::CommonAncestor, _) => &self.entries[1..],
            _ => &[],
        }
    }

    pub fn taxon_ids(&self) -> Vec<TaxonId> {
        self.entries.iter().map(|e| e.taxon_id).collect()
    }
}

/// A taxon whose location score clears its own geo threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyTaxon {
    #[serde(skip)]
    pub node: NodeId,
    pub taxon_id: TaxonId,
    pub name: String,
    pub rank: RankLevel,
    pub geo_score: f32,
    pub geo_threshold: f32,
}
