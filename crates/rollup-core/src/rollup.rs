//! Rollup policies: turning a leaf score vector into a prediction or branch.
//!
//! Every policy reads the taxonomy immutably and works on one score vector
//! for one classification event. Nothing here is cached between calls.

use crate::error::{Result, RollupError};
use crate::prediction::{BranchEntry, BranchKind, BranchResult, NearbyTaxon, Prediction};
use crate::scores::{check_len, combine, total};
use crate::taxonomy::{NodeId, Taxonomy};

/// Relative slack on the ratio cutoff so the second-ranked leaf that defined
/// the ratio always qualifies despite f32 round trips.
const CUTOFF_TOLERANCE: f64 = 1e-9;

// ── Aggregation ──────────────────────────────────────────────────────────────

/// Per-node subtree sums of one score vector, indexed by [`NodeId`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedScores {
    values: Vec<f32>,
    root: NodeId,
}

impl AggregatedScores {
    pub fn get(&self, node: NodeId) -> f32 {
        self.values[node.index()]
    }

    /// Aggregate at the root; equals the vector total.
    pub fn root_total(&self) -> f32 {
        self.values[self.root.index()]
    }
}

/// Ratio of the second-highest to the highest raw leaf score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioCutoff {
    ratio: f64,
}

impl RatioCutoff {
    /// Cutoff from an explicit ratio, clamped to [0, 1].
    pub fn from_ratio(ratio: f64) -> Self {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        Self { ratio }
    }

    pub fn ratio(self) -> f64 {
        self.ratio
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Rollup policies bound to one taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct RollupEngine<'t> {
    taxonomy: &'t Taxonomy,
    linnean_only: bool,
}

impl<'t> RollupEngine<'t> {
    pub fn new(taxonomy: &'t Taxonomy) -> Self {
        Self {
            taxonomy,
            linnean_only: false,
        }
    }

    /// Skip ancestors of non-Linnean rank while rolling up a prediction.
    pub fn with_linnean_only(mut self, linnean_only: bool) -> Self {
        self.linnean_only = linnean_only;
        self
    }

    pub fn taxonomy(&self) -> &'t Taxonomy {
        self.taxonomy
    }

    pub fn linnean_only(&self) -> bool {
        self.linnean_only
    }

    /// Start a per-event session that carries a ratio cutoff between calls.
    pub fn session(&self) -> RollupSession<'t> {
        RollupSession {
            engine: *self,
            cutoff: None,
        }
    }

    /// Subtree sums for every node in one bottom-up pass.
    pub fn aggregate(&self, scores: &[f32]) -> Result<AggregatedScores> {
        self.check(scores)?;
        Ok(self.aggregate_unchecked(scores))
    }

    fn aggregate_unchecked(&self, scores: &[f32]) -> AggregatedScores {
        let tree = self.taxonomy;
        let mut sums = vec![0.0f64; tree.len()];
        for &id in tree.bottom_up() {
            let node = tree.node(id);
            let own = node.leaf_index().map_or(0.0, |i| scores[i] as f64);
            sums[id.index()] += own;
            if let Some(parent) = node.parent() {
                sums[parent.index()] += sums[id.index()];
            }
        }
        AggregatedScores {
            values: sums.into_iter().map(|s| s as f32).collect(),
            root: tree.root(),
        }
    }

    /// Highest-scoring leaf; ties go to the first leaf in record order.
    /// NaN scores never win. `None` when no leaf has a comparable score.
    pub fn top_leaf(&self, scores: &[f32]) -> Result<Option<(NodeId, f32)>> {
        self.check(scores)?;
        Ok(self.top_leaf_unchecked(scores))
    }

    fn top_leaf_unchecked(&self, scores: &[f32]) -> Option<(NodeId, f32)> {
        let mut best: Option<(NodeId, f32)> = None;
        for &leaf in self.taxonomy.leaves() {
            let s = self.raw(leaf, scores);
            if s.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, b)| s > b) {
                best = Some((leaf, s));
            }
        }
        best
    }

    // ── Prediction ───────────────────────────────────────────────────────────

    /// Predict the top leaf when it clears `threshold`, otherwise the nearest
    /// ancestor whose aggregated score does.
    pub fn inflate_top_prediction(&self, scores: &[f32], threshold: f32) -> Result<Prediction> {
        if threshold.is_nan() {
            return Err(RollupError::InvalidThreshold(threshold));
        }
        self.check(scores)?;

        let tree = self.taxonomy;
        let Some((leaf, raw)) = self.top_leaf_unchecked(scores) else {
            return Err(RollupError::NoConfidentPrediction {
                threshold,
                best_score: 0.0,
            });
        };
        if raw >= threshold {
            return Ok(Prediction::at(tree, leaf, raw, false));
        }

        let agg = self.aggregate_unchecked(scores);
        for ancestor in tree.ancestors(leaf).skip(1) {
            if self.linnean_only && ancestor != tree.root() && !tree.node(ancestor).rank().is_linnean() {
                continue;
            }
            let s = agg.get(ancestor);
            if s >= threshold {
                return Ok(Prediction::at(tree, ancestor, s, true));
            }
        }
        Err(RollupError::NoConfidentPrediction {
            threshold,
            best_score: agg.root_total(),
        })
    }

    /// [`inflate_top_prediction`](Self::inflate_top_prediction) on the fused
    /// vision × geo vector. The result carries the per-modality scores of the
    /// predicted taxon.
    pub fn inflate_top_prediction_fused(
        &self,
        vision: &[f32],
        geo: &[f32],
        threshold: f32,
    ) -> Result<Prediction> {
        self.check(vision)?;
        self.check(geo)?;
        let fused = combine(vision, geo)?;
        let mut prediction = self.inflate_top_prediction(&fused, threshold)?;

        let (v, g) = if prediction.rolled_up {
            (
                self.subtree_total(prediction.node, vision),
                self.subtree_total(prediction.node, geo),
            )
        } else {
            (self.raw(prediction.node, vision), self.raw(prediction.node, geo))
        };
        prediction.vision_score = Some(v);
        prediction.geo_score = Some(g);
        Ok(prediction)
    }

    // ── Branches ─────────────────────────────────────────────────────────────

    /// Ratio of the second-highest raw leaf score to the highest.
    ///
    /// Duplicates count, so a tie at the top gives 1. A single leaf gives 0.
    pub fn derive_top_score_ratio_cutoff(&self, scores: &[f32]) -> Result<RatioCutoff> {
        self.check(scores)?;
        let mut top = f32::NEG_INFINITY;
        let mut second = f32::NEG_INFINITY;
        for &leaf in self.taxonomy.leaves() {
            let s = self.raw(leaf, scores);
            if s.is_nan() {
                continue;
            }
            if s > top {
                second = top;
                top = s;
            } else if s > second {
                second = s;
            }
        }
        if top <= 0.0 {
            return Err(RollupError::DegenerateVector { sum: total(scores) });
        }
        let second = second.max(0.0);
        Ok(RatioCutoff::from_ratio(second as f64 / top as f64))
    }

    /// Top leaf and its ancestors, leaf first, with aggregated scores.
    pub fn inflate_top_branch(&self, scores: &[f32]) -> Result<BranchResult> {
        self.check(scores)?;
        let tree = self.taxonomy;
        let agg = self.aggregate_unchecked(scores);
        let start = self
            .top_leaf_unchecked(scores)
            .map_or(tree.root(), |(leaf, _)| leaf);
        let entries = tree
            .ancestors(start)
            .map(|id| BranchEntry::at(tree, id, agg.get(id)))
            .collect();
        Ok(BranchResult {
            kind: BranchKind::LeafToRoot,
            entries,
        })
    }

    /// Lowest common ancestor of every leaf within `cutoff` of the top score,
    /// followed by those leaves in record order.
    pub fn inflate_common_ancestor(&self, scores: &[f32], cutoff: RatioCutoff) -> Result<BranchResult> {
        self.check(scores)?;
        let tree = self.taxonomy;
        let top = self.top_leaf_unchecked(scores).map_or(0.0, |(_, s)| s);
        let bar = top as f64 * cutoff.ratio();
        let floor = bar * (1.0 - CUTOFF_TOLERANCE);

        let candidates: Vec<NodeId> = tree
            .leaves()
            .iter()
            .copied()
            .filter(|&leaf| {
                let s = self.raw(leaf, scores);
                s > 0.0 && s as f64 >= floor
            })
            .collect();
        let anchor = tree
            .lowest_common_ancestor(&candidates)
            .ok_or(RollupError::EmptyCandidateSet { cutoff: bar })?;

        // A lone candidate is its own common ancestor.
        let listed = if candidates.len() == 1 { &[][..] } else { &candidates[..] };
        let agg = self.aggregate_unchecked(scores);
        let entries = std::iter::once(anchor)
            .chain(listed.iter().copied())
            .map(|id| BranchEntry::at(tree, id, agg.get(id)))
            .collect();
        Ok(BranchResult {
            kind: BranchKind::CommonAncestor,
            entries,
        })
    }

    /// Greedy descent from the root along the child with the highest
    /// aggregated score.
    pub fn best_branch(&self, scores: &[f32]) -> Result<BranchResult> {
        self.check(scores)?;
        let tree = self.taxonomy;
        let agg = self.aggregate_unchecked(scores);

        let mut current = tree.root();
        let mut entries = vec![BranchEntry::at(tree, current, agg.get(current))];
        loop {
            let mut best: Option<(NodeId, f32)> = None;
            for &child in tree.node(current).children() {
                let s = agg.get(child);
                if s.is_nan() {
                    continue;
                }
                if best.map_or(true, |(_, b)| s > b) {
                    best = Some((child, s));
                }
            }
            let Some((next, score)) = best else { break };
            entries.push(BranchEntry::at(tree, next, score));
            current = next;
        }
        Ok(BranchResult {
            kind: BranchKind::RootToLeaf,
            entries,
        })
    }

    /// Leaves whose raw location score is strictly above their own geo
    /// threshold, in record order.
    pub fn expected_nearby(&self, geo: &[f32]) -> Result<Vec<NearbyTaxon>> {
        self.check(geo)?;
        let tree = self.taxonomy;
        let nearby = tree
            .leaves()
            .iter()
            .filter_map(|&leaf| {
                let node = tree.node(leaf);
                let threshold = node.geo_threshold()?;
                let score = self.raw(leaf, geo);
                (score > threshold).then(|| NearbyTaxon {
                    node: leaf,
                    taxon_id: node.taxon_id(),
                    name: node.name().to_owned(),
                    rank: node.rank(),
                    geo_score: score,
                    geo_threshold: threshold,
                })
            })
            .collect();
        Ok(nearby)
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn check(&self, scores: &[f32]) -> Result<()> {
        check_len(self.taxonomy.leaf_count(), scores.len())
    }

    fn raw(&self, node: NodeId, scores: &[f32]) -> f32 {
        self.taxonomy.node(node).leaf_index().map_or(0.0, |i| scores[i])
    }

    fn subtree_total(&self, node: NodeId, scores: &[f32]) -> f32 {
        let tree = self.taxonomy;
        let mut sum = 0.0f64;
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            sum += self.raw(id, scores) as f64;
            stack.extend_from_slice(tree.node(id).children());
        }
        sum as f32
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// Per-event holder for the ratio cutoff.
///
/// A derived cutoff is consumed by the next common-ancestor rollup; a second
/// rollup without a fresh derive fails with `CutoffNotDerived`.
#[derive(Debug, Clone)]
pub struct RollupSession<'t> {
    engine: RollupEngine<'t>,
    cutoff: Option<RatioCutoff>,
}

impl<'t> RollupSession<'t> {
    pub fn cutoff(&self) -> Option<RatioCutoff> {
        self.cutoff
    }

    pub fn derive_top_score_ratio_cutoff(&mut self, scores: &[f32]) -> Result<RatioCutoff> {
        self.cutoff = None;
        let cutoff = self.engine.derive_top_score_ratio_cutoff(scores)?;
        self.cutoff = Some(cutoff);
        Ok(cutoff)
    }

    pub fn inflate_common_ancestor(&mut self, scores: &[f32]) -> Result<BranchResult> {
        let cutoff = self.cutoff.take().ok_or(RollupError::CutoffNotDerived)?;
        self.engine.inflate_common_ancestor(scores, cutoff)
    }
}
