//! Taxonomy tree built from a flat list of taxon records.
//!
//! Nodes live in an arena and address each other through [`NodeId`] handles.
//! A node's parent is a plain handle, its children an owned list of handles
//! kept in input record order. The tree is immutable once built and can be
//! shared freely across threads.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RollupError};
use crate::record::{RankLevel, TaxonId, TaxonRecord, LIFE_TAXON_ID};

/// Handle of a node inside one [`Taxonomy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A taxon placed in the tree.
#[derive(Debug, Clone)]
pub struct TaxonNode {
    record: TaxonRecord,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
}

impl TaxonNode {
    fn new(record: TaxonRecord) -> Self {
        Self {
            record,
            parent: None,
            children: Vec::new(),
            depth: 0,
        }
    }

    pub fn taxon_id(&self) -> TaxonId {
        self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn rank(&self) -> RankLevel {
        self.record.rank
    }

    pub fn leaf_index(&self) -> Option<usize> {
        self.record.leaf_index
    }

    pub fn geo_threshold(&self) -> Option<f32> {
        self.record.geo_threshold
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Distance from the root (root = 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_leaf_bearing(&self) -> bool {
        self.record.leaf_index.is_some()
    }
}

/// Rooted, read-only taxonomy.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    nodes: Vec<TaxonNode>,
    root: NodeId,
    by_taxon_id: HashMap<TaxonId, NodeId>,
    /// `leaf_slots[i]` is the node owning leaf index `i`.
    leaf_slots: Vec<NodeId>,
    /// Leaf-bearing nodes in input record order.
    leaves_in_order: Vec<NodeId>,
    /// Every node, children strictly before their parent.
    bottom_up: Vec<NodeId>,
}

impl Taxonomy {
    /// Build the tree from records in table order.
    ///
    /// A single record without a parent becomes the root. Several top-level
    /// records are gathered under a synthesized "Life" root.
    pub fn build(records: impl IntoIterator<Item = TaxonRecord>) -> Result<Self> {
        let mut nodes: Vec<TaxonNode> = records.into_iter().map(TaxonNode::new).collect();
        if nodes.is_empty() {
            return Err(RollupError::EmptyTaxonomy);
        }

        let mut by_taxon_id = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if by_taxon_id.insert(node.taxon_id(), NodeId(i)).is_some() {
                return Err(RollupError::malformed(node.taxon_id(), "duplicate taxon id"));
            }
        }

        let top_level: Vec<NodeId> = (0..nodes.len())
            .filter(|&i| nodes[i].record.parent_id.is_none())
            .map(NodeId)
            .collect();

        let root = match top_level.len() {
            // Every record names a parent, so parent links must loop somewhere.
            0 => return Err(RollupError::CyclicTaxonomy { taxon_id: nodes[0].taxon_id() }),
            1 => top_level[0],
            _ => {
                if by_taxon_id.contains_key(&LIFE_TAXON_ID) {
                    return Err(RollupError::malformed(
                        LIFE_TAXON_ID,
                        "several top-level taxa but the Life id is already taken",
                    ));
                }
                let life = NodeId(nodes.len());
                nodes.push(TaxonNode::new(TaxonRecord::new(
                    LIFE_TAXON_ID,
                    "Life",
                    RankLevel::STATE_OF_MATTER,
                )));
                by_taxon_id.insert(LIFE_TAXON_ID, life);
                life
            }
        };

        // ── Link parents and children ───────────────────────────────────────
        for i in 0..nodes.len() {
            let child = NodeId(i);
            let parent = if child == root {
                continue;
            } else if let Some(parent_id) = nodes[i].record.parent_id {
                if parent_id == nodes[i].taxon_id() {
                    return Err(RollupError::CyclicTaxonomy { taxon_id: parent_id });
                }
                *by_taxon_id.get(&parent_id).ok_or_else(|| {
                    RollupError::malformed(
                        nodes[i].taxon_id(),
                        format!("parent {parent_id} is not in the table"),
                    )
                })?
            } else {
                root
            };
            nodes[i].parent = Some(parent);
            nodes[parent.0].children.push(child);
        }

        // ── Reachability from the root (cycle check) and depths ─────────────
        let mut top_down = Vec::with_capacity(nodes.len());
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            top_down.push(id);
            let depth = nodes[id.0].depth + 1;
            for k in 0..nodes[id.0].children.len() {
                let child = nodes[id.0].children[k];
                nodes[child.0].depth = depth;
                queue.push_back(child);
            }
        }
        if top_down.len() != nodes.len() {
            let mut reached = vec![false; nodes.len()];
            for id in &top_down {
                reached[id.0] = true;
            }
            let stray = reached.iter().position(|r| !r).unwrap_or(0);
            return Err(RollupError::CyclicTaxonomy { taxon_id: nodes[stray].taxon_id() });
        }
        let bottom_up: Vec<NodeId> = top_down.into_iter().rev().collect();

        // ── Leaf index table ────────────────────────────────────────────────
        let leaves_in_order: Vec<NodeId> = (0..nodes.len())
            .filter(|&i| nodes[i].is_leaf_bearing())
            .map(NodeId)
            .collect();
        let leaf_count = leaves_in_order.len();
        let mut slots: Vec<Option<NodeId>> = vec![None; leaf_count];
        for &id in &leaves_in_order {
            let node = &nodes[id.0];
            let index = node.leaf_index().unwrap_or_default();
            match slots.get_mut(index) {
                None => {
                    return Err(RollupError::malformed(
                        node.taxon_id(),
                        format!("leaf index {index} outside [0, {leaf_count})"),
                    ))
                }
                Some(Some(other)) => {
                    return Err(RollupError::malformed(
                        node.taxon_id(),
                        format!("leaf index {index} already used by taxon {}", nodes[other.0].taxon_id()),
                    ))
                }
                Some(slot) => *slot = Some(id),
            }
        }
        // Indices are distinct and below leaf_count, so every slot is filled.
        let leaf_slots: Vec<NodeId> = slots.into_iter().flatten().collect();

        Ok(Self {
            nodes,
            root,
            by_taxon_id,
            leaf_slots,
            leaves_in_order,
            bottom_up,
        })
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, including a synthesized root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Length every score vector must have.
    pub fn leaf_count(&self) -> usize {
        self.leaf_slots.len()
    }

    pub fn node(&self, id: NodeId) -> &TaxonNode {
        &self.nodes[id.0]
    }

    pub fn find(&self, taxon_id: TaxonId) -> Option<NodeId> {
        self.by_taxon_id.get(&taxon_id).copied()
    }

    /// Node owning position `index` of the score vector.
    pub fn lookup_by_leaf_index(&self, index: usize) -> Result<NodeId> {
        self.leaf_slots
            .get(index)
            .copied()
            .ok_or(RollupError::IndexOutOfRange {
                index,
                leaf_count: self.leaf_count(),
            })
    }

    /// Leaf-bearing nodes in the order their records were given.
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves_in_order
    }

    /// All nodes with every child listed before its parent.
    pub fn bottom_up(&self) -> &[NodeId] {
        &self.bottom_up
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TaxonNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    // ── Ancestry ──────────────────────────────────────────────────────────────

    /// Walk from `id` (inclusive) up to the root (inclusive).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            taxonomy: self,
            next: Some(id),
        }
    }

    /// `id` followed by every ancestor up to and including the root.
    pub fn ancestor_chain(&self, id: NodeId) -> Vec<NodeId> {
        self.ancestors(id).collect()
    }

    /// True when `taxon_id` is `id` itself or one of its ancestors.
    pub fn has_ancestor(&self, id: NodeId, taxon_id: TaxonId) -> bool {
        self.ancestors(id).any(|a| self.node(a).taxon_id() == taxon_id)
    }

    /// Deepest node that is an ancestor-or-self of every node in `ids`.
    /// `None` for an empty set.
    pub fn lowest_common_ancestor(&self, ids: &[NodeId]) -> Option<NodeId> {
        let (&first, rest) = ids.split_first()?;
        Some(rest.iter().fold(first, |acc, &other| self.pair_ancestor(acc, other)))
    }

    fn pair_ancestor(&self, mut a: NodeId, mut b: NodeId) -> NodeId {
        while self.node(a).depth > self.node(b).depth {
            a = self.parent_or_self(a);
        }
        while self.node(b).depth > self.node(a).depth {
            b = self.parent_or_self(b);
        }
        while a != b {
            a = self.parent_or_self(a);
            b = self.parent_or_self(b);
        }
        a
    }

    fn parent_or_self(&self, id: NodeId) -> NodeId {
        self.node(id).parent.unwrap_or(id)
    }

    /// Largest node depth in the tree.
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

/// Iterator returned by [`Taxonomy::ancestors`].
pub struct Ancestors<'a> {
    taxonomy: &'a Taxonomy,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.taxonomy.node(current).parent;
        Some(current)
    }
}
