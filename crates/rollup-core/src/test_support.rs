//! Small hand-built taxonomies shared by the unit tests.

use crate::record::{RankLevel, TaxonId, TaxonRecord};
use crate::taxonomy::Taxonomy;

pub fn rec(id: TaxonId, name: &str, rank: f32, parent: Option<TaxonId>) -> TaxonRecord {
    let r = TaxonRecord::new(id, name, RankLevel(rank));
    match parent {
        Some(p) => r.with_parent(p),
        None => r,
    }
}

pub fn leaf(id: TaxonId, name: &str, parent: TaxonId, index: usize) -> TaxonRecord {
    rec(id, name, 10.0, Some(parent)).with_leaf_index(index)
}

/// R(1) → G(2) → {S1(3) #0, S2(4) #1}; R(1) → G2(5) → S3(6) #2.
pub fn two_genus_tree() -> Taxonomy {
    Taxonomy::build(vec![
        rec(1, "R", 100.0, None),
        rec(2, "G", 20.0, Some(1)),
        leaf(3, "S1", 2, 0),
        leaf(4, "S2", 2, 1),
        rec(5, "G2", 20.0, Some(1)),
        leaf(6, "S3", 5, 2),
    ])
    .unwrap()
}

/// R(1) → G(2) → {A(3) #0, B(4) #1, C(5) #2}.
pub fn sibling_tree() -> Taxonomy {
    Taxonomy::build(vec![
        rec(1, "R", 100.0, None),
        rec(2, "G", 20.0, Some(1)),
        leaf(3, "A", 2, 0),
        leaf(4, "B", 2, 1),
        leaf(5, "C", 2, 2),
    ])
    .unwrap()
}

/// Life(1) → Family(2) → Subfamily(3) → Tribe(4) → Genus(5) → {Sp1(6) #0, Sp2(7) #1};
/// Family(2) → Genus2(8) → Sp3(9) #2; Subfamily(3) → Genus3(10) → Sp4(11) #3.
pub fn deep_tree() -> Taxonomy {
    Taxonomy::build(vec![
        rec(1, "Life", 100.0, None),
        rec(2, "Family", 30.0, Some(1)),
        rec(3, "Subfamily", 27.0, Some(2)),
        rec(4, "Tribe", 25.0, Some(3)),
        rec(5, "Genus", 20.0, Some(4)),
        leaf(6, "Sp1", 5, 0),
        leaf(7, "Sp2", 5, 1),
        rec(8, "Genus2", 20.0, Some(2)),
        leaf(9, "Sp3", 8, 2),
        rec(10, "Genus3", 20.0, Some(3)),
        leaf(11, "Sp4", 10, 3),
    ])
    .unwrap()
}

/// Species that is itself a model leaf but also has a modeled subspecies:
/// R(1) → G(2) → Sp(3) #0 → Ssp(4) #1; G(2) → Sp2(5) #2.
pub fn leaf_with_children_tree() -> Taxonomy {
    Taxonomy::build(vec![
        rec(1, "R", 100.0, None),
        rec(2, "G", 20.0, Some(1)),
        leaf(3, "Sp", 2, 0),
        rec(4, "Ssp", 5.0, Some(3)).with_leaf_index(1),
        leaf(5, "Sp2", 2, 2),
    ])
    .unwrap()
}
