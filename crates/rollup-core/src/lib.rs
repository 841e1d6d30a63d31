//! Taxonomy-aware rollup of classifier scores.
//!
//! A [`Taxonomy`] is built once from taxon records and then shared read-only.
//! Each classification event hands a leaf score vector to a [`RollupEngine`],
//! which turns it into a [`Prediction`] or a [`BranchResult`].

pub mod batch;
pub mod config;
pub mod error;
pub mod filter;
pub mod prediction;
pub mod record;
pub mod rollup;
pub mod scores;
pub mod taxonomy;

#[cfg(test)]
mod test_support;

pub use batch::{classify_frame, classify_frames, Frame, FrameResult};
pub use config::RollupConfig;
pub use error::{Result, RollupError};
pub use filter::{FilterMode, TaxonFilter};
pub use prediction::{BranchEntry, BranchKind, BranchResult, NearbyTaxon, Prediction};
pub use record::{RankLevel, TaxonId, TaxonRecord, LIFE_TAXON_ID};
pub use rollup::{AggregatedScores, RatioCutoff, RollupEngine, RollupSession};
pub use scores::{combine, normalize};
pub use taxonomy::{NodeId, TaxonNode, Taxonomy};
