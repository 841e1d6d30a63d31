//! Error type shared by every rollup-core operation.

use thiserror::Error;

use crate::record::TaxonId;

pub type Result<T> = std::result::Result<T, RollupError>;

/// Errors raised while building a taxonomy or rolling up a score vector.
///
/// Build-time variants (`EmptyTaxonomy`, `MalformedTaxonomy`, `CyclicTaxonomy`)
/// mean no tree was produced. Every other variant is scoped to one
/// classification event and leaves the tree untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RollupError {
    #[error("taxonomy has no records")]
    EmptyTaxonomy,

    #[error("malformed taxonomy at taxon {taxon_id}: {message}")]
    MalformedTaxonomy { taxon_id: TaxonId, message: String },

    #[error("taxon {taxon_id} does not reach the root (cycle in parent links)")]
    CyclicTaxonomy { taxon_id: TaxonId },

    #[error("leaf index {index} outside [0, {leaf_count})")]
    IndexOutOfRange { index: usize, leaf_count: usize },

    #[error("score vector length {actual} does not match leaf count {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("score vector carries no signal (sum {sum})")]
    DegenerateVector { sum: f64 },

    #[error("no taxon reaches confidence threshold {threshold} (best {best_score})")]
    NoConfidentPrediction { threshold: f32, best_score: f32 },

    #[error("no leaf meets the ratio cutoff {cutoff}")]
    EmptyCandidateSet { cutoff: f64 },

    #[error("ratio cutoff was not derived for this classification event")]
    CutoffNotDerived,

    #[error("taxon {0} is not part of the taxonomy")]
    UnknownTaxon(TaxonId),

    #[error("invalid confidence threshold {0}")]
    InvalidThreshold(f32),
}

impl RollupError {
    pub(crate) fn malformed(taxon_id: TaxonId, message: impl Into<String>) -> Self {
        Self::MalformedTaxonomy {
            taxon_id,
            message: message.into(),
        }
    }

    /// True for failures that mean "no usable answer for this frame" rather
    /// than a broken integration.
    pub fn is_inconclusive(&self) -> bool {
        matches!(
            self,
            Self::DegenerateVector { .. } | Self::NoConfidentPrediction { .. } | Self::EmptyCandidateSet { .. }
        )
    }
}
