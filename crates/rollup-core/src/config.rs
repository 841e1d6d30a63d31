//! Per-deployment rollup settings.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RollupError};
use crate::filter::TaxonFilter;
use crate::rollup::RollupEngine;
use crate::taxonomy::Taxonomy;

/// Settings shared by every classification event of a deployment.
/// Missing fields fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollupConfig {
    /// 0-1, default 0.5. Minimum score a prediction must reach.
    pub confidence_threshold: f32,
    /// Default false. Roll up only through major Linnean ranks.
    pub linnean_only: bool,
    /// Restrict (or exclude) one branch before rolling up.
    pub filter: Option<TaxonFilter>,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            linnean_only: false,
            filter: None,
        }
    }
}

impl RollupConfig {
    /// Reject thresholds outside [0, 1] (NaN included).
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(RollupError::InvalidThreshold(self.confidence_threshold));
        }
        Ok(())
    }

    /// Engine over `taxonomy` with this config's rank policy.
    pub fn engine<'t>(&self, taxonomy: &'t Taxonomy) -> RollupEngine<'t> {
        RollupEngine::new(taxonomy).with_linnean_only(self.linnean_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMode;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: RollupConfig = serde_json::from_str(r#"{"linnean_only": true}"#).unwrap();
        assert_eq!(cfg.confidence_threshold, 0.5);
        assert!(cfg.linnean_only);
        assert!(cfg.filter.is_none());
    }

    #[test]
    fn filter_deserializes_nested() {
        let cfg: RollupConfig =
            serde_json::from_str(r#"{"filter": {"taxon_id": 3, "mode": "exclude"}}"#).unwrap();
        let filter = cfg.filter.unwrap();
        assert_eq!(filter.taxon_id, 3);
        assert_eq!(filter.mode, FilterMode::Exclude);
    }

    #[test]
    fn threshold_must_be_a_probability() {
        assert!(RollupConfig::default().validate().is_ok());
        for bad in [-0.1, 1.5, f32::NAN] {
            let cfg = RollupConfig { confidence_threshold: bad, ..Default::default() };
            assert!(matches!(cfg.validate(), Err(RollupError::InvalidThreshold(_))));
        }
        let edge = RollupConfig { confidence_threshold: 1.0, ..Default::default() };
        assert!(edge.validate().is_ok());
    }
}
