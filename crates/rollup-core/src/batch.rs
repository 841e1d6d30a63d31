//! Classifying many independent frames against one taxonomy.
//!
//! With the `threading` feature frames run on the rayon pool; the taxonomy is
//! only ever read, so every worker shares it.

use serde::{Deserialize, Serialize};

#[cfg(feature = "threading")]
use rayon::prelude::*;

use crate::config::RollupConfig;
use crate::error::Result;
use crate::prediction::{NearbyTaxon, Prediction};
use crate::rollup::RollupEngine;

/// Classifier output for one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Caller-side identifier echoed into the result.
    #[serde(default)]
    pub id: Option<String>,
    pub vision: Vec<f32>,
    #[serde(default)]
    pub geo: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub prediction: Prediction,
    /// Present only for frames that carried location scores.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nearby: Vec<NearbyTaxon>,
}

/// Filter, fuse (when geo is present), and roll up a single frame.
pub fn classify_frame(engine: RollupEngine<'_>, config: &RollupConfig, frame: &Frame) -> Result<FrameResult> {
    let vision = match &config.filter {
        Some(filter) => filter.apply(engine.taxonomy(), &frame.vision)?,
        None => frame.vision.clone(),
    };

    let (prediction, nearby) = match &frame.geo {
        Some(geo) => (
            engine.inflate_top_prediction_fused(&vision, geo, config.confidence_threshold)?,
            engine.expected_nearby(geo)?,
        ),
        None => (
            engine.inflate_top_prediction(&vision, config.confidence_threshold)?,
            Vec::new(),
        ),
    };

    Ok(FrameResult {
        id: frame.id.clone(),
        prediction,
        nearby,
    })
}

/// One result per frame, in input order. A failing frame does not affect
/// the others.
pub fn classify_frames(engine: RollupEngine<'_>, config: &RollupConfig, frames: &[Frame]) -> Vec<Result<FrameResult>> {
    #[cfg(feature = "threading")]
    let results = frames
        .par_iter()
        .map(|f| classify_frame(engine, config, f))
        .collect();

    #[cfg(not(feature = "threading"))]
    let results = frames
        .iter()
        .map(|f| classify_frame(engine, config, f))
        .collect();

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RollupError;
    use crate::filter::TaxonFilter;
    use crate::test_support::two_genus_tree;

    fn frame(vision: &[f32], geo: Option<&[f32]>) -> Frame {
        Frame {
            id: None,
            vision: vision.to_vec(),
            geo: geo.map(|g| g.to_vec()),
        }
    }

    #[test]
    fn frames_keep_input_order() {
        let tree = two_genus_tree();
        let config = RollupConfig::default();
        let frames = vec![
            frame(&[0.6, 0.3, 0.1], None),
            frame(&[0.1, 0.2, 0.7], None),
            frame(&[0.35, 0.3, 0.35], None),
        ];
        let results = classify_frames(config.engine(&tree), &config, &frames);
        let names: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().prediction.name)
            .collect();
        assert_eq!(names, vec!["S1", "S3", "G"]);
    }

    #[test]
    fn a_bad_frame_does_not_poison_the_batch() {
        let tree = two_genus_tree();
        let config = RollupConfig::default();
        let frames = vec![frame(&[0.6, 0.3], None), frame(&[0.6, 0.3, 0.1], None)];
        let results = classify_frames(config.engine(&tree), &config, &frames);
        assert_eq!(
            results[0].as_ref().unwrap_err(),
            &RollupError::LengthMismatch { expected: 3, actual: 2 }
        );
        assert!(results[1].is_ok());
    }

    #[test]
    fn geo_frames_are_fused() {
        let tree = two_genus_tree();
        let config = RollupConfig::default();
        let f = Frame {
            id: Some("obs-1".into()),
            ..frame(&[0.5, 0.3, 0.2], Some(&[0.2, 0.6, 0.2]))
        };
        let result = classify_frame(config.engine(&tree), &config, &f).unwrap();
        assert_eq!(result.id.as_deref(), Some("obs-1"));
        assert_eq!(result.prediction.name, "S2");
        assert_eq!(result.prediction.geo_score, Some(0.6));
        assert!(result.nearby.is_empty());
    }

    #[test]
    fn config_filter_applies_before_rollup() {
        let tree = two_genus_tree();
        let config = RollupConfig {
            filter: Some(TaxonFilter::exclude(2)),
            confidence_threshold: 0.0,
            ..Default::default()
        };
        let result = classify_frame(config.engine(&tree), &config, &frame(&[0.6, 0.3, 0.1], None)).unwrap();
        assert_eq!(result.prediction.name, "S3");
    }

    #[test]
    fn frame_json_defaults_optional_fields() {
        let f: Frame = serde_json::from_str(r#"{"vision": [0.5, 0.5]}"#).unwrap();
        assert!(f.id.is_none());
        assert!(f.geo.is_none());
    }
}
