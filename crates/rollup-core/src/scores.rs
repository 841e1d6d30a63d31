//! Score vector utilities: normalization and vision/geo fusion.
//!
//! Sums are accumulated in f64; the vectors themselves stay f32, the width
//! classifiers emit.

use crate::error::{Result, RollupError};

/// Divide every element by the vector sum.
///
/// Fails with `DegenerateVector` when the sum is not strictly positive
/// (all-zero, negative, or NaN input).
pub fn normalize(scores: &[f32]) -> Result<Vec<f32>> {
    let sum: f64 = scores.iter().map(|&s| s as f64).sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(RollupError::DegenerateVector { sum });
    }
    Ok(scores.iter().map(|&s| (s as f64 / sum) as f32).collect())
}

/// Fuse image and location evidence: elementwise product, renormalized.
///
/// Both vectors must live in the same leaf space. When the modalities never
/// agree on a leaf the product is all zero and `DegenerateVector` is returned.
pub fn combine(vision: &[f32], geo: &[f32]) -> Result<Vec<f32>> {
    check_len(vision.len(), geo.len())?;
    let product: Vec<f32> = vision.iter().zip(geo).map(|(&v, &g)| v * g).collect();
    normalize(&product)
}

/// Sum of a raw vector in f64.
pub fn total(scores: &[f32]) -> f64 {
    scores.iter().map(|&s| s as f64).sum()
}

pub(crate) fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RollupError::LengthMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalize_sums_to_one() {
        let v = normalize(&[2.0, 1.0, 1.0, 0.0]).unwrap();
        assert_relative_eq!(v.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(v[0], 0.5);
        assert_eq!(v[3], 0.0);
    }

    #[test]
    fn normalize_leaves_input_untouched() {
        let raw = vec![3.0f32, 1.0];
        let _ = normalize(&raw).unwrap();
        assert_eq!(raw, vec![3.0, 1.0]);
    }

    #[test]
    fn normalize_rejects_degenerate_vectors() {
        assert!(matches!(normalize(&[0.0, 0.0]), Err(RollupError::DegenerateVector { .. })));
        assert!(matches!(normalize(&[-1.0, 0.5]), Err(RollupError::DegenerateVector { .. })));
        assert!(matches!(normalize(&[]), Err(RollupError::DegenerateVector { .. })));
        assert!(matches!(normalize(&[f32::NAN, 1.0]), Err(RollupError::DegenerateVector { .. })));
    }

    #[test]
    fn combine_multiplies_then_renormalizes() {
        let fused = combine(&[0.5, 0.3, 0.2], &[0.1, 0.6, 0.3]).unwrap();
        // products 0.05, 0.18, 0.06 -> sum 0.29
        assert_relative_eq!(fused[0], 0.05 / 0.29, epsilon = 1e-6);
        assert_relative_eq!(fused[1], 0.18 / 0.29, epsilon = 1e-6);
        assert_relative_eq!(fused.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn combine_is_symmetric() {
        let a = [0.7, 0.2, 0.1, 0.0];
        let b = [0.05, 0.5, 0.25, 0.2];
        assert_eq!(combine(&a, &b).unwrap(), combine(&b, &a).unwrap());
    }

    #[test]
    fn combine_rejects_length_mismatch() {
        assert_eq!(
            combine(&[0.5, 0.5], &[1.0]),
            Err(RollupError::LengthMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn combine_without_overlap_is_degenerate() {
        let err = combine(&[1.0, 0.0], &[0.0, 1.0]).unwrap_err();
        assert!(matches!(err, RollupError::DegenerateVector { .. }));
    }
}
