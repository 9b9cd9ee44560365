use serde::Serialize;

use crate::config::DEFAULT_THRESHOLD;
use crate::embedding::Embedding;
use crate::error::ComparisonError;

/// Outcome of comparing a fresh capture against an enrolled template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    pub similarity: f32,
}

/// Cosine similarity between two embeddings.
///
/// Both sides must have the same non-zero length and a non-zero magnitude.
/// Sums run left to right in f64, so identical inputs always give the same
/// bits. The result is not clamped.
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> Result<f32, ComparisonError> {
    if a.len() != b.len() || a.is_empty() {
        return Err(ComparisonError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let norms = a.squared_norm() * b.squared_norm();
    if norms == 0.0 {
        return Err(ComparisonError::DegenerateVector);
    }

    Ok((a.dot(b) / norms.sqrt()) as f32)
}

/// A similarity exactly equal to the threshold is not a match.
pub fn decide(similarity: f32, threshold: f32) -> bool {
    similarity > threshold
}

/// Single global threshold applied to every identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    threshold: f32,
}

impl MatchPolicy {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn decide(&self, similarity: f32) -> bool {
        decide(similarity, self.threshold)
    }

    /// Score `capture` against `template` and apply the threshold.
    pub fn evaluate(
        &self,
        template: &Embedding,
        capture: &Embedding,
    ) -> Result<MatchResult, ComparisonError> {
        let similarity = cosine_similarity(template, capture)?;
        Ok(MatchResult {
            matched: self.decide(similarity),
            similarity,
        })
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_self_similarity_is_one() {
        for values in [
            vec![1.0, 0.0, 0.0],
            vec![0.3, 0.1, 0.9, 0.05],
            vec![-2.5, 7.0, 1.0e-3],
            (0..128).map(|i| (i as f32 * 0.37).sin().abs()).collect(),
        ] {
            let a = emb(&values);
            let sim = cosine_similarity(&a, &a).unwrap();
            assert!((sim - 1.0).abs() < 1e-6, "self similarity was {}", sim);
        }
    }

    #[test]
    fn test_symmetric() {
        let a = emb(&[0.2, 0.7, 0.1, 0.4]);
        let b = emb(&[0.9, 0.05, 0.3, 0.6]);
        assert_eq!(
            cosine_similarity(&a, &b).unwrap(),
            cosine_similarity(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        let a = emb(&[1.0, 0.0]);
        let b = emb(&[0.0, 3.0]);
        let c = emb(&[-4.0, 0.0]);
        assert_eq!(cosine_similarity(&a, &b).unwrap(), 0.0);
        // not clamped to [0, 1]
        assert_eq!(cosine_similarity(&a, &c).unwrap(), -1.0);
    }

    #[test]
    fn test_magnitude_invariant() {
        let a = emb(&[0.5, 0.25, 0.125]);
        let b = emb(&[4.0, 2.0, 1.0]);
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = emb(&[1.0, 2.0, 3.0]);
        let b = emb(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            cosine_similarity(&a, &b),
            Err(ComparisonError::DimensionMismatch { left: 3, right: 5 })
        );
    }

    #[test]
    fn test_longer_vector_is_not_truncated() {
        // equal on the shared prefix, so truncating would score 1.0
        let a = emb(&[1.0, 2.0, 3.0]);
        let b = emb(&[1.0, 2.0, 3.0, 0.5, 0.5]);
        assert_eq!(
            cosine_similarity(&a, &b),
            Err(ComparisonError::DimensionMismatch { left: 3, right: 5 })
        );
        assert_eq!(
            cosine_similarity(&b, &a),
            Err(ComparisonError::DimensionMismatch { left: 5, right: 3 })
        );
    }

    #[test]
    fn test_empty_vectors_are_rejected() {
        let a = emb(&[]);
        assert_eq!(
            cosine_similarity(&a, &a),
            Err(ComparisonError::DimensionMismatch { left: 0, right: 0 })
        );
    }

    #[test]
    fn test_degenerate_vector() {
        let zero = emb(&[0.0, 0.0, 0.0]);
        let a = emb(&[1.0, 2.0, 3.0]);
        assert_eq!(
            cosine_similarity(&zero, &a),
            Err(ComparisonError::DegenerateVector)
        );
        assert_eq!(
            cosine_similarity(&a, &zero),
            Err(ComparisonError::DegenerateVector)
        );
    }

    #[test]
    fn test_deterministic() {
        let a = emb(&[0.123, 0.456, 0.789, 0.321]);
        let b = emb(&[0.987, 0.654, 0.321, 0.111]);
        let first = cosine_similarity(&a, &b).unwrap();
        for _ in 0..10 {
            assert_eq!(cosine_similarity(&a, &b).unwrap().to_bits(), first.to_bits());
        }
    }

    #[test]
    fn test_strict_threshold_boundary() {
        assert!(!decide(0.85, 0.85));
        assert!(decide(0.8500001, 0.85));
        assert!(!decide(0.5, 0.85));
    }

    #[test]
    fn test_default_policy() {
        let policy = MatchPolicy::default();
        assert_eq!(policy.threshold(), 0.85);
        assert!(!policy.decide(0.85));
        assert!(policy.decide(0.9));
    }

    #[test]
    fn test_evaluate() {
        let policy = MatchPolicy::new(0.5);
        let a = emb(&[1.0, 0.0]);
        let b = emb(&[1.0, 1.0]);
        let result = policy.evaluate(&a, &b).unwrap();
        assert!(result.matched);
        assert!((result.similarity - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);

        let result = MatchPolicy::new(0.8).evaluate(&a, &b).unwrap();
        assert!(!result.matched);
    }
}
