use std::sync::Arc;

use crate::error::NonFiniteComponent;

/// Fixed-length iris embedding produced by the embedding model.
///
/// Immutable once built; clones share the same buffer. Length is not
/// checked here, since a mismatch only matters when two embeddings are
/// compared (see [`crate::matcher::cosine_similarity`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    values: Arc<[f32]>,
}

impl Embedding {
    /// Wrap raw model output, rejecting NaN and infinite components.
    pub fn new(values: Vec<f32>) -> Result<Self, NonFiniteComponent> {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(NonFiniteComponent { index });
        }
        Ok(Self {
            values: values.into(),
        })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dot product accumulated left to right in f64. Only called after
    /// [`crate::matcher::cosine_similarity`] has checked lengths.
    pub(crate) fn dot(&self, other: &Embedding) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .fold(0.0f64, |acc, (&a, &b)| acc + a as f64 * b as f64)
    }

    /// Squared L2 norm, accumulated the same way as [`Embedding::dot`].
    pub(crate) fn squared_norm(&self) -> f64 {
        self.values
            .iter()
            .fold(0.0f64, |acc, &v| acc + v as f64 * v as f64)
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.values.to_vec()
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = NonFiniteComponent;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}
