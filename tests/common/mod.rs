//! Deterministic stand-ins for the image normalizer and embedding model.
//!
//! Every byte of the "image" becomes one embedding component, so tests can
//! pick exact vectors by choosing bytes.

#![allow(dead_code)]

use std::sync::Arc;

use irisgate::{
    Embedding, EmbeddingGenerator, Extractor, ImageNormalizer, Tensor, UpstreamError,
};
use ndarray::Array3;

pub struct BytesNormalizer;

impl ImageNormalizer for BytesNormalizer {
    fn normalize(&self, raw_image: &[u8]) -> Result<Tensor, UpstreamError> {
        if raw_image.is_empty() || raw_image.starts_with(b"corrupt") {
            return Err(UpstreamError::UnreadableImage(anyhow::anyhow!(
                "cannot decode image"
            )));
        }
        let values = raw_image.iter().map(|&b| b as f32 / 255.0).collect();
        Array3::from_shape_vec((raw_image.len(), 1, 1), values)
            .map_err(|e| UpstreamError::UnreadableImage(e.into()))
    }
}

pub struct FlattenGenerator {
    pub available: bool,
}

impl EmbeddingGenerator for FlattenGenerator {
    fn embed(&self, tensor: &Tensor) -> Result<Embedding, UpstreamError> {
        if !self.available {
            return Err(UpstreamError::ModelUnavailable(anyhow::anyhow!(
                "model not loaded"
            )));
        }
        Ok(Embedding::new(tensor.iter().copied().collect())?)
    }
}

pub fn extractor() -> Extractor {
    Extractor::new(
        Arc::new(BytesNormalizer),
        Arc::new(FlattenGenerator { available: true }),
    )
}

pub fn broken_model_extractor() -> Extractor {
    Extractor::new(
        Arc::new(BytesNormalizer),
        Arc::new(FlattenGenerator { available: false }),
    )
}

/// The embedding the fakes derive from `raw_image`.
pub fn embedding_of(raw_image: &[u8]) -> Embedding {
    Embedding::new(raw_image.iter().map(|&b| b as f32 / 255.0).collect()).unwrap()
}
