//! Seams to the image normalizer and the embedding generator.

use ndarray::Array3;
use std::sync::Arc;

use crate::embedding::Embedding;
use crate::error::UpstreamError;

/// Model input: (height, width, channels).
pub type Tensor = Array3<f32>;

pub trait ImageNormalizer: Send + Sync {
    fn normalize(&self, raw_image: &[u8]) -> Result<Tensor, UpstreamError>;
}

/// Implementations are expected to be ready for use once constructed and to
/// be deterministic for identical input.
pub trait EmbeddingGenerator: Send + Sync {
    fn embed(&self, tensor: &Tensor) -> Result<Embedding, UpstreamError>;
}

impl ImageNormalizer for irisgate_vision::Preprocessor {
    fn normalize(&self, raw_image: &[u8]) -> Result<Tensor, UpstreamError> {
        self.process_bytes(raw_image)
            .map_err(UpstreamError::UnreadableImage)
    }
}

impl EmbeddingGenerator for irisgate_vision::OnnxEmbedder {
    fn embed(&self, tensor: &Tensor) -> Result<Embedding, UpstreamError> {
        let values = self
            .infer(tensor)
            .map_err(UpstreamError::ModelUnavailable)?;
        Ok(Embedding::new(values)?)
    }
}

/// Image bytes in, embedding out.
#[derive(Clone)]
pub struct Extractor {
    normalizer: Arc<dyn ImageNormalizer>,
    generator: Arc<dyn EmbeddingGenerator>,
}

impl Extractor {
    pub fn new(
        normalizer: Arc<dyn ImageNormalizer>,
        generator: Arc<dyn EmbeddingGenerator>,
    ) -> Self {
        Self {
            normalizer,
            generator,
        }
    }

    pub fn extract(&self, raw_image: &[u8]) -> Result<Embedding, UpstreamError> {
        let tensor = self.normalizer.normalize(raw_image)?;
        log::debug!("Preprocessed image shape: {:?}", tensor.shape());

        let embedding = self.generator.embed(&tensor)?;
        log::debug!("Embedding length: {}", embedding.len());
        Ok(embedding)
    }
}
