use anyhow::{Context, Result};
use ndarray::{Array3, Axis};
use once_cell::sync::OnceCell;
use ort::{session::Session, value::Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Runs the iris embedding model on preprocessed tensors.
///
/// The ONNX session is created at most once per instance, either eagerly
/// through [`OnnxEmbedder::load`] or on the first call to
/// [`OnnxEmbedder::infer`]. `Session::run` needs exclusive access, so
/// concurrent callers are serialized on a mutex around the session.
pub struct OnnxEmbedder {
    model_path: PathBuf,
    session: OnceCell<Mutex<Session>>,
}

impl OnnxEmbedder {
    /// Create an embedder that loads `model_path` on first use.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            session: OnceCell::new(),
        }
    }

    /// Create an embedder and load the model immediately.
    pub fn load(model_path: impl Into<PathBuf>) -> Result<Self> {
        let embedder = Self::new(model_path);
        embedder.session()?;
        Ok(embedder)
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn is_loaded(&self) -> bool {
        self.session.get().is_some()
    }

    fn session(&self) -> Result<&Mutex<Session>> {
        self.session.get_or_try_init(|| {
            log::info!("Loading iris embedding model: {}", self.model_path.display());
            let session = crate::model::embedding_session(&self.model_path)?;
            log::info!("Iris embedding model loaded");
            Ok(Mutex::new(session))
        })
    }

    /// Embed a single (H, W, C) tensor. The model receives an NHWC batch of
    /// one and its first output is flattened into the embedding.
    pub fn infer(&self, tensor: &Array3<f32>) -> Result<Vec<f32>> {
        let batch = tensor.as_standard_layout().to_owned().insert_axis(Axis(0));
        log::debug!("Model input shape: {:?}", batch.shape());
        let input_tensor = Value::from_array(batch)?;

        let mut session = self
            .session()?
            .lock()
            .map_err(|_| anyhow::anyhow!("embedding session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![input_tensor])
            .context("running embedding model")?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        log::debug!("Embedding output shape: {:?}", shape);

        if data.is_empty() {
            anyhow::bail!("embedding model produced an empty output");
        }
        Ok(data.to_vec())
    }
}
