pub mod clahe;
pub mod embedder;
pub mod model;
pub mod preprocess;

// Re-export commonly used types
pub use embedder::OnnxEmbedder;
pub use preprocess::Preprocessor;
