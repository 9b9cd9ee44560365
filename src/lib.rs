pub mod collaborator;
pub mod config;
pub mod embedding;
pub mod error;
pub mod identity;
pub mod matcher;
pub mod service;
pub mod storage;

pub use collaborator::{EmbeddingGenerator, Extractor, ImageNormalizer, Tensor};
pub use embedding::Embedding;
pub use error::{ComparisonError, Error, Result, StoreError, UpstreamError};
pub use identity::{Identity, IdentityCase};
pub use matcher::{cosine_similarity, decide, MatchPolicy, MatchResult};
pub use service::{Enrolled, EnrollmentService, Reenrollment, Verification, VerificationService};
pub use storage::{FileStore, MemoryStore, TemplateStore};

// Re-export vision types for convenience
pub use irisgate_vision::{OnnxEmbedder, Preprocessor};
