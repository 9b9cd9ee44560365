use std::path::PathBuf;
use thiserror::Error;

use crate::identity::Identity;

/// An embedding component was NaN or infinite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("embedding component {index} is not finite")]
pub struct NonFiniteComponent {
    pub index: usize,
}

/// Failures of the image normalizer or the embedding generator.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("unreadable image: {0:#}")]
    UnreadableImage(anyhow::Error),

    #[error("embedding model unavailable: {0:#}")]
    ModelUnavailable(anyhow::Error),

    #[error("embedding model produced an invalid embedding: {0}")]
    InvalidEmbedding(#[from] NonFiniteComponent),
}

/// Reasons two embeddings cannot be scored against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ComparisonError {
    /// The stored template and the fresh capture come from differently shaped
    /// models, or one of them is empty.
    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("embedding has zero magnitude")]
    DegenerateVector,
}

/// Why a persisted template could not be decoded.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unsupported template format version {0}")]
    UnsupportedVersion(u16),

    #[error("malformed template record: {0}")]
    Malformed(#[from] postcard::Error),

    #[error("{0} trailing bytes after template record")]
    TrailingBytes(usize),

    #[error("template belongs to {found:?}, expected {expected:?}")]
    IdentityMismatch { expected: String, found: String },

    #[error(transparent)]
    NonFinite(#[from] NonFiniteComponent),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("template store I/O failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt template at {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("failed to encode template: {0}")]
    Encode(#[source] postcard::Error),

    #[error("template store lock poisoned")]
    Poisoned,
}

/// Everything enrollment and verification can fail with. An identity with
/// no template is not an error; see [`crate::service::Verification`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("identity must not be empty")]
    InvalidIdentity,

    #[error("identity {0} is already enrolled")]
    AlreadyEnrolled(Identity),

    #[error("upstream processing failed: {0}")]
    UpstreamProcessing(#[from] UpstreamError),

    #[error("comparison failed: {0}")]
    Comparison(#[from] ComparisonError),

    #[error("template store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
