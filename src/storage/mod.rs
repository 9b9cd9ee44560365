//! Template persistence.
//!
//! A [`TemplateStore`] owns at most one template per [`Identity`]. Writes
//! are atomic: a concurrent reader sees either the previous template or the
//! new one, never a mix of both.

mod file;
mod memory;
pub mod record;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::embedding::Embedding;
use crate::error::StoreError;
use crate::identity::Identity;

pub trait TemplateStore: Send + Sync {
    /// `None` when the identity was never enrolled.
    fn get(&self, identity: &Identity) -> Result<Option<Embedding>, StoreError>;

    /// Insert or unconditionally replace. Returns whether a template was
    /// replaced.
    fn put(&self, identity: &Identity, embedding: &Embedding) -> Result<bool, StoreError>;

    /// Insert only when the identity has no template yet. Returns whether
    /// the template was written.
    fn put_if_absent(&self, identity: &Identity, embedding: &Embedding)
        -> Result<bool, StoreError>;

    /// Administrative delete. Returns whether a template existed.
    fn remove(&self, identity: &Identity) -> Result<bool, StoreError>;
}
