//! In-memory template store, for tests and embedding in other processes.

use std::collections::HashMap;
use std::sync::RwLock;

use super::TemplateStore;
use crate::embedding::Embedding;
use crate::error::StoreError;
use crate::identity::Identity;

#[derive(Debug, Default)]
pub struct MemoryStore {
    templates: RwLock<HashMap<Identity, Embedding>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let templates = self.templates.read().map_err(|_| StoreError::Poisoned)?;
        Ok(templates.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl TemplateStore for MemoryStore {
    fn get(&self, identity: &Identity) -> Result<Option<Embedding>, StoreError> {
        let templates = self.templates.read().map_err(|_| StoreError::Poisoned)?;
        Ok(templates.get(identity).cloned())
    }

    fn put(&self, identity: &Identity, embedding: &Embedding) -> Result<bool, StoreError> {
        let mut templates = self.templates.write().map_err(|_| StoreError::Poisoned)?;
        Ok(templates
            .insert(identity.clone(), embedding.clone())
            .is_some())
    }

    fn put_if_absent(
        &self,
        identity: &Identity,
        embedding: &Embedding,
    ) -> Result<bool, StoreError> {
        let mut templates = self.templates.write().map_err(|_| StoreError::Poisoned)?;
        if templates.contains_key(identity) {
            return Ok(false);
        }
        templates.insert(identity.clone(), embedding.clone());
        Ok(true)
    }

    fn remove(&self, identity: &Identity) -> Result<bool, StoreError> {
        let mut templates = self.templates.write().map_err(|_| StoreError::Poisoned)?;
        Ok(templates.remove(identity).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityCase;

    fn id(raw: &str) -> Identity {
        Identity::parse(raw, IdentityCase::Sensitive).unwrap()
    }

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_unknown_identity_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get(&id("nobody")).unwrap(), None);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_put_overwrites() {
        let store = MemoryStore::new();
        assert!(!store.put(&id("x"), &emb(&[1.0, 0.0])).unwrap());
        assert!(store.put(&id("x"), &emb(&[0.0, 1.0])).unwrap());
        assert_eq!(store.get(&id("x")).unwrap(), Some(emb(&[0.0, 1.0])));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_put_if_absent_keeps_first() {
        let store = MemoryStore::new();
        assert!(store.put_if_absent(&id("x"), &emb(&[1.0])).unwrap());
        assert!(!store.put_if_absent(&id("x"), &emb(&[2.0])).unwrap());
        assert_eq!(store.get(&id("x")).unwrap(), Some(emb(&[1.0])));
    }

    #[test]
    fn test_remove() {
        let store = MemoryStore::new();
        store.put(&id("x"), &emb(&[1.0])).unwrap();
        assert!(store.remove(&id("x")).unwrap());
        assert!(!store.remove(&id("x")).unwrap());
        assert_eq!(store.get(&id("x")).unwrap(), None);
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.templates.write().unwrap();
            panic!("poison the template lock");
        })
        .join();

        assert!(matches!(store.len(), Err(StoreError::Poisoned)));
        assert!(matches!(store.is_empty(), Err(StoreError::Poisoned)));
        assert!(matches!(store.get(&id("x")), Err(StoreError::Poisoned)));
    }
}
