use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{record, TemplateStore};
use crate::embedding::Embedding;
use crate::error::StoreError;
use crate::identity::Identity;

/// One file per identity under a root directory.
///
/// File names are the hex SHA-256 of the identity, so identities of any
/// length or content map to a fixed-size safe name. The record itself
/// carries the identity and is checked on read. Writes go to a uniquely named temp file that
/// is then renamed over the template; mutations are serialized on a
/// store-wide lock so the last writer is well defined.
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        log::debug!("Template store at {}", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn template_path(&self, identity: &Identity) -> PathBuf {
        let digest = Sha256::digest(identity.as_str().as_bytes());
        self.root.join(format!("{}.tpl", hex::encode(digest)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock.lock().map_err(|_| StoreError::Poisoned)
    }

    fn read(&self, identity: &Identity) -> Result<Option<Embedding>, StoreError> {
        let path = self.template_path(identity);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        record::decode(&data, identity)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { path, source })
    }

    fn write(&self, identity: &Identity, embedding: &Embedding) -> Result<(), StoreError> {
        let data = record::encode(identity, embedding).map_err(StoreError::Encode)?;
        let path = self.template_path(identity);
        let tmp = self.root.join(format!(".{}.tmp", Uuid::new_v4()));

        if let Err(source) = replace_file(&tmp, &path, &data) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Io { path, source });
        }
        log::debug!("Wrote template {}", path.display());
        Ok(())
    }
}

fn replace_file(tmp: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, target)
}

impl TemplateStore for FileStore {
    fn get(&self, identity: &Identity) -> Result<Option<Embedding>, StoreError> {
        self.read(identity)
    }

    fn put(&self, identity: &Identity, embedding: &Embedding) -> Result<bool, StoreError> {
        let _guard = self.lock()?;
        let replaced = self.template_path(identity).exists();
        self.write(identity, embedding)?;
        Ok(replaced)
    }

    fn put_if_absent(
        &self,
        identity: &Identity,
        embedding: &Embedding,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock()?;
        if self.template_path(identity).exists() {
            return Ok(false);
        }
        self.write(identity, embedding)?;
        Ok(true)
    }

    fn remove(&self, identity: &Identity) -> Result<bool, StoreError> {
        let _guard = self.lock()?;
        let path = self.template_path(identity);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}
