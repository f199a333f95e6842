//! Blob stores: a directory-backed one for hosted runs and an in-memory one.
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use powder_traits::BlobStore;

use crate::error::HwError;

type BoxErr = Box<dyn std::error::Error + Send + Sync>;

fn file_name(key: &str) -> Result<&str, HwError> {
    let name = key.trim_start_matches('/');
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return Err(HwError::Storage(format!("invalid key {key:?}")));
    }
    Ok(name)
}

/// Flat key-value store: each key is one file under `root`.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    mounted: bool,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mounted: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, HwError> {
        if !self.mounted {
            return Err(HwError::Storage("store not mounted".into()));
        }
        Ok(self.root.join(file_name(key)?))
    }
}

impl BlobStore for FsBlobStore {
    fn mount(&mut self) -> Result<(), BoxErr> {
        fs::create_dir_all(&self.root).map_err(|e| {
            HwError::Storage(format!("mount {}: {e}", self.root.display()))
        })?;
        self.mounted = true;
        tracing::debug!(root = %self.root.display(), "blob store mounted");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BoxErr> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HwError::Io(e).into()),
        }
    }

    fn save(&mut self, key: &str, data: &[u8]) -> Result<(), BoxErr> {
        let path = self.path_for(key)?;
        // write-then-rename so a crash never leaves a torn record
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data).map_err(HwError::Io)?;
        fs::rename(&tmp, &path).map_err(HwError::Io)?;
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }

    fn erase_all(&mut self) -> Result<(), BoxErr> {
        if !self.mounted {
            return Err(HwError::Storage("store not mounted".into()).into());
        }
        for entry in fs::read_dir(&self.root).map_err(HwError::Io)? {
            let path = entry.map_err(HwError::Io)?.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(HwError::Io)?;
            }
        }
        tracing::info!(root = %self.root.display(), "blob store erased");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    blobs: HashMap<String, Vec<u8>>,
    fail_mount: bool,
    fail_saves: bool,
    saves: u32,
}

/// In-memory store; clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose mount always fails.
    pub fn broken() -> Self {
        let s = Self::default();
        s.inner.borrow_mut().fail_mount = true;
        s
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.inner.borrow_mut().fail_saves = fail;
    }

    /// Seed a blob directly (bypassing `save`).
    pub fn insert(&self, key: &str, data: &[u8]) {
        let name = key.trim_start_matches('/').to_string();
        self.inner.borrow_mut().blobs.insert(name, data.to_vec());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner
            .borrow()
            .blobs
            .get(key.trim_start_matches('/'))
            .cloned()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> u32 {
        self.inner.borrow().saves
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().blobs.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn mount(&mut self) -> Result<(), BoxErr> {
        if self.inner.borrow().fail_mount {
            return Err(HwError::Storage("mount failed".into()).into());
        }
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BoxErr> {
        let name = file_name(key)?;
        Ok(self.inner.borrow().blobs.get(name).cloned())
    }

    fn save(&mut self, key: &str, data: &[u8]) -> Result<(), BoxErr> {
        let name = file_name(key)?.to_string();
        let mut inner = self.inner.borrow_mut();
        if inner.fail_saves {
            return Err(HwError::Storage("write failed".into()).into());
        }
        inner.blobs.insert(name, data.to_vec());
        inner.saves += 1;
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        file_name(key)
            .map(|name| self.inner.borrow().blobs.contains_key(name))
            .unwrap_or(false)
    }

    fn erase_all(&mut self) -> Result<(), BoxErr> {
        self.inner.borrow_mut().blobs.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fs_store_round_trips_and_erases() {
        let dir = tempdir().unwrap();
        let mut store = FsBlobStore::new(dir.path().join("data"));
        store.mount().unwrap();
        assert!(store.load("/settings.json").unwrap().is_none());
        store.save("/settings.json", b"{}").unwrap();
        assert!(store.exists("/settings.json"));
        assert_eq!(store.load("/settings.json").unwrap().unwrap(), b"{}");
        store.erase_all().unwrap();
        assert!(!store.exists("/settings.json"));
    }

    #[test]
    fn fs_store_requires_mount() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let err = store.load("/settings.json").expect_err("unmounted");
        assert!(err.to_string().contains("not mounted"));
    }

    #[test]
    fn keys_cannot_escape_root() {
        let dir = tempdir().unwrap();
        let mut store = FsBlobStore::new(dir.path());
        store.mount().unwrap();
        assert!(store.save("/../evil", b"x").is_err());
        assert!(store.save("/a/b", b"x").is_err());
    }

    #[test]
    fn memory_store_shares_state_between_clones() {
        let handle = MemoryBlobStore::new();
        let mut store = handle.clone();
        store.save("/settings.json", b"[]").unwrap();
        assert_eq!(handle.get("/settings.json").unwrap(), b"[]");
        assert_eq!(handle.save_count(), 1);
        handle.set_fail_saves(true);
        assert!(store.save("/settings.json", b"{}").is_err());
        assert_eq!(handle.save_count(), 1);
    }
}
