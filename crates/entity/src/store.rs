//! Store capabilities that file and store references resolve through.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::{Arc, RwLock},
};

use {bytes::Bytes, dashmap::DashMap, serde_json::Value, tracing::warn};

/// A value held by a blob or object store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Bytes(Bytes),
    Object(Value),
}

/// Key/value lookup over one named store.
///
/// Lookups are synchronous and may block on I/O (see [`FileSystemStore`]);
/// async callers run them under `tokio::task::block_in_place`.
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Option<StoreValue>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Access to the files store and to named stores.
pub trait StoreAccess: Send + Sync {
    fn store(&self, name: &str) -> Option<Arc<dyn Store>>;

    fn files(&self) -> Option<Arc<dyn Store>>;
}

// ── InMemoryStore ───────────────────────────────────────────────────────────

/// Concurrent in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, StoreValue>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, value: StoreValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn put_bytes(&self, key: impl Into<String>, bytes: impl Into<Bytes>) {
        self.put(key, StoreValue::Bytes(bytes.into()));
    }

    pub fn put_object(&self, key: impl Into<String>, value: Value) {
        self.put(key, StoreValue::Object(value));
    }

    pub fn remove(&self, key: &str) -> Option<StoreValue> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Store for InMemoryStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

// ── FileSystemStore ─────────────────────────────────────────────────────────

/// Read-only store over a directory. Keys are relative paths; keys that
/// would escape the root are treated as missing.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            warn!(key, "rejecting file key outside the files root");
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl Store for FileSystemStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(data) => Some(StoreValue::Bytes(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read file");
                None
            },
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_some_and(|p| p.is_file())
    }
}

// ── Stores ──────────────────────────────────────────────────────────────────

/// Registry of named stores plus an optional files store.
#[derive(Default)]
pub struct Stores {
    named: DashMap<String, Arc<dyn Store>>,
    files: RwLock<Option<Arc<dyn Store>>>,
}

impl Stores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(self, files: Arc<dyn Store>) -> Self {
        self.set_files(files);
        self
    }

    pub fn with_store(self, name: impl Into<String>, store: Arc<dyn Store>) -> Self {
        self.register(name, store);
        self
    }

    pub fn register(&self, name: impl Into<String>, store: Arc<dyn Store>) {
        self.named.insert(name.into(), store);
    }

    pub fn set_files(&self, files: Arc<dyn Store>) {
        *self.files.write().unwrap_or_else(|e| e.into_inner()) = Some(files);
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.named.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl StoreAccess for Stores {
    fn store(&self, name: &str) -> Option<Arc<dyn Store>> {
        self.named.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn files(&self) -> Option<Arc<dyn Store>> {
        self.files.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
