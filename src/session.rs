use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Fixed key the grid state is persisted under.
pub const STATE_KEY: &str = "table-state";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Storage medium for session values. Production uses a file per key; tests
/// substitute an in-memory map.
pub trait Backend: Send {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), SessionError>;
}

/// File-per-key backend in the platform cache directory.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new() -> Option<Self> {
        let dirs = ProjectDirs::from("dev", "user-grid", "user-grid")?;
        Some(Self {
            dir: dirs.cache_dir().to_path_buf(),
        })
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Backend for FileBackend {
    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }
}

/// Load-on-construct, save-on-mutate persistence for a single keyed value.
/// The store mirrors state; it never originates changes.
pub struct SessionStore {
    backend: Box<dyn Backend>,
    key: String,
}

impl SessionStore {
    pub fn new(backend: Box<dyn Backend>, key: &str) -> Self {
        Self {
            backend,
            key: key.to_string(),
        }
    }

    /// Stored value at the key, or `default` when absent or unparsable.
    pub fn restore_or<T: DeserializeOwned>(&self, default: T) -> T {
        let Some(text) = self.backend.read(&self.key) else {
            return default;
        };
        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                warn!("discarding malformed session value at {:?}: {e}", self.key);
                default
            }
        }
    }

    /// Serialize and write. Failures are logged and swallowed so the in-memory
    /// state stays authoritative and the view keeps rendering.
    pub fn persist<T: Serialize>(&mut self, value: &T) {
        let text = match serde_json::to_string(value) {
            Ok(t) => t,
            Err(e) => {
                warn!("failed to serialize session value: {e}");
                return;
            }
        };
        if let Err(e) = self.backend.write(&self.key, &text) {
            warn!("failed to persist session value: {e}");
        }
    }
}

#[cfg(test)]
pub struct MemBackend {
    entries: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MemBackend {
    pub fn new() -> Self {
        Self {
            entries: std::collections::HashMap::new(),
        }
    }

    pub fn with(key: &str, value: &str) -> Self {
        let mut backend = Self::new();
        backend.entries.insert(key.to_string(), value.to_string());
        backend
    }
}

#[cfg(test)]
impl Backend for MemBackend {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
