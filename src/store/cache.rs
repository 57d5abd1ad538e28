use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct CachedDocument {
    modified: SystemTime,
    len: u64,
    bytes: Arc<Vec<u8>>,
}

/// Raw document bytes keyed by path, valid while the file's mtime and size are
/// unchanged. Never the system of record: a miss or a poisoned lock falls back
/// to reading the file.
#[derive(Debug)]
pub struct ReadCache {
    entries: Mutex<HashMap<PathBuf, CachedDocument>>,
    capacity: usize,
}

impl ReadCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn read(&self, path: &Path) -> io::Result<Arc<Vec<u8>>> {
        let metadata = fs::metadata(path)?;
        let modified = metadata.modified()?;
        let len = metadata.len();

        if let Ok(entries) = self.entries.lock() {
            if let Some(hit) = entries.get(path) {
                if hit.modified == modified && hit.len == len {
                    return Ok(hit.bytes.clone());
                }
            }
        }

        let bytes = Arc::new(fs::read(path)?);
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() >= self.capacity && !entries.contains_key(path) {
                entries.clear();
            }
            entries.insert(
                path.to_path_buf(),
                CachedDocument {
                    modified,
                    len,
                    bytes: bytes.clone(),
                },
            );
        }
        Ok(bytes)
    }

    pub fn invalidate(&self, path: &Path) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(path);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
