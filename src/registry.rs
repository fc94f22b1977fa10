//! In-memory registry of uploaded files.
//!
//! Maps the identifier handed out on upload to the stored file's record. Lives
//! for the process lifetime only; files on disk survive a restart but their
//! identifiers do not.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Record of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: String,
    pub filename: String,
    pub bytes: u64,
    /// Unix timestamp in seconds.
    pub created_at: i64,
}

#[derive(Debug)]
struct Entry {
    /// Registration order; strictly increasing, unlike `created_at`.
    seq: u64,
    file: StoredFile,
}

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<String, Entry>,
    next_seq: u64,
}

/// Shared identifier → file registry. Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new upload under a fresh identifier.
    pub fn register(&self, filename: &str, bytes: u64) -> StoredFile {
        let file = StoredFile {
            id: Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            bytes,
            created_at: chrono::Utc::now().timestamp(),
        };
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.files.insert(
            file.id.clone(),
            Entry {
                seq,
                file: file.clone(),
            },
        );
        tracing::debug!("FileRegistry: registered '{}' as {}", file.filename, file.id);
        file
    }

    /// Look up a file by identifier.
    pub fn get(&self, id: &str) -> Option<StoredFile> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.files.get(id).map(|entry| entry.file.clone())
    }

    /// Reverse lookup by filename.
    ///
    /// The same filename may have been uploaded more than once; the most
    /// recently registered record is returned since the file on disk holds
    /// the last write.
    pub fn find_by_filename(&self, filename: &str) -> Option<StoredFile> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .files
            .values()
            .filter(|entry| entry.file.filename == filename)
            .max_by_key(|entry| entry.seq)
            .map(|entry| entry.file.clone())
    }
}
