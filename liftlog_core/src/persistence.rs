//! Snapshot persistence for the store's three collections.
//!
//! Each collection is serialized on its own into a named slot of a key-value
//! blob store. Slots are loaded independently: a missing or unreadable slot
//! comes back empty without affecting the other two.

use crate::{Error, Exercise, Result, Snapshot, TrainingPlan, TrainingSession};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Slot holding the exercise collection (logs included)
pub const EXERCISES_KEY: &str = "exercises";
/// Slot holding the session collection
pub const SESSIONS_KEY: &str = "sessions";
/// Slot holding the plan collection
pub const PLANS_KEY: &str = "plans";

/// Sidecar file every reader and writer of a directory locks
const LOCK_FILE: &str = ".lock";

// ============================================================================
// Blob Stores
// ============================================================================

/// Key-value store of opaque byte blobs
pub trait BlobStore {
    /// Fetch a blob; `Ok(None)` when the key was never written
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the blob stored under `key`
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Blob store keeping one `<key>.json` file per slot in a directory
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Create a blob store rooted at `dir` (created lazily on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Open the directory's lock file
    ///
    /// Slot files are replaced by rename, so locks must live on a path that
    /// outlasts them.
    fn lock_file(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE))?;
        Ok(file)
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        // Shared lock keeps a writer from swapping the file mid-read
        let lock = self.lock_file()?;
        lock.lock_shared()?;

        let mut bytes = Vec::new();
        let read = File::open(&path)
            .and_then(|file| std::io::BufReader::new(file).read_to_end(&mut bytes));
        lock.unlock()?;
        read?;

        tracing::debug!("Read {} bytes from {:?}", bytes.len(), path);
        Ok(Some(bytes))
    }

    /// Atomically replaces the slot file by:
    /// 1. Taking the directory's exclusive lock
    /// 2. Writing to a temp file in the same directory and syncing it
    /// 3. Renaming over the original
    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        let lock = self.lock_file()?;
        lock.lock_exclusive()?;
        let written = write_atomically(&self.dir, &path, bytes);
        lock.unlock()?;
        written?;

        tracing::debug!("Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }
}

fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        writer.write_all(bytes)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// In-process blob store
#[derive(Clone, Debug, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a slot with arbitrary bytes
    pub fn put_raw(&mut self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.blobs.insert(key.to_string(), bytes.into());
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn put(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

// ============================================================================
// Snapshot Persistence
// ============================================================================

/// Outcome of loading a single slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    /// Parsed successfully with this many records
    Loaded(usize),
    /// Nothing stored under the key
    Missing,
    /// Stored bytes could not be read or parsed; the slot defaulted to empty
    Corrupt(String),
}

impl SlotStatus {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, SlotStatus::Corrupt(_))
    }
}

/// Per-slot outcome of a load
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    pub exercises: SlotStatus,
    pub sessions: SlotStatus,
    pub plans: SlotStatus,
}

impl LoadReport {
    /// True if any slot had to be discarded
    pub fn has_corruption(&self) -> bool {
        self.exercises.is_corrupt() || self.sessions.is_corrupt() || self.plans.is_corrupt()
    }
}

/// Collections recovered by a load, plus how each slot fared
#[derive(Clone, Debug)]
pub struct LoadedState {
    pub snapshot: Snapshot,
    pub report: LoadReport,
}

/// Durable storage for the store's collections
pub trait Persistence {
    /// Write all three collections
    fn save(
        &mut self,
        exercises: &[Exercise],
        sessions: &[TrainingSession],
        plans: &[TrainingPlan],
    ) -> Result<()>;

    /// Read all three collections; never fails as a whole
    fn load(&self) -> LoadedState;
}

/// JSON snapshot writer over any blob store
pub struct SnapshotAdapter<B: BlobStore> {
    blobs: B,
}

impl<B: BlobStore> SnapshotAdapter<B> {
    pub fn new(blobs: B) -> Self {
        Self { blobs }
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn blobs_mut(&mut self) -> &mut B {
        &mut self.blobs
    }

    fn write_slot<T: Serialize>(&mut self, key: &str, records: &[T]) -> Result<()> {
        // Compact JSON, one array per slot
        let bytes = serde_json::to_vec(records)?;
        self.blobs.put(key, &bytes)
    }

    fn read_slot<T: DeserializeOwned>(&self, key: &str) -> (Vec<T>, SlotStatus) {
        let bytes = match self.blobs.get(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!("No data stored under slot '{}'", key);
                return (Vec::new(), SlotStatus::Missing);
            }
            Err(e) => {
                tracing::warn!("Failed to read slot '{}': {}. Using empty collection.", key, e);
                return (Vec::new(), SlotStatus::Corrupt(e.to_string()));
            }
        };

        match serde_json::from_slice::<Vec<T>>(&bytes) {
            Ok(records) => {
                let count = records.len();
                (records, SlotStatus::Loaded(count))
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse slot '{}': {}. Using empty collection.",
                    key,
                    e
                );
                (Vec::new(), SlotStatus::Corrupt(e.to_string()))
            }
        }
    }
}

impl SnapshotAdapter<FileBlobStore> {
    /// Snapshot adapter writing slot files under `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileBlobStore::new(dir))
    }
}

impl<B: BlobStore> Persistence for SnapshotAdapter<B> {
    fn save(
        &mut self,
        exercises: &[Exercise],
        sessions: &[TrainingSession],
        plans: &[TrainingPlan],
    ) -> Result<()> {
        // Slots are independent: a failed write must not skip the others
        let results = [
            (EXERCISES_KEY, self.write_slot(EXERCISES_KEY, exercises)),
            (SESSIONS_KEY, self.write_slot(SESSIONS_KEY, sessions)),
            (PLANS_KEY, self.write_slot(PLANS_KEY, plans)),
        ];

        let mut first_error = None;
        for (key, result) in results {
            if let Err(e) = result {
                tracing::warn!("Failed to write slot '{}': {}", key, e);
                if first_error.is_none() {
                    first_error = Some(Error::Persistence(format!("slot '{}': {}", key, e)));
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        tracing::debug!(
            "Saved snapshot: {} exercises, {} sessions, {} plans",
            exercises.len(),
            sessions.len(),
            plans.len()
        );
        Ok(())
    }

    fn load(&self) -> LoadedState {
        let (exercises, exercises_status) = self.read_slot(EXERCISES_KEY);
        let (sessions, sessions_status) = self.read_slot(SESSIONS_KEY);
        let (plans, plans_status) = self.read_slot(PLANS_KEY);

        LoadedState {
            snapshot: Snapshot {
                exercises,
                sessions,
                plans,
            },
            report: LoadReport {
                exercises: exercises_status,
                sessions: sessions_status,
                plans: plans_status,
            },
        }
    }
}
