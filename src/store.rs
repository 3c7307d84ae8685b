//! Key/value persistence for session artifacts.
//!
//! [`KeyValueStore`] is the single seam every read and write of session data
//! goes through. [`MemoryStore`] serves tests and short-lived processes;
//! [`FileStore`] keeps the session across restarts in one JSON file.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Error;

/// Default session file name.
const SESSION_FILE_NAME: &str = "session.json";

/// Keys the session layer is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    User,
    AccessToken,
    RefreshToken,
    PendingTenantCandidates,
    /// Job a job seeker was applying to before being sent to log in.
    ReturnToJob,
}

impl StoreKey {
    /// Keys that make up a session; cleared together on logout.
    pub const SESSION_KEYS: [Self; 4] = [
        Self::User,
        Self::AccessToken,
        Self::RefreshToken,
        Self::PendingTenantCandidates,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
            Self::PendingTenantCandidates => "pendingTenantCandidates",
            Self::ReturnToJob => "returnToJob",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumer-replaceable session persistence.
///
/// Writes must be visible to subsequent reads in the same process. No
/// atomicity across keys is expected.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: StoreKey) -> Result<Option<String>, Error>;

    fn put(&self, key: StoreKey, value: &str) -> Result<(), Error>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: StoreKey) -> Result<(), Error>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: StoreKey) -> Result<Option<String>, Error> {
        (**self).get(key)
    }

    fn put(&self, key: StoreKey, value: &str) -> Result<(), Error> {
        (**self).put(key, value)
    }

    fn remove(&self, key: StoreKey) -> Result<(), Error> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: StoreKey) -> Result<Option<String>, Error> {
        (**self).get(key)
    }

    fn put(&self, key: StoreKey, value: &str) -> Result<(), Error> {
        (**self).put(key, value)
    }

    fn remove(&self, key: StoreKey) -> Result<(), Error> {
        (**self).remove(key)
    }
}

/// In-process store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an entry (e.g. to simulate state left by an earlier run).
    #[must_use]
    pub fn with_entry(self, key: StoreKey, value: impl Into<String>) -> Self {
        self.entries.lock().insert(key, value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: StoreKey) -> bool {
        self.entries.lock().contains_key(&key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, Error> {
        Ok(self.entries.lock().get(&key).cloned())
    }

    fn put(&self, key: StoreKey, value: &str) -> Result<(), Error> {
        self.entries.lock().insert(key, value.to_owned());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), Error> {
        self.entries.lock().remove(&key);
        Ok(())
    }
}

/// Store persisted as a single JSON object file with owner-only permissions.
///
/// Every operation re-reads the file, so edits made by another process are
/// picked up; the last writer wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at `session.json` under the given data directory.
    #[must_use]
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(SESSION_FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unreadable or malformed files read as empty.
    fn load(&self) -> BTreeMap<String, String> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "failed to read session file: {e}");
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&data).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), "failed to parse session file: {e}");
            BTreeMap::new()
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Io(e)),
            };
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(entries)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // `mode` only applies on creation; tighten files left by older runs.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, Error> {
        let _guard = self.lock.lock();
        Ok(self.load().remove(key.as_str()))
    }

    fn put(&self, key: StoreKey, value: &str) -> Result<(), Error> {
        let _guard = self.lock.lock();
        let mut entries = self.load();
        entries.insert(key.as_str().to_owned(), value.to_owned());
        self.save(&entries)
    }

    fn remove(&self, key: StoreKey) -> Result<(), Error> {
        let _guard = self.lock.lock();
        let mut entries = self.load();
        if entries.remove(key.as_str()).is_none() {
            return Ok(());
        }
        self.save(&entries)
    }
}
