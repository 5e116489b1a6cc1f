//! JSON-file-based key-value backend.
//!
//! Stores each key in its own file under a configurable directory
//! (default: `$XDG_DATA_HOME/forex-ledger/`).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{ForexError, Result, lock_poison_error, storage_io_error};

/// Application name used for the XDG data directory.
const APP_NAME: &str = "forex-ledger";

/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "storage.lock";

/// File-backed key-value store.
///
/// Each key maps to `<dir>/<key>.json`. Writes go to a temporary file that
/// is renamed over the target, so a crash never leaves a half-written
/// payload behind.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `storage.lock`. Reads take a shared lock and writes an exclusive one.
#[derive(Debug)]
pub struct FileStore {
    /// Root directory containing all payload files.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileStore {
    /// Creates a new file store rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist, and opens
    /// (or creates) the `storage.lock` sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the default XDG-compliant data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/forex-ledger/` (typically
    /// `~/.local/share/forex-ledger/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                ForexError::Storage("could not determine platform data directory".into())
            })
    }

    /// Directory holding the payload files.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the payload path for `key`.
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced so a key can never
    /// escape the storage directory.
    fn path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    /// Acquires the in-process guard and a shared file lock around `op`.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // Only surface the unlock error when the operation succeeded;
        // otherwise the original error is more useful.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires the in-process guard and an exclusive file lock around `op`.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }
}

impl super::KeyValueStore for FileStore {
    #[inline]
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        self.with_shared_lock(|| match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_io_error(err)),
        })
    }

    #[inline]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key);
        let mut tmp_path = path.clone().into_os_string();
        tmp_path.push(".tmp");
        self.with_exclusive_lock(|| {
            fs::write(&tmp_path, value).map_err(storage_io_error)?;
            fs::rename(&tmp_path, &path).map_err(storage_io_error)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, PersistenceGateway, STORAGE_KEY};

    /// Helper to create a [`FileStore`] in a temporary directory.
    fn temp_store() -> (FileStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        (store, dir)
    }

    #[test]
    fn missing_key_is_none() {
        let (store, _dir) = temp_store();
        assert!(store.get(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn set_and_get_roundtrip() {
        let (store, dir) = temp_store();
        store.set(STORAGE_KEY, "[]").unwrap();
        assert_eq!(store.get(STORAGE_KEY).unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("currencyTransactions.json").exists());
        assert!(!dir.path().join("currencyTransactions.json.tmp").exists());
    }

    #[test]
    fn keys_cannot_escape_directory() {
        let (store, dir) = temp_store();
        store.set("../evil", "x").unwrap();
        assert!(dir.path().join("___evil.json").exists());
        assert_eq!(store.get("../evil").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::new(nested.clone()).unwrap();
        assert_eq!(store.dir(), nested.as_path());
        assert!(nested.join(LOCK_FILE).exists());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::new(dir.path().to_path_buf()).unwrap();
            store.set(STORAGE_KEY, r#"["kept"]"#).unwrap();
        }
        let reopened = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            reopened.get(STORAGE_KEY).unwrap().as_deref(),
            Some(r#"["kept"]"#)
        );
    }

    #[test]
    fn gateway_over_file_store_loads_legacy_payload() {
        let (store, _dir) = temp_store();
        let legacy = r#"[{"id":"1716200000123","date":"2024-05-20","type":"Beli",
            "foreignCurrencyCode":"USD","denomination":100,"notesCount":5,
            "exchangeRateToIDR":15000,"effectiveCurrencyFrom":"IDR",
            "effectiveAmountFrom":7500000,"effectiveCurrencyTo":"USD",
            "effectiveAmountTo":500,"notes":"airport"}]"#;
        store.set(STORAGE_KEY, legacy).unwrap();
        let gateway = PersistenceGateway::new(store);
        let loaded = gateway.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.first().unwrap().notes(), Some("airport"));
    }
}
