//! JSON-file cache storage.

use core::future::{self, Future};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::http::{CacheKey, Response};
use super::store::{CacheStorage, Stores};
use crate::error::{Result, lock_poison_error, storage_io_error};

/// File holding every store.
const CACHE_FILE: &str = "caches.json";

/// Cache storage persisted to `<dir>/caches.json`.
///
/// Every mutation rewrites the file through a temporary file and a rename,
/// so readers never observe a partial write.
#[derive(Debug)]
pub struct FileCacheStorage {
    /// Path of `caches.json`.
    path: PathBuf,
    /// Serializes read-modify-write cycles within the process.
    lock: Mutex<()>,
}

impl FileCacheStorage {
    /// Creates a storage rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    #[inline]
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(storage_io_error)?;
        Ok(Self {
            path: dir.join(CACHE_FILE),
            lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current state; a missing file is an empty state.
    fn read(&self) -> Result<Stores> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Stores::default()),
            Err(err) => Err(storage_io_error(err)),
        }
    }

    /// Atomically replaces the file with `stores`.
    fn write(&self, stores: &Stores) -> Result<()> {
        let json = serde_json::to_string(stores)?;
        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        fs::write(&tmp_path, json).map_err(storage_io_error)?;
        fs::rename(&tmp_path, &self.path).map_err(storage_io_error)
    }

    /// Runs a read-only `op` against the current state.
    fn view<R, F: FnOnce(&Stores) -> R>(&self, op: F) -> Result<R> {
        let _guard = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        Ok(op(&self.read()?))
    }

    /// Runs `op` against the current state and writes the result back.
    fn update<R, F: FnOnce(&mut Stores) -> R>(&self, op: F) -> Result<R> {
        let _guard = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        let mut stores = self.read()?;
        let result = op(&mut stores);
        self.write(&stores)?;
        Ok(result)
    }
}

impl CacheStorage for FileCacheStorage {
    #[inline]
    fn open(&self, name: &str) -> impl Future<Output = Result<bool>> + Send {
        future::ready(self.update(|stores| stores.open(name)))
    }

    #[inline]
    fn keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send {
        future::ready(self.view(Stores::keys))
    }

    #[inline]
    fn delete(&self, name: &str) -> impl Future<Output = Result<bool>> + Send {
        future::ready(self.update(|stores| stores.delete(name)))
    }

    #[inline]
    fn match_request(
        &self,
        name: &str,
        key: &CacheKey,
    ) -> impl Future<Output = Result<Option<Response>>> + Send {
        future::ready(self.view(|stores| stores.lookup(name, key)))
    }

    #[inline]
    fn put(
        &self,
        name: &str,
        key: CacheKey,
        response: Response,
    ) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.update(|stores| stores.put(name, key, response)))
    }

    #[inline]
    fn put_all(
        &self,
        name: &str,
        entries: Vec<(CacheKey, Response)>,
    ) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.update(|stores| {
            for (key, response) in entries {
                stores.put(name, key, response);
            }
        }))
    }

    #[inline]
    fn requests(&self, name: &str) -> impl Future<Output = Result<Vec<CacheKey>>> + Send {
        future::ready(self.view(|stores| stores.requests(name)))
    }
}
