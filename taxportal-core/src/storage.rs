use anyhow::{Context, Result};
use fs2::FileExt;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of the storage file: key to JSON-encoded value
pub type KvDocument = BTreeMap<String, String>;

/// Error type for storage operations
#[derive(Debug)]
pub enum StorageError {
    /// File is locked by another process
    FileLocked,
    /// Other IO error
    IoError(std::io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::FileLocked => write!(f, "File is locked by another process"),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

/// Handles reading and writing the key-value document on disk, with file
/// locking so concurrent CLI invocations never interleave a write
pub struct Storage {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let mut lock_name = file_path.as_os_str().to_os_string();
        lock_name.push(".lock");
        Self {
            file_path,
            lock_file_path: PathBuf::from(lock_name),
        }
    }

    /// Returns the path to the storage file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Acquire an exclusive lock on the file for writing
    /// Returns the lock file handle which must be held during the operation
    fn acquire_write_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to create lock file: {:?}", self.lock_file_path))?;

        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(5);

        loop {
            match FileExt::try_lock_exclusive(&lock_file) {
                Ok(()) => return Ok(lock_file),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > timeout {
                        return Err(StorageError::FileLocked).with_context(|| {
                            format!("Timeout waiting for file lock: {:?}", self.file_path)
                        });
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    /// Acquire a shared lock on the file for reading
    fn acquire_read_lock(&self) -> Result<Option<File>> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_file_path))?;

        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(5);

        loop {
            match FileExt::try_lock_shared(&lock_file) {
                Ok(()) => return Ok(Some(lock_file)),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > timeout {
                        return Err(StorageError::FileLocked).with_context(|| {
                            format!("Timeout waiting for file lock: {:?}", self.file_path)
                        });
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    /// Reads and parses the document without taking a lock
    ///
    /// Returns `None` when the file exists but does not parse.
    fn read_unlocked(&self) -> Result<Option<KvDocument>> {
        if !self.file_path.exists() {
            return Ok(Some(KvDocument::new()));
        }

        let mut content = String::new();
        File::open(&self.file_path)
            .with_context(|| format!("Failed to open file: {:?}", self.file_path))?
            .read_to_string(&mut content)
            .map_err(StorageError::IoError)?;

        if content.trim().is_empty() {
            return Ok(Some(KvDocument::new()));
        }

        match serde_json::from_str(&content) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                warn!("Storage file {:?} does not parse: {}", self.file_path, e);
                Ok(None)
            }
        }
    }

    /// Reads the document; caller must hold the write lock
    ///
    /// An unparseable file is set aside and the document starts empty.
    fn read_for_write(&self) -> Result<KvDocument> {
        if let Some(doc) = self.read_unlocked()? {
            return Ok(doc);
        }

        let backup = self.corrupt_backup_path();
        warn!(
            "Discarding unparseable storage file {:?}; moved to {:?}",
            self.file_path, backup
        );
        fs::rename(&self.file_path, &backup)
            .with_context(|| format!("Failed to move corrupt file {:?} aside", self.file_path))?;
        Ok(KvDocument::new())
    }

    fn write_unlocked(&self, doc: &KvDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(&self.file_path, json)
            .with_context(|| format!("Failed to write {:?}", self.file_path))?;
        Ok(())
    }

    /// First free `<file>.corrupt`, `<file>.corrupt.1`, ... path
    fn corrupt_backup_path(&self) -> PathBuf {
        let mut base = self.file_path.as_os_str().to_os_string();
        base.push(".corrupt");

        let mut candidate = PathBuf::from(&base);
        let mut n = 1;
        while candidate.exists() {
            let mut name = base.clone();
            name.push(format!(".{}", n));
            candidate = PathBuf::from(name);
            n += 1;
        }
        candidate
    }

    /// Loads the key-value document with file locking
    ///
    /// A missing file is an empty document. A file that is not a JSON object
    /// of strings is renamed to `<file>.corrupt` under the write lock and
    /// treated as empty.
    pub fn load(&self) -> Result<KvDocument> {
        let parsed = {
            let _lock = self.acquire_read_lock()?;
            self.read_unlocked()?
        };

        let doc = match parsed {
            Some(doc) => doc,
            None => {
                let _lock = self.acquire_write_lock()?;
                self.read_for_write()?
            }
        };
        debug!("Loaded {} keys from {:?}", doc.len(), self.file_path);
        Ok(doc)
    }

    /// Saves the key-value document with file locking
    pub fn save(&self, doc: &KvDocument) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut lock_file = self.acquire_write_lock()?;

        // Lock holder info, for debugging stuck locks
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        self.write_unlocked(doc)?;
        debug!("Saved {} keys to {:?}", doc.len(), self.file_path);

        // Lock is automatically released when lock_file is dropped
        Ok(())
    }

    /// Perform an atomic read-modify-write with proper locking
    /// This reloads the file, applies changes, and saves under one exclusive lock
    pub fn update_atomically<F>(&self, update_fn: F) -> Result<KvDocument>
    where
        F: FnOnce(&mut KvDocument),
    {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut lock_file = self.acquire_write_lock()?;
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        let mut doc = self.read_for_write()?;
        update_fn(&mut doc);
        self.write_unlocked(&doc)?;

        Ok(doc)
    }
}
