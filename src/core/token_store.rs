//! # Token Store
//!
//! Durable home of the single auth token. The file store keeps it in a
//! secret entry named `token` under `~/.bookshelf/secure/`, readable only by
//! the owner. Writes use atomic rename (write `.tmp`, then `rename()`) so a
//! crash never leaves half a token behind.
//!
//! Nothing caches the token in memory: every request reads it fresh.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info};

/// Name of the persisted secret entry.
pub const TOKEN_ENTRY: &str = "token";

#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    /// The backing store cannot be used at all (no home directory, poisoned lock).
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "token storage I/O error: {e}"),
            StorageError::Unavailable(msg) => write!(f, "token storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Unavailable(_) => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(e)
    }
}

pub trait TokenStore: Send + Sync {
    fn get(&self) -> Result<Option<String>, StorageError>;
    fn set(&self, value: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Returns `~/.bookshelf/secure/token`.
pub fn default_token_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".bookshelf").join("secure").join(TOKEN_ENTRY))
}

pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, value: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)?;
        }
        atomic_write_secret(&self.path, value)?;
        info!("Token written to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Token removed from {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No token to remove at {}", self.path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Creates `dir` and any missing parents, owner-only on unix.
fn create_private_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

/// Atomically write `value` to `path` (via `.tmp` + rename). On unix the
/// `.tmp` file is created with mode 0600, so the secret is never readable
/// by anyone else, not even briefly.
fn atomic_write_secret(path: &Path, value: &str) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    // A leftover .tmp would keep its old mode through truncate.
    match fs::remove_file(&tmp_path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&tmp_path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Process-local store for tests and for hosts without a home directory.
#[derive(Default)]
pub struct MemoryTokenStore {
    value: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            value: Mutex::new(Some(token.to_string())),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, StorageError> {
        self.value
            .lock()
            .map_err(|_| StorageError::Unavailable("token lock poisoned".to_string()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<String>, StorageError> {
        Ok(self.slot()?.clone())
    }

    fn set(&self, value: &str) -> Result<(), StorageError> {
        *self.slot()? = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot()? = None;
        Ok(())
    }
}
