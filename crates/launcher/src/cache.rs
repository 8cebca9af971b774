//! Version-addressed cache for the BrowserStack CLI.
//!
//! Structure:
//! ```text
//! <cache root>/
//! ├── 1.2.3/
//! │   ├── browserstack-cli            # ready-to-run executable
//! │   ├── .browserstack-cli.sha256    # digest recorded at placement
//! │   └── ...                         # other extracted files
//! └── .1.3.0.partial/                 # staging area of an in-flight refresh
//! ```
//!
//! A version directory is only ever created by renaming a fully populated
//! staging directory, so an interrupted refresh leaves nothing under the
//! final name.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::permissions::is_executable;
use crate::{Error, Result};

/// Cache of extracted CLI versions.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a cache at the specified root directory.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the cache root and verify it accepts writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheUnwritable`] if the directory cannot be created
    /// or a scratch file cannot be written into it.
    pub fn locate_cache_root(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).map_err(|e| Error::cache_unwritable(&self.root, e))?;

        let scratch = self
            .root
            .join(format!(".write-check-{}", uuid::Uuid::new_v4()));
        fs::write(&scratch, b"ok").map_err(|e| Error::cache_unwritable(&self.root, e))?;
        if let Err(e) = fs::remove_file(&scratch) {
            warn!(?scratch, error = %e, "Failed to remove cache write check file");
        }

        trace!(root = ?self.root, "Cache root is writable");
        Ok(self.root.clone())
    }

    /// Directory holding a given version.
    #[must_use]
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.root.join(version)
    }

    /// Staging directory used while a version is being populated.
    #[must_use]
    pub fn staging_dir(&self, version: &str) -> PathBuf {
        self.root.join(format!(".{version}.partial"))
    }

    /// Expected executable path for a version.
    #[must_use]
    pub fn executable_path(&self, version: &str, executable_name: &str) -> PathBuf {
        self.version_dir(version).join(executable_name)
    }

    /// Whether a version already holds a runnable executable.
    ///
    /// A recorded digest that no longer matches the executable counts as a miss.
    #[must_use]
    pub fn has_ready_executable(&self, version: &str, executable_name: &str) -> bool {
        self.ready_executable(version, executable_name).is_some()
    }

    /// The cached executable for a version, if it is ready to run.
    #[must_use]
    pub fn ready_executable(&self, version: &str, executable_name: &str) -> Option<PathBuf> {
        if !is_valid_version(version) {
            return None;
        }
        let path = self.executable_path(version, executable_name);
        if !is_executable(&path) {
            trace!(version, ?path, "Cache miss");
            return None;
        }

        let marker = digest_marker(&self.version_dir(version), executable_name);
        match fs::read_to_string(&marker) {
            Ok(recorded) => match file_sha256(&path) {
                Ok(actual) if actual == recorded.trim() => {}
                Ok(actual) => {
                    warn!(version, expected = %recorded.trim(), %actual, "Cached CLI digest mismatch");
                    return None;
                }
                Err(e) => {
                    warn!(version, error = %e, "Unable to hash cached CLI");
                    return None;
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(version, "No digest recorded for cached CLI");
            }
            Err(e) => {
                warn!(version, error = %e, "Unable to read digest marker");
                return None;
            }
        }

        trace!(version, ?path, "Cache hit");
        Some(path)
    }

    /// Drop any existing content for a version and return a fresh staging directory.
    ///
    /// Idempotent: both the final version directory and leftovers of an
    /// interrupted refresh are removed before the staging directory is created.
    pub fn begin_refresh(&self, version: &str) -> Result<PathBuf> {
        check_version(version)?;
        let version_dir = self.version_dir(version);
        remove_path(&version_dir)?;

        let staging = self.staging_dir(version);
        remove_path(&staging)?;
        fs::create_dir_all(&staging).map_err(|e| Error::io(e, &staging, "create"))?;

        debug!(version, ?staging, "Started cache refresh");
        Ok(staging)
    }

    /// Record the executable digest and move the staging directory into place.
    pub fn finalize(&self, version: &str, executable_name: &str) -> Result<PathBuf> {
        check_version(version)?;
        let staging = self.staging_dir(version);
        let executable = staging.join(executable_name);

        let digest = file_sha256(&executable)?;
        let marker = digest_marker(&staging, executable_name);
        fs::write(&marker, format!("{digest}\n")).map_err(|e| Error::io(e, &marker, "write"))?;

        let version_dir = self.version_dir(version);
        remove_path(&version_dir)?;
        fs::rename(&staging, &version_dir).map_err(|e| Error::io(e, &staging, "rename"))?;

        debug!(version, ?version_dir, sha256 = %digest, "Stored CLI in cache");
        Ok(version_dir)
    }
}

/// Whether `version` names exactly one non-hidden directory below the cache root.
#[must_use]
pub fn is_valid_version(version: &str) -> bool {
    !version.is_empty()
        && !version.starts_with('.')
        && !version.contains(['/', '\\', '\0', ':'])
}

fn check_version(version: &str) -> Result<()> {
    if is_valid_version(version) {
        Ok(())
    } else {
        Err(Error::InvalidVersion {
            version: version.to_string(),
        })
    }
}

fn digest_marker(dir: &Path, executable_name: &str) -> PathBuf {
    dir.join(format!(".{executable_name}.sha256"))
}

fn remove_path(path: &Path) -> Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|e| Error::io(e, path, "remove"))
}

/// Compute the SHA256 hash of a file as lowercase hex.
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(|e| Error::io(e, path, "open"))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .map_err(|e| Error::io(e, path, "read"))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
