//! In-process archive extraction.
//!
//! Used on POSIX hosts that lack `curl` or `bsdtar`. Handles gzip-compressed
//! and plain tarballs, zip archives, and bare executables.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::Client;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info, warn};

use super::{ArchiveExtractor, download_to_file};
use crate::resolver::ArtifactInfo;
use crate::{Error, Result};

/// Archive formats understood by [`NativeExtractor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Gzip-compressed tarball.
    TarGz,
    /// Uncompressed tarball.
    Tar,
    /// Zip archive.
    Zip,
    /// Not an archive; the payload is the executable itself.
    Raw,
}

impl ArchiveKind {
    /// Guess the format from a file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Sniff the format from leading bytes.
    #[must_use]
    pub fn from_magic(header: &[u8]) -> Self {
        if header.starts_with(&[0x1f, 0x8b]) {
            Self::TarGz
        } else if header.starts_with(b"PK\x03\x04") {
            Self::Zip
        } else if header.get(257..262) == Some(b"ustar") {
            Self::Tar
        } else {
            Self::Raw
        }
    }

    /// Detect the format of `path`, preferring the original artifact name.
    pub fn detect(name: Option<&str>, path: &Path) -> Result<Self> {
        if let Some(kind) = name.and_then(Self::from_name) {
            return Ok(kind);
        }
        let mut header = Vec::with_capacity(512);
        File::open(path)
            .and_then(|f| f.take(512).read_to_end(&mut header))
            .map_err(|e| Error::io(e, path, "read"))?;
        Ok(Self::from_magic(&header))
    }
}

/// Downloads with reqwest and unpacks with the `tar`/`zip` crates.
#[derive(Debug, Clone)]
pub struct NativeExtractor {
    client: Client,
}

impl NativeExtractor {
    /// Create a native extractor.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArchiveExtractor for NativeExtractor {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn fetch_and_extract(&self, info: &ArtifactInfo, dest: &Path) -> Result<()> {
        let name = info.file_name().map(String::from);

        let (archive, downloaded) = if let Some(path) = info.local_path() {
            (path, false)
        } else {
            // Hidden, so the binary locator never mistakes a leftover for the payload.
            let path = dest.join(format!(
                ".download-{}",
                name.as_deref().unwrap_or("artifact")
            ));
            if let Err(e) = download_to_file(&self.client, info, &path).await {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }
            (path, true)
        };

        info!(version = %info.version, "Extracting BrowserStack CLI");
        let task_archive = archive.clone();
        let task_dest = dest.to_path_buf();
        let executable_name = info.executable_name.clone();
        let result = tokio::task::spawn_blocking(move || {
            let kind = ArchiveKind::detect(name.as_deref(), &task_archive)?;
            unpack(kind, &task_archive, &task_dest, &executable_name)
        })
        .await
        .map_err(|e| Error::extraction_failed(format!("Extraction task failed: {e}")))
        .and_then(|inner| inner);

        if downloaded && let Err(e) = tokio::fs::remove_file(&archive).await {
            warn!(?archive, error = %e, "Failed to remove downloaded archive");
        }
        result
    }
}

/// Unpack `archive` of the given kind into `dest`.
pub fn unpack(kind: ArchiveKind, archive: &Path, dest: &Path, executable_name: &str) -> Result<()> {
    debug!(?kind, ?archive, ?dest, "Unpacking archive");
    let file = File::open(archive).map_err(|e| Error::io(e, archive, "open"))?;
    match kind {
        ArchiveKind::TarGz => unpack_tar(GzDecoder::new(file), dest),
        ArchiveKind::Tar => unpack_tar(file, dest),
        ArchiveKind::Zip => unpack_zip(file, dest),
        ArchiveKind::Raw => {
            let target = dest.join(executable_name);
            std::fs::copy(archive, &target).map_err(|e| Error::io(e, archive, "copy"))?;
            Ok(())
        }
    }
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive
        .unpack(dest)
        .map_err(|e| Error::extraction_failed(format!("Failed to extract tar: {e}")))
}

fn unpack_zip(file: File, dest: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::extraction_failed(format!("Failed to open zip: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::extraction_failed(format!("Failed to read zip entry: {e}")))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!(name = entry.name(), "Skipping zip entry with unsafe path");
            continue;
        };
        let outpath: PathBuf = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| Error::io(e, &outpath, "create"))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create"))?;
        }
        let mut out = File::create(&outpath).map_err(|e| Error::io(e, &outpath, "create"))?;
        io::copy(&mut entry, &mut out).map_err(|e| Error::io(e, &outpath, "write"))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))
                .map_err(|e| Error::io(e, &outpath, "chmod"))?;
        }
    }

    Ok(())
}
