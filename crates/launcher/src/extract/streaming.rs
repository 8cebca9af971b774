//! `curl | bsdtar` extraction for POSIX hosts.

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{ArchiveExtractor, Pipeline, Stage};
use crate::permissions::is_executable;
use crate::resolver::ArtifactInfo;
use crate::{Error, Result};

const BSDTAR_FAILURE: &str = "bsdtar failed to extract BrowserStack CLI.";

/// Streams the archive from the network straight into `bsdtar`.
#[derive(Debug, Clone)]
pub struct StreamingExtractor {
    fetch_program: String,
    extract_program: String,
}

impl Default for StreamingExtractor {
    fn default() -> Self {
        Self::new("curl", "bsdtar")
    }
}

impl StreamingExtractor {
    /// Create an extractor with explicit fetch and extract programs.
    #[must_use]
    pub fn new(fetch_program: impl Into<String>, extract_program: impl Into<String>) -> Self {
        Self {
            fetch_program: fetch_program.into(),
            extract_program: extract_program.into(),
        }
    }

    /// Whether `curl` and `bsdtar` are both on `PATH`.
    #[must_use]
    pub fn is_available() -> bool {
        which::which("curl").is_ok() && which::which("bsdtar").is_ok()
    }

    fn fetch_stage(&self, url: &str) -> Stage {
        Stage::new(&self.fetch_program).arg("-fsSL").arg(url)
    }

    fn extract_stage(&self, source: &Path, dest: &Path) -> Stage {
        Stage::new(&self.extract_program)
            .arg("-xpf")
            .arg(source)
            .arg("-C")
            .arg(dest)
            .with_failure_message(BSDTAR_FAILURE)
    }

    async fn extract_local(&self, source: &Path, dest: &Path) -> Result<()> {
        match self.extract_stage(source, dest).run().await {
            Ok(()) => Ok(()),
            Err(e) if is_executable(source) => {
                // Not an archive: the override points straight at a binary.
                debug!(?source, error = %e, "Extraction failed, copying executable as-is");
                let file_name = source.file_name().ok_or_else(|| {
                    Error::extraction_failed(format!("{} has no file name", source.display()))
                })?;
                let target = dest.join(file_name);
                if tokio::fs::symlink_metadata(&target).await.is_ok() {
                    tokio::fs::remove_file(&target)
                        .await
                        .map_err(|e| Error::io(e, &target, "remove"))?;
                }
                tokio::fs::copy(source, &target)
                    .await
                    .map_err(|e| Error::io(e, source, "copy"))?;
                Ok(())
            }
            Err(e) => {
                warn!(?source, "Local artifact is neither an archive nor an executable");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ArchiveExtractor for StreamingExtractor {
    fn name(&self) -> &'static str {
        "streaming"
    }

    async fn fetch_and_extract(&self, info: &ArtifactInfo, dest: &Path) -> Result<()> {
        if let Some(source) = info.local_path() {
            info!(?source, version = %info.version, "Extracting local BrowserStack CLI archive");
            return self.extract_local(&source, dest).await;
        }

        info!(url = %info.resolved_url, version = %info.version, "Downloading BrowserStack CLI");
        Pipeline::new(
            self.fetch_stage(info.resolved_url.as_str()),
            self.extract_stage(Path::new("-"), dest),
        )
        .run()
        .await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::permissions::ensure_executable;
    use reqwest::Url;
    use std::fs;
    use tempfile::TempDir;

    fn local_info(path: &Path) -> ArtifactInfo {
        ArtifactInfo {
            version: "override".into(),
            resolved_url: Url::from_file_path(path).unwrap(),
            executable_name: "browserstack-cli".into(),
        }
    }

    /// Stand-in for bsdtar that always rejects its input.
    fn failing_extractor() -> StreamingExtractor {
        StreamingExtractor::new("curl", "false")
    }

    #[tokio::test]
    async fn test_local_executable_fallback() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("browserstack-cli");
        fs::write(&source, "#!/bin/sh\necho hi\n").unwrap();
        ensure_executable(&source).unwrap();
        let dest = temp.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        failing_extractor()
            .fetch_and_extract(&local_info(&source), &dest)
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("browserstack-cli")).unwrap(),
            "#!/bin/sh\necho hi\n"
        );
    }

    #[tokio::test]
    async fn test_local_non_executable_failure_is_forwarded() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("corrupt.tar.gz");
        fs::write(&source, b"garbage").unwrap();
        let dest = temp.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        let err = failing_extractor()
            .fetch_and_extract(&local_info(&source), &dest)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), BSDTAR_FAILURE);
    }

    #[tokio::test]
    async fn test_local_tar_with_system_tar() {
        if which::which("tar").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("browserstack-cli-5.0.0.tar");
        {
            let file = fs::File::create(&source).unwrap();
            let mut builder = tar::Builder::new(file);
            let mut header = tar::Header::new_gnu();
            header.set_path("pkg/browserstack-cli").unwrap();
            header.set_size(4);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append(&header, &b"bin!"[..]).unwrap();
            builder.finish().unwrap();
        }
        let dest = temp.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        StreamingExtractor::new("curl", "tar")
            .fetch_and_extract(&local_info(&source), &dest)
            .await
            .unwrap();

        assert_eq!(
            fs::read(dest.join("pkg/browserstack-cli")).unwrap(),
            b"bin!"
        );
    }
}
