//! Archive retrieval and extraction.
//!
//! Three strategies implement [`ArchiveExtractor`]:
//! - [`StreamingExtractor`]: `curl | bsdtar`, nothing written to disk but the
//!   unpacked tree (POSIX hosts with both tools on `PATH`)
//! - [`StagedExtractor`]: download to a temporary archive, then expand it with
//!   an external utility (Windows, `Expand-Archive`)
//! - [`NativeExtractor`]: download, then unpack in-process with `tar`/`zip`
//!   (POSIX hosts missing the streaming tools)

mod native;
mod pipeline;
mod staged;
mod streaming;

pub use native::{ArchiveKind, NativeExtractor};
pub use pipeline::{Pipeline, Stage};
pub use staged::{ExpandCommand, StagedExtractor, powershell_expand};
pub use streaming::StreamingExtractor;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::platform::Platform;
use crate::resolver::ArtifactInfo;
use crate::{Error, Result};

const USER_AGENT: &str = concat!("a11y-launcher/", env!("CARGO_PKG_VERSION"));

/// Fetches an artifact and unpacks it into a directory.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// Fetch `info` and unpack it into `dest`, which already exists and is empty.
    async fn fetch_and_extract(&self, info: &ArtifactInfo, dest: &Path) -> Result<()>;
}

/// Pick the extraction strategy for a platform.
pub fn select_extractor(platform: Platform) -> Result<Box<dyn ArchiveExtractor>> {
    let extractor: Box<dyn ArchiveExtractor> = if !platform.os.is_posix() {
        Box::new(StagedExtractor::new(download_client()?))
    } else if StreamingExtractor::is_available() {
        Box::new(StreamingExtractor::default())
    } else {
        Box::new(NativeExtractor::new(download_client()?))
    };
    debug!(%platform, strategy = extractor.name(), "Selected archive extractor");
    Ok(extractor)
}

/// HTTP client used for archive downloads (follows redirects).
pub fn download_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::http(format!("Failed to create HTTP client: {e}")))
}

/// Copy a local artifact or stream a remote one into `dest`.
///
/// A non-2xx response is a hard failure.
pub async fn download_to_file(client: &Client, info: &ArtifactInfo, dest: &Path) -> Result<u64> {
    if let Some(source) = info.local_path() {
        debug!(?source, ?dest, "Copying local artifact");
        return tokio::fs::copy(&source, dest)
            .await
            .map_err(|e| Error::io(e, &source, "copy"));
    }

    let url = info.resolved_url.clone();
    info!(%url, version = %info.version, "Downloading BrowserStack CLI");
    let response = client.get(url.clone()).send().await.map_err(|e| {
        if e.is_connect() || e.is_timeout() {
            Error::network_unavailable(url.as_str(), e.to_string())
        } else {
            Error::http(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::http(format!("HTTP {}", status.as_u16())));
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| Error::io(e, dest, "create"))?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::http(format!("Failed to read response: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io(e, dest, "write"))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| Error::io(e, dest, "flush"))?;

    debug!(bytes = written, ?dest, "Download complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote_info(url: &str) -> ArtifactInfo {
        ArtifactInfo {
            version: "1.0.0".into(),
            resolved_url: reqwest::Url::parse(url).unwrap(),
            executable_name: "browserstack-cli".into(),
        }
    }

    #[test]
    fn test_select_windows_is_staged() {
        let extractor = select_extractor(Platform::new(Os::Windows, Arch::X64)).unwrap();
        assert_eq!(extractor.name(), "staged");
    }

    #[test]
    fn test_select_posix_streams_or_unpacks() {
        let extractor = select_extractor(Platform::new(Os::Linux, Arch::X64)).unwrap();
        assert!(matches!(extractor.name(), "streaming" | "native"));
    }

    #[tokio::test]
    async fn test_download_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/browserstack-cli-1.0.0.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"archive-bytes".to_vec()))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("cli.zip");
        let info = remote_info(&format!("{}/browserstack-cli-1.0.0.zip", server.uri()));

        let written = download_to_file(&download_client().unwrap(), &info, &dest)
            .await
            .unwrap();

        assert_eq!(written, 13);
        assert_eq!(std::fs::read(&dest).unwrap(), b"archive-bytes");
    }

    #[tokio::test]
    async fn test_download_non_success_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        let info = remote_info(&format!("{}/missing.zip", server.uri()));
        let err = download_to_file(&download_client().unwrap(), &info, &temp.path().join("x"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Http { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_download_local_copies() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("browserstack-cli-2.0.0.tar.gz");
        std::fs::write(&source, b"local").unwrap();
        let info = ArtifactInfo {
            version: "2.0.0".into(),
            resolved_url: reqwest::Url::from_file_path(&source).unwrap(),
            executable_name: "browserstack-cli".into(),
        };

        let dest = temp.path().join("copy");
        download_to_file(&download_client().unwrap(), &info, &dest)
            .await
            .unwrap();
        assert_eq!(std::fs::read(dest).unwrap(), b"local");
    }
}
