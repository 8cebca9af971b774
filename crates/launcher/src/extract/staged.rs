//! Download-then-expand extraction for hosts without a universal archive tool.

use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use tracing::{info, warn};

use super::{ArchiveExtractor, Stage, download_to_file};
use crate::resolver::ArtifactInfo;
use crate::Result;

/// Temporary archive name inside the destination directory.
const ARCHIVE_NAME: &str = "browserstack-cli.zip";

/// Builds the command that expands `archive` into `dest`.
pub type ExpandCommand = fn(archive: &Path, dest: &Path) -> Stage;

/// `Expand-Archive` through PowerShell.
#[must_use]
pub fn powershell_expand(archive: &Path, dest: &Path) -> Stage {
    Stage::new("powershell")
        .arg("-NoProfile")
        .arg("-Command")
        .arg(format!(
            "Expand-Archive -LiteralPath \"{}\" -DestinationPath \"{}\" -Force",
            archive.display(),
            dest.display()
        ))
        .with_failure_message("Unable to extract BrowserStack CLI archive.")
}

/// Downloads the archive next to its destination and expands it there.
#[derive(Clone)]
pub struct StagedExtractor {
    client: Client,
    expand: ExpandCommand,
}

impl std::fmt::Debug for StagedExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedExtractor").finish_non_exhaustive()
    }
}

impl StagedExtractor {
    /// Create an extractor that expands with PowerShell.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_expander(client, powershell_expand)
    }

    /// Create an extractor with a custom expansion command.
    #[must_use]
    pub fn with_expander(client: Client, expand: ExpandCommand) -> Self {
        Self { client, expand }
    }
}

#[async_trait]
impl ArchiveExtractor for StagedExtractor {
    fn name(&self) -> &'static str {
        "staged"
    }

    async fn fetch_and_extract(&self, info: &ArtifactInfo, dest: &Path) -> Result<()> {
        let archive = dest.join(ARCHIVE_NAME);

        let result = async {
            download_to_file(&self.client, info, &archive).await?;
            info!(version = %info.version, "Extracting BrowserStack CLI");
            (self.expand)(&archive, dest).run().await
        }
        .await;

        if let Err(e) = tokio::fs::remove_file(&archive).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(?archive, error = %e, "Failed to remove downloaded archive");
        }
        result
    }
}
