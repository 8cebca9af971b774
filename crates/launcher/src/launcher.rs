//! Orchestration: resolve, cache, fetch, locate, run.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::config::LauncherConfig;
use crate::extract::{ArchiveExtractor, select_extractor};
use crate::locate::locate;
use crate::permissions::ensure_executable;
use crate::platform::{Platform, current_platform};
use crate::resolver::{ArtifactInfo, ArtifactResolver, parse_override};
use crate::runner;
use crate::Result;

/// Subcommand of the BrowserStack CLI that runs the accessibility linter.
pub const A11Y_SUBCOMMAND: &str = "a11y";

/// A cached, runnable CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedArtifact {
    /// Version the executable was cached under.
    pub version: String,
    /// Absolute path to the executable.
    pub executable: PathBuf,
}

/// Ties configuration, cache and extraction together for one invocation.
pub struct Launcher {
    config: LauncherConfig,
    platform: Platform,
    cache: CacheStore,
    resolver: ArtifactResolver,
    extractor: Box<dyn ArchiveExtractor>,
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("config", &self.config)
            .field("platform", &self.platform)
            .field("extractor", &self.extractor.name())
            .finish_non_exhaustive()
    }
}

impl Launcher {
    /// Create a launcher for the host platform.
    pub fn new(config: LauncherConfig) -> Result<Self> {
        let platform = current_platform()?;
        let extractor = select_extractor(platform)?;
        Self::with_extractor(config, platform, extractor)
    }

    /// Create a launcher with an explicit platform and extraction strategy.
    pub fn with_extractor(
        config: LauncherConfig,
        platform: Platform,
        extractor: Box<dyn ArchiveExtractor>,
    ) -> Result<Self> {
        let resolver = ArtifactResolver::new(config.endpoint.clone(), platform)?;
        let cache = CacheStore::new(config.cache_root.clone());
        Ok(Self {
            config,
            platform,
            cache,
            resolver,
            extractor,
        })
    }

    /// The platform this launcher targets.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Make sure the CLI is cached and return where it lives.
    ///
    /// The cache root is checked for writability before any network traffic.
    pub async fn ensure_artifact(&self) -> Result<PreparedArtifact> {
        self.cache.locate_cache_root()?;

        let override_url = self
            .config
            .download_url
            .as_deref()
            .map(parse_override)
            .transpose()?;
        let info = self.resolver.resolve(override_url.as_ref()).await?;

        if self.config.force_download {
            info!(version = %info.version, "Forcing fresh download of BrowserStack CLI");
        } else if let Some(executable) = self
            .cache
            .ready_executable(&info.version, &info.executable_name)
        {
            debug!(version = %info.version, ?executable, "Using cached CLI");
            return Ok(PreparedArtifact {
                version: info.version,
                executable,
            });
        }

        let executable = self.install(&info).await?;
        Ok(PreparedArtifact {
            version: info.version,
            executable,
        })
    }

    async fn install(&self, info: &ArtifactInfo) -> Result<PathBuf> {
        let staging = self.cache.begin_refresh(&info.version)?;
        debug!(strategy = self.extractor.name(), ?staging, "Populating cache");

        self.extractor.fetch_and_extract(info, &staging).await?;
        let located = locate(&staging, &info.executable_name)?;
        ensure_executable(&located)?;

        let version_dir = self.cache.finalize(&info.version, &info.executable_name)?;
        Ok(version_dir.join(&info.executable_name))
    }

    /// Prepare the CLI and run its `a11y` subcommand with `args`.
    ///
    /// Returns the CLI's exit code.
    pub async fn run<I, S>(&self, args: I, working_dir: &Path) -> Result<i32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let artifact = self.ensure_artifact().await?;
        info!(
            "Using CLI {} at {}",
            artifact.version,
            artifact.executable.display()
        );

        let argv = std::iter::once(OsStr::new(A11Y_SUBCOMMAND).to_os_string())
            .chain(args.into_iter().map(|a| a.as_ref().to_os_string()));
        runner::invoke(&artifact.executable, argv, working_dir).await
    }
}
