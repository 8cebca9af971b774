//! Launcher configuration.
//!
//! All environment-derived settings are read once into [`LauncherConfig`] and
//! passed down explicitly. Cache root resolution order:
//!
//! 1. `BROWSERSTACK_A11Y_CLI_CACHE_DIR` (used as the root itself)
//! 2. `$XDG_CACHE_HOME/browserstack/a11y-cli`
//! 3. `$HOME/.cache/browserstack/a11y-cli`
//! 4. home directory reported by the OS + `/.cache/browserstack/a11y-cli`
//! 5. platform cache directory + `/browserstack/a11y-cli`

use std::path::PathBuf;

/// Forces a fresh download when truthy.
pub const ENV_FORCE_DOWNLOAD: &str = "BROWSERSTACK_A11Y_CLI_FORCE_DOWNLOAD";
/// Overrides the download location (URL or local path).
pub const ENV_DOWNLOAD_URL: &str = "BROWSERSTACK_A11Y_CLI_DOWNLOAD_URL";
/// Overrides the cache root.
pub const ENV_CACHE_DIR: &str = "BROWSERSTACK_A11Y_CLI_CACHE_DIR";

/// Default endpoint that redirects to the platform-specific archive.
pub const DEFAULT_ENDPOINT: &str = "https://api.browserstack.com/sdk/v1/download_cli";

/// Namespace below the cache base directory.
const CACHE_NAMESPACE: [&str; 2] = ["browserstack", "a11y-cli"];

/// Immutable launcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Directory holding one subdirectory per CLI version.
    pub cache_root: PathBuf,
    /// Bypass the cache even if a ready executable exists.
    pub force_download: bool,
    /// Explicit download URL or local path.
    pub download_url: Option<String>,
    /// Endpoint used when no override is configured.
    pub endpoint: String,
}

impl LauncherConfig {
    /// Build configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cache_root = get(ENV_CACHE_DIR).map_or_else(
            || {
                let base = get("XDG_CACHE_HOME")
                    .map(PathBuf::from)
                    .or_else(|| get("HOME").map(|home| PathBuf::from(home).join(".cache")))
                    .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
                    .or_else(dirs::cache_dir)
                    .unwrap_or_else(|| PathBuf::from(".cache"));
                CACHE_NAMESPACE
                    .iter()
                    .fold(base, |path, segment| path.join(segment))
            },
            PathBuf::from,
        );

        Self {
            cache_root,
            force_download: is_truthy(lookup(ENV_FORCE_DOWNLOAD).as_deref()),
            download_url: get(ENV_DOWNLOAD_URL).map(|v| v.trim().to_string()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Force a download regardless of cache state.
    #[must_use]
    pub fn with_force_download(mut self, force: bool) -> Self {
        self.force_download = self.force_download || force;
        self
    }

    /// Use an explicit download URL, taking precedence over the environment.
    #[must_use]
    pub fn with_download_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.download_url = Some(url);
        }
        self
    }

    /// Set the cache root.
    #[must_use]
    pub fn with_cache_root(mut self, root: PathBuf) -> Self {
        self.cache_root = root;
        self
    }

    /// Set the default endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Interpret `"1"`, `"true"` and `"yes"` (any case, surrounding whitespace ignored) as true.
#[must_use]
pub fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
}
