//! Artifact resolution.
//!
//! Turns either the default download endpoint or a user supplied override into
//! a concrete [`ArtifactInfo`]: the final archive URL plus the version parsed
//! out of its file name.

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::is_valid_version;
use crate::platform::Platform;
use crate::{Error, Result};

/// Version assigned to override artifacts whose file name carries none.
pub const OVERRIDE_VERSION: &str = "override";

const USER_AGENT: &str = concat!("a11y-launcher/", env!("CARGO_PKG_VERSION"));
const HEAD_TIMEOUT: Duration = Duration::from_secs(30);
const GET_TIMEOUT: Duration = Duration::from_secs(60);

/// Archive suffixes stripped before looking for the version separator.
const ARCHIVE_SUFFIXES: &[&str] = &[
    ".tar.gz", ".tar.xz", ".tar.bz2", ".tgz", ".tar", ".zip", ".gz", ".exe",
];

/// A resolved artifact, ready to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    /// Version derived from the artifact file name.
    pub version: String,
    /// Final location of the archive (`http(s)` or `file`).
    pub resolved_url: Url,
    /// Expected name of the executable inside the version directory.
    pub executable_name: String,
}

impl ArtifactInfo {
    /// Local filesystem path when the artifact is a `file:` URL.
    #[must_use]
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.resolved_url.scheme() == "file" {
            self.resolved_url.to_file_path().ok()
        } else {
            None
        }
    }

    /// Last path segment of the resolved URL.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.resolved_url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
    }
}

/// Parse an override as a URL (`http`, `https`, `file`) or a filesystem path.
pub fn parse_override(input: &str) -> Result<Url> {
    let input = input.trim();
    if let Ok(url) = Url::parse(input)
        && matches!(url.scheme(), "http" | "https" | "file")
    {
        return Ok(url);
    }

    let path = std::path::absolute(Path::new(input))
        .map_err(|e| Error::io(e, input, "resolve path"))?;
    Url::from_file_path(&path).map_err(|()| Error::InvalidUrl {
        url: input.to_string(),
        message: "not an absolute path".to_string(),
    })
}

/// Extract the version from the last path segment of a URL.
///
/// `.../browserstack-cli-1.2.3.tar.gz` yields `1.2.3`; a name without a `-`
/// separator, or whose version could not name a cache directory (`..`,
/// hidden names, path separators), yields `None`.
#[must_use]
pub fn extract_version(url: &Url) -> Option<String> {
    let name = url.path_segments()?.next_back()?;
    let stem = strip_extension(name);
    let (_, version) = stem.rsplit_once('-')?;
    is_valid_version(version).then(|| version.to_string())
}

fn strip_extension(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    if let Some(suffix) = ARCHIVE_SUFFIXES.iter().find(|s| lower.ends_with(*s)) {
        return &name[..name.len() - suffix.len()];
    }
    // Only drop alphabetic extensions so a trailing ".3" of a version survives.
    match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphabetic()) => {
            stem
        }
        _ => name,
    }
}

/// Resolves download locations against the artifact server.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    client: Client,
    endpoint: String,
    platform: Platform,
}

impl ArtifactResolver {
    /// Create a resolver for the given endpoint and platform.
    pub fn new(endpoint: impl Into<String>, platform: Platform) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()
            .map_err(|e| Error::http(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            platform,
        })
    }

    /// The default download URL for the configured platform.
    pub fn default_url(&self) -> Result<Url> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("os", self.platform.os.as_str()),
                ("os_arch", self.platform.arch.as_str()),
            ],
        )
        .map_err(|e| Error::InvalidUrl {
            url: self.endpoint.clone(),
            message: e.to_string(),
        })
    }

    /// Resolve the artifact to download.
    ///
    /// Overrides never fail on a missing version; the default endpoint must
    /// yield one because the cache is keyed by it.
    pub async fn resolve(&self, override_url: Option<&Url>) -> Result<ArtifactInfo> {
        let executable_name = self.platform.executable_name().to_string();

        if let Some(url) = override_url {
            let resolved_url = if url.scheme() == "file" {
                url.clone()
            } else {
                self.follow_redirects(url).await?
            };
            let version =
                extract_version(&resolved_url).unwrap_or_else(|| OVERRIDE_VERSION.to_string());
            debug!(%resolved_url, %version, "Resolved override artifact");
            return Ok(ArtifactInfo {
                version,
                resolved_url,
                executable_name,
            });
        }

        let default_url = self.default_url()?;
        info!(platform = %self.platform, url = %default_url, "Resolving BrowserStack CLI");
        let resolved_url = self.follow_redirects(&default_url).await?;
        let version =
            extract_version(&resolved_url).ok_or_else(|| Error::VersionResolutionFailed {
                url: resolved_url.to_string(),
            })?;
        debug!(%resolved_url, %version, "Resolved artifact");

        Ok(ArtifactInfo {
            version,
            resolved_url,
            executable_name,
        })
    }

    /// Resolve a single redirect hop, probing with `HEAD` first.
    pub async fn follow_redirects(&self, url: &Url) -> Result<Url> {
        match self
            .client
            .head(url.clone())
            .timeout(HEAD_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => {
                if matches!(
                    response.status(),
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) {
                    debug!(%url, status = %response.status(), "HEAD rejected, retrying with GET");
                    return self.follow_with_get(url).await;
                }
                if let Some(location) = redirect_location(&response, url)? {
                    return Ok(location);
                }
                Ok(response.url().clone())
            }
            Err(e) if is_network_error(&e) => Err(Error::network_unavailable(
                url.as_str(),
                e.to_string(),
            )),
            Err(e) => {
                debug!(%url, error = %e, "HEAD failed, retrying with GET");
                self.follow_with_get(url).await
            }
        }
    }

    async fn follow_with_get(&self, url: &Url) -> Result<Url> {
        let response = self
            .client
            .get(url.clone())
            .timeout(GET_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if is_network_error(&e) {
                    Error::network_unavailable(url.as_str(), e.to_string())
                } else {
                    Error::RedirectResolutionFailed {
                        url: url.to_string(),
                    }
                }
            })?;

        if let Some(location) = redirect_location(&response, url)? {
            return Ok(location);
        }
        Ok(response.url().clone())
    }
}

fn redirect_location(response: &reqwest::Response, base: &Url) -> Result<Option<Url>> {
    let Some(value) = response.headers().get(LOCATION) else {
        return Ok(None);
    };
    let location = value
        .to_str()
        .ok()
        .and_then(|location| base.join(location).ok())
        .ok_or_else(|| Error::RedirectResolutionFailed {
            url: base.to_string(),
        })?;
    debug!(from = %base, to = %location, "Following redirect");
    Ok(Some(location))
}

fn is_network_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}
