//! Error types for the launcher.

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Result type for launcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code used when the cache directory cannot be written.
pub const EXIT_CACHE_UNWRITABLE: i32 = 2;

/// Exit code used for every failure without a more specific code.
pub const EXIT_FAILURE: i32 = 1;

/// Errors that can occur while resolving, fetching or running the CLI.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The operating system is not one the artifact server publishes builds for.
    #[error("Unsupported operating system '{os}' for BrowserStack CLI")]
    #[diagnostic(code(a11y_launcher::platform::os))]
    UnsupportedPlatform {
        /// Raw OS family reported by the host.
        os: String,
    },

    /// The CPU architecture is not recognised.
    #[error("Unsupported architecture '{machine}' for BrowserStack CLI")]
    #[diagnostic(code(a11y_launcher::platform::arch))]
    UnsupportedArchitecture {
        /// Raw hardware identifier reported by the host.
        machine: String,
    },

    /// The artifact server could not be reached.
    #[error("Network connection failed for {url}: {message}")]
    #[diagnostic(
        code(a11y_launcher::resolve::network),
        help("Allow network connections for this command and check connectivity")
    )]
    NetworkUnavailable {
        /// URL that was being contacted.
        url: String,
        /// Transport error message.
        message: String,
    },

    /// The final artifact location could not be determined.
    #[error("Failed to resolve redirect for {url}")]
    #[diagnostic(code(a11y_launcher::resolve::redirect))]
    RedirectResolutionFailed {
        /// URL whose redirect could not be resolved.
        url: String,
    },

    /// No version could be derived from the resolved artifact URL.
    #[error("Unable to determine BrowserStack CLI version from {url}")]
    #[diagnostic(code(a11y_launcher::resolve::version))]
    VersionResolutionFailed {
        /// The resolved URL.
        url: String,
    },

    /// An override or constructed URL is malformed.
    #[error("Invalid download URL '{url}': {message}")]
    #[diagnostic(code(a11y_launcher::resolve::url))]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// Parser message.
        message: String,
    },

    /// A version string that cannot name a directory inside the cache root.
    #[error("Refusing to use '{version}' as a BrowserStack CLI cache version")]
    #[diagnostic(code(a11y_launcher::cache::version))]
    InvalidVersion {
        /// The rejected version.
        version: String,
    },

    /// The cache root cannot be created or written.
    #[error("Unable to access cache directory {}", path.display())]
    #[diagnostic(
        code(a11y_launcher::cache::unwritable),
        help("Please add \"--allow-writing-to-directory ~/.cache/\" directive where you are invoking the launcher")
    )]
    CacheUnwritable {
        /// The cache root.
        path: Box<Path>,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The archive could not be unpacked.
    #[error("Failed to extract BrowserStack CLI: {message}")]
    #[diagnostic(code(a11y_launcher::extract::failed))]
    ExtractionFailed {
        /// Error message.
        message: String,
    },

    /// The unpacked tree does not contain any usable file.
    #[error("Extracted archive at {} does not contain a binary payload", dir.display())]
    #[diagnostic(code(a11y_launcher::locate::none))]
    NoBinaryFound {
        /// Directory that was searched.
        dir: Box<Path>,
    },

    /// A child process was killed by a signal or crashed.
    #[error("{program} terminated abnormally")]
    #[diagnostic(code(a11y_launcher::process::abnormal))]
    AbnormalTermination {
        /// Name of the program.
        program: String,
    },

    /// A helper process (download, extraction) or the CLI exited non-zero.
    #[error("{message}")]
    #[diagnostic(code(a11y_launcher::process::exit))]
    Subprocess {
        /// Stage that failed (e.g. "curl", "bsdtar").
        stage: String,
        /// Exit code reported by the process.
        code: i32,
        /// Captured diagnostic text.
        message: String,
    },

    /// HTTP transport error while downloading.
    #[error("Failed to download BrowserStack CLI: {message}")]
    #[diagnostic(code(a11y_launcher::http))]
    Http {
        /// Error message.
        message: String,
    },

    /// I/O error during cache or process operations.
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(a11y_launcher::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "rename", "spawn")
        operation: String,
    },
}

impl Error {
    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context.
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a cache-unwritable error.
    #[must_use]
    pub fn cache_unwritable(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::CacheUnwritable {
            path: path.as_ref().into(),
            source,
        }
    }

    /// Create an extraction failed error.
    #[must_use]
    pub fn extraction_failed(message: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            message: message.into(),
        }
    }

    /// Create a non-zero exit error for a process stage.
    #[must_use]
    pub fn subprocess(stage: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self::Subprocess {
            stage: stage.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a network-unavailable error.
    #[must_use]
    pub fn network_unavailable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP download error.
    #[must_use]
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Exit code the launcher should terminate with for this error.
    ///
    /// Subprocess failures forward the child's code verbatim; cache permission
    /// problems use [`EXIT_CACHE_UNWRITABLE`].
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::CacheUnwritable { .. } => EXIT_CACHE_UNWRITABLE,
            Self::Subprocess { code, .. } if *code != 0 => *code,
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_cache_unwritable() {
        let err = Error::cache_unwritable(
            "/nope",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("/nope"));
    }

    #[test]
    fn test_exit_code_forwards_subprocess() {
        let err = Error::subprocess("curl", 22, "The requested URL returned error: 404");
        assert_eq!(err.exit_code(), 22);
        assert_eq!(err.to_string(), "The requested URL returned error: 404");
    }

    #[test]
    fn test_exit_code_zero_subprocess_falls_back() {
        let err = Error::subprocess("bsdtar", 0, "odd");
        assert_eq!(err.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_exit_code_default() {
        let err = Error::VersionResolutionFailed {
            url: "https://example.com/cli".into(),
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("https://example.com/cli"));
    }

    #[test]
    fn test_io_error_display() {
        let err = Error::io(
            std::io::Error::from(std::io::ErrorKind::NotFound),
            "/tmp/x",
            "read",
        );
        assert_eq!(err.to_string(), "I/O read failed: /tmp/x");

        let err = Error::io_no_path(std::io::Error::from(std::io::ErrorKind::NotFound), "spawn");
        assert_eq!(err.to_string(), "I/O spawn failed");
    }
}
