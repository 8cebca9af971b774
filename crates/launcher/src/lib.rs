//! Download, cache and run the BrowserStack accessibility CLI.
//!
//! This crate provides functionality to:
//! - Identify the host platform and build the download URL for it
//! - Resolve the concrete artifact location and its version through redirects
//! - Cache extracted CLI versions under a per-user cache root
//! - Fetch and unpack archives with a platform-appropriate strategy
//! - Run the cached CLI with the caller's arguments and working directory
//!
//! # Example
//!
//! ```ignore
//! use a11y_launcher_core::{Launcher, LauncherConfig};
//!
//! let launcher = Launcher::new(LauncherConfig::from_env())?;
//! let code = launcher.run(["--include", "Sources"], &std::env::current_dir()?).await?;
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod config;
mod error;
pub mod extract;
mod launcher;
pub mod locate;
pub mod permissions;
pub mod platform;
pub mod resolver;
pub mod runner;

pub use cache::CacheStore;
pub use config::LauncherConfig;
pub use error::{EXIT_CACHE_UNWRITABLE, EXIT_FAILURE, Error, Result};
pub use extract::{ArchiveExtractor, select_extractor};
pub use launcher::{A11Y_SUBCOMMAND, Launcher, PreparedArtifact};
pub use platform::{Arch, Os, Platform, current_platform};
pub use resolver::{ArtifactInfo, ArtifactResolver};
