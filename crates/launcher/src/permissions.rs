//! Executable permission handling.

use std::path::Path;

use crate::{Error, Result};

/// Mode applied to placed executables (`rwxr-xr-x`).
#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// Mark a file readable and executable by owner, group and others.
///
/// No-op on platforms without POSIX permission bits.
#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .map_err(|e| Error::io(e, path, "stat"))?
        .permissions();
    perms.set_mode(EXECUTABLE_MODE);
    std::fs::set_permissions(path, perms).map_err(|e| Error::io(e, path, "chmod"))
}

/// Mark a file readable and executable by owner, group and others.
///
/// No-op on platforms without POSIX permission bits.
#[cfg(not(unix))]
pub fn ensure_executable(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::io(
            std::io::Error::from(std::io::ErrorKind::NotFound),
            path,
            "stat",
        ))
    }
}

/// Whether a path is a regular file the current platform would execute.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
