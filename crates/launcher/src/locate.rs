//! Binary discovery inside an unpacked archive.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::permissions::is_executable;
use crate::{Error, Result};

/// Find the CLI executable in `dir` and make sure it lives at `dir/<preferred_name>`.
///
/// Preference order:
/// 1. `dir/<preferred_name>` if it is already executable
/// 2. the first regular file named `preferred_name` at any depth
/// 3. the first executable regular file
/// 4. the first regular file
///
/// Hidden entries are skipped and the walk is depth-first in file name order.
/// A match found anywhere but the expected path is moved there, replacing
/// whatever occupied it.
pub fn locate(dir: &Path, preferred_name: &str) -> Result<PathBuf> {
    let expected = dir.join(preferred_name);
    if is_executable(&expected) {
        debug!(path = ?expected, "Found executable at expected path");
        return Ok(expected);
    }

    let found = find_candidate(dir, preferred_name)?;
    if found == expected {
        return Ok(expected);
    }

    debug!(from = ?found, to = ?expected, "Moving located binary into place");
    place(&found, &expected)?;
    Ok(expected)
}

fn find_candidate(dir: &Path, preferred_name: &str) -> Result<PathBuf> {
    let mut first_executable = None;
    let mut first_file = None;

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(|e| Error::io(e.into(), dir, "walk"))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        if entry.file_name() == preferred_name {
            return Ok(path.to_path_buf());
        }
        if first_executable.is_none() && is_executable(path) {
            first_executable = Some(path.to_path_buf());
        }
        if first_file.is_none() {
            first_file = Some(path.to_path_buf());
        }
    }

    first_executable.or(first_file).ok_or_else(|| Error::NoBinaryFound { dir: dir.into() })
}

/// Move `found` to `expected`, even when `expected` is a directory containing `found`.
fn place(found: &Path, expected: &Path) -> Result<()> {
    let parent = expected.parent().unwrap_or_else(|| Path::new("."));
    let holding = parent.join(format!(
        ".{}.located",
        expected
            .file_name()
            .map_or_else(|| "binary".into(), |n| n.to_string_lossy())
    ));

    std::fs::rename(found, &holding).map_err(|e| Error::io(e, found, "rename"))?;

    match std::fs::symlink_metadata(expected) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(expected),
        Ok(_) => std::fs::remove_file(expected),
        Err(_) => Ok(()),
    }
    .map_err(|e| Error::io(e, expected, "remove"))?;

    std::fs::rename(&holding, expected).map_err(|e| Error::io(e, &holding, "rename"))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
