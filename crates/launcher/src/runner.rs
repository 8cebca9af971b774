//! Running the resolved CLI in the caller's terminal.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::{Error, Result};

/// Run `executable` with `args` in `working_dir`, inheriting all standard streams.
///
/// Returns the child's exit code. A child killed by a signal yields
/// [`Error::AbnormalTermination`].
pub async fn invoke<I, S>(executable: &Path, args: I, working_dir: &Path) -> Result<i32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let status = Command::new(executable)
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| Error::io(e, executable, "spawn"))?;

    let Some(code) = status.code() else {
        return Err(Error::AbnormalTermination {
            program: executable
                .file_name()
                .map_or_else(|| executable.display().to_string(), |n| n.to_string_lossy().into_owned()),
        });
    };

    if code != 0 {
        tracing::debug!(?executable, code, "CLI exited with non-zero status");
    }
    Ok(code)
}
