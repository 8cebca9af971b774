//! External command stages and two-stage pipelines.
//!
//! A [`Pipeline`] connects a producer's stdout to a consumer's stdin through an
//! in-memory copy. The first stage to fail decides the error, carrying its
//! exit code and captured stderr.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::{Error, Result};

/// A single external command.
#[derive(Debug, Clone)]
pub struct Stage {
    program: OsString,
    args: Vec<OsString>,
    failure_message: Option<String>,
}

impl Stage {
    /// Create a stage running `program`.
    #[must_use]
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            failure_message: None,
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Message reported when the stage fails without writing to stderr.
    #[must_use]
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    /// Short name used in logs and errors.
    #[must_use]
    pub fn label(&self) -> String {
        Path::new(&self.program)
            .file_stem()
            .unwrap_or(&self.program)
            .to_string_lossy()
            .into_owned()
    }

    /// Program and arguments, for diagnostics.
    #[must_use]
    pub fn argv(&self) -> Vec<&OsStr> {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .collect()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, error: &std::io::Error) -> Error {
        Error::extraction_failed(format!("Unable to launch {}: {error}", self.label()))
    }

    /// Run the stage to completion, capturing stderr.
    pub async fn run(&self) -> Result<()> {
        trace!(argv = ?self.argv(), "Running stage");
        let output = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(&e))?;
        self.check(output.status, &output.stderr)
    }

    fn check(&self, status: ExitStatus, stderr: &[u8]) -> Result<()> {
        if status.success() {
            return Ok(());
        }
        let Some(code) = status.code() else {
            return Err(Error::AbnormalTermination {
                program: self.label(),
            });
        };

        let captured = String::from_utf8_lossy(stderr).trim().to_string();
        let message = if captured.is_empty() {
            self.failure_message
                .clone()
                .unwrap_or_else(|| format!("{} exited with status {code}", self.label()))
        } else {
            captured
        };
        debug!(stage = %self.label(), code, %message, "Stage failed");
        Err(Error::subprocess(self.label(), code, message))
    }
}

/// Two stages connected by a byte stream.
#[derive(Debug, Clone)]
pub struct Pipeline {
    producer: Stage,
    consumer: Stage,
}

impl Pipeline {
    /// Connect `producer`'s stdout to `consumer`'s stdin.
    #[must_use]
    pub fn new(producer: Stage, consumer: Stage) -> Self {
        Self { producer, consumer }
    }

    /// Run both stages to completion.
    ///
    /// A producer failure takes precedence over a consumer failure, since the
    /// consumer usually only fails because its input was cut short.
    pub async fn run(&self) -> Result<()> {
        trace!(
            producer = ?self.producer.argv(),
            consumer = ?self.consumer.argv(),
            "Running pipeline"
        );

        let mut consumer = self
            .consumer
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.consumer.spawn_error(&e))?;

        let mut producer = match self
            .producer
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                let _ = consumer.kill().await;
                return Err(self.producer.spawn_error(&e));
            }
        };

        let source = producer.stdout.take();
        let sink = consumer.stdin.take();
        let pump = async move {
            if let (Some(mut source), Some(mut sink)) = (source, sink) {
                // A consumer that exits early closes the pipe; its status reports why.
                if let Err(e) = tokio::io::copy(&mut source, &mut sink).await {
                    trace!(error = %e, "Pipeline copy ended early");
                }
            }
        };

        let ((), producer_stderr, consumer_stderr) = tokio::join!(
            pump,
            read_all(producer.stderr.take()),
            read_all(consumer.stderr.take()),
        );

        let producer_status = producer
            .wait()
            .await
            .map_err(|e| Error::io_no_path(e, "wait"))?;
        let consumer_status = consumer
            .wait()
            .await
            .map_err(|e| Error::io_no_path(e, "wait"))?;

        self.producer.check(producer_status, &producer_stderr)?;
        self.consumer.check(consumer_status, &consumer_stderr)
    }
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        if let Err(e) = reader.read_to_end(&mut buf).await {
            trace!(error = %e, captured = buf.len(), "Failed to read helper stderr");
        }
    }
    buf
}
