//! `a11y-launcher`: run the BrowserStack accessibility linter from a cached download.

mod args;
mod cli;
mod tracing;

use a11y_launcher_core::{EXIT_FAILURE, Error, Launcher, LauncherConfig};
use clap::Parser;
use std::io::Write;

use crate::args::{partition_launcher_options, sanitize_arguments, split_passthrough};
use crate::cli::Cli;
use crate::tracing::{TracingConfig, TracingFormat};

/// Width used for error rendering so help text stays on one line.
const REPORT_WIDTH: usize = 200;

fn main() {
    // NOTE: eprintln! is used because tracing may be unusable during a panic.
    #[allow(clippy::print_stderr)]
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let (before_separator, passthrough) = split_passthrough(std::env::args());
    let (launcher_argv, forwarded) = partition_launcher_options(before_separator);
    let cli = match Cli::try_parse_from(launcher_argv) {
        Ok(cli) => cli,
        Err(e) => {
            // Exit code 2 is reserved for an unwritable cache.
            let code = if e.use_stderr() { EXIT_FAILURE } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let tracing_config = TracingConfig {
        format: TracingFormat::from_env(),
        level: cli.log_level.into(),
    };
    if let Err(e) = crate::tracing::init_tracing(tracing_config) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{e:?}");
        }
    }

    let forwarded = sanitize_arguments(forwarded.into_iter().chain(passthrough));
    std::process::exit(run_with_tokio(cli, forwarded));
}

fn run_with_tokio(cli: Cli, forwarded: Vec<String>) -> i32 {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            }
            return EXIT_FAILURE;
        }
    };

    match rt.block_on(run(cli, forwarded)) {
        Ok(code) => code,
        Err(err) => {
            let code = err.exit_code();
            render_error(err);
            code
        }
    }
}

async fn run(cli: Cli, forwarded: Vec<String>) -> a11y_launcher_core::Result<i32> {
    let config = LauncherConfig::from_env()
        .with_download_url(cli.download_url)
        .with_force_download(cli.force_download);
    ::tracing::debug!(
        correlation_id = %crate::tracing::correlation_id(),
        cache_root = ?config.cache_root,
        force_download = config.force_download,
        "Starting a11y-launcher"
    );

    let working_dir =
        std::env::current_dir().map_err(|e| Error::io_no_path(e, "read current directory"))?;

    Launcher::new(config)?.run(forwarded, &working_dir).await
}

/// Print a failure on stderr.
///
/// Helper process failures relay their own diagnostic text unchanged.
#[allow(clippy::print_stderr)]
fn render_error(err: Error) {
    if let Error::Subprocess { message, .. } = &err {
        eprintln!("{message}");
    } else {
        let _ = miette::set_hook(Box::new(|_| {
            Box::new(miette::MietteHandlerOpts::new().width(REPORT_WIDTH).build())
        }));
        eprintln!("{:?}", miette::Report::new(err));
    }
    let _ = std::io::stderr().flush();
}
