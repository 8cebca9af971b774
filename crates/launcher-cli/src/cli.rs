use clap::Parser;

use crate::tracing::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "a11y-launcher")]
#[command(about = "Download, cache and run the BrowserStack accessibility linter")]
#[command(
    long_about = "Download, cache and run the BrowserStack accessibility linter.\n\n\
                  Arguments not recognised by the launcher, and everything after `--`, \
                  are forwarded to `browserstack-cli a11y`."
)]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        value_name = "URL_OR_PATH",
        help = "Download the CLI from this URL or local archive instead of the default endpoint"
    )]
    pub download_url: Option<String>,

    #[arg(long, help = "Re-download the CLI even if a cached copy exists")]
    pub force_download: bool,

    #[arg(
        long,
        help = "Set logging level",
        default_value = "info",
        value_enum
    )]
    pub log_level: LogLevel,
}
