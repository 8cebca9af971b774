//! Splitting and sanitizing the forwarded argument vector.

/// Token that ends launcher option parsing.
pub const SEPARATOR: &str = "--";

/// Launcher flags that take no value.
const LAUNCHER_FLAGS: &[&str] = &["--force-download", "--help", "-h", "--version", "-V"];

/// Launcher options that take a value, separately or after `=`.
const LAUNCHER_OPTIONS: &[&str] = &["--download-url", "--log-level"];

const SHORT_OUTPUT: &str = "-o";
const LONG_OUTPUT: &str = "--output-format";

/// Split `argv` at the first `--`.
///
/// The first half (program name included) is parsed as launcher options; the
/// second half starts with the separator itself and is forwarded untouched.
pub fn split_passthrough<I>(argv: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut launcher = Vec::new();
    let mut passthrough = Vec::new();
    let mut iter = argv.into_iter();

    for arg in iter.by_ref() {
        if arg == SEPARATOR {
            passthrough.push(arg);
            break;
        }
        launcher.push(arg);
    }
    passthrough.extend(iter);

    (launcher, passthrough)
}

/// Separate launcher options from arguments meant for the wrapped CLI.
///
/// `argv` is the part before `--`, program name first. Launcher options are
/// recognised anywhere in it; everything else keeps its relative order and is
/// returned as the forwarded half.
pub fn partition_launcher_options<I>(argv: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let mut iter = argv.into_iter();
    let mut launcher: Vec<String> = iter.next().into_iter().collect();
    let mut forwarded = Vec::new();

    while let Some(arg) = iter.next() {
        if LAUNCHER_FLAGS.contains(&arg.as_str()) {
            launcher.push(arg);
        } else if LAUNCHER_OPTIONS.contains(&arg.as_str()) {
            launcher.push(arg);
            launcher.extend(iter.next());
        } else if LAUNCHER_OPTIONS
            .iter()
            .any(|option| arg.starts_with(&format!("{option}=")))
        {
            launcher.push(arg);
        } else {
            forwarded.push(arg);
        }
    }

    (launcher, forwarded)
}

/// Drop output-format options the wrapped CLI must not receive.
///
/// Removes `-o <v>`, `-o<v>`, `--output-format <v>` and `--output-format=<v>`.
/// Everything from the first `--` on is kept verbatim.
pub fn sanitize_arguments<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut sanitized = Vec::new();
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        if arg == SEPARATOR {
            sanitized.push(arg);
            sanitized.extend(iter);
            break;
        }
        if arg == SHORT_OUTPUT || arg == LONG_OUTPUT {
            iter.next();
            continue;
        }
        if arg.starts_with(&format!("{LONG_OUTPUT}=")) {
            continue;
        }
        if arg.starts_with(SHORT_OUTPUT) && !arg.starts_with("--") {
            continue;
        }
        sanitized.push(arg);
    }

    sanitized
}
