use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const CRATE_TARGET: &str = "pkgscore";

/// Picks the filter directive. `RUST_LOG` wins outright, then `-q`, then
/// `LOG_LEVEL` (0 off, 1 info, 2 debug), then the `-v` count.
pub fn filter_directive(
    rust_log: Option<&str>,
    log_level: Option<&str>,
    verbose: u8,
    quiet: bool,
) -> String {
    if let Some(directive) = rust_log.map(str::trim).filter(|value| !value.is_empty()) {
        return directive.to_string();
    }
    if quiet {
        return "error".to_string();
    }
    let level = match log_level.map(str::trim) {
        Some("0") => return "off".to_string(),
        Some("1") => 1,
        Some("2") => 2,
        _ => verbose,
    };
    match level {
        0 => "warn".to_string(),
        1 => format!("warn,{CRATE_TARGET}=info"),
        _ => format!("warn,{CRATE_TARGET}=debug"),
    }
}

/// Installs the global subscriber. Logs go to stderr, or are appended to
/// `LOG_FILE` without colors when that variable is set.
pub fn init(verbose: u8, quiet: bool) {
    let directive = filter_directive(
        std::env::var("RUST_LOG").ok().as_deref(),
        std::env::var("LOG_LEVEL").ok().as_deref(),
        verbose,
        quiet,
    );
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_file = std::env::var_os("LOG_FILE").filter(|path| !path.is_empty());
    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
                return;
            }
            Err(e) => {
                eprintln!(
                    "warning: cannot open LOG_FILE {}: {e}; logging to stderr",
                    path.to_string_lossy()
                );
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
