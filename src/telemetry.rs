//! Tracing setup for the CLI.
//!
//! - LOG_LEVEL controls the filter (e.g. "debug" or "warn,sprachtage=debug").
//! - LOG_FORMAT selects "pretty" (default) or "json".
//!
//! Logs go to stderr; stdout carries command output, including `--json`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => {
            builder.json().init();
        }
        _ => {
            builder.init();
        }
    }
}
