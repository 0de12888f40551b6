use tracing::subscriber::set_global_default;
use tracing_subscriber::EnvFilter;

/// Filter used when `FILEUTIL_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn";

/// Environment variable holding the log filter, e.g. `FILEUTIL_LOG=debug`.
pub const LOG_ENV: &str = "FILEUTIL_LOG";

/// Send tracing output to stderr, keeping stdout for results.
///
/// Defaults to `warn`: per-match failures and a storage directory that
/// vanished mid-run show up, routine progress does not.
pub fn init_logger() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .without_time()
        .compact()
        .finish();

    // Ignore error if already set in tests or env
    let _ = set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_shows_warnings() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert_eq!(filter.to_string(), "warn");
        assert_eq!(filter.max_level_hint(), Some(tracing::level_filters::LevelFilter::WARN));
    }
}
