use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when no filter is passed on the command line.
pub const LOG_ENV: &str = "CUSTOM_SHELL_LOG";

const DEFAULT_FILTER: &str = "error";

/// Installs the global `tracing` subscriber.
///
/// Events go to stderr so they never mix with command output. The filter comes
/// from `filter` if given, then from [`LOG_ENV`], and falls back to `error`.
pub fn init_logging(filter: Option<&str>) -> anyhow::Result<()> {
    let env_filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_level(true)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}
