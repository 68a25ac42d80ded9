use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";
pub const DAEMON_PREFIX: &str = "daemon";

const LOG_DIR: &str = "logs";
const MAX_LOG_FILES: usize = 5;

/// Builds the filter directive for the crate. An explicit level wins over `RUST_LOG`, and
/// without either informational messages get through.
fn filter_directive(log_level: Option<LevelFilter>, env_level: Option<String>) -> String {
    let level = log_level
        .map(|v| v.to_string())
        .or(env_level)
        .unwrap_or_else(|| LevelFilter::INFO.to_string());

    format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_"))
}

/// Sets up logging into `<application_data_path>/logs`, one file per day. `show_std` also mirrors
/// the output to stdout, which is only sensible when nothing else is drawn there.
pub fn enable_logging(
    prefix: &str,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .build(application_data_path.join(LOG_DIR))?;

    let stdout = std::io::stdout.with_filter(move |_| show_std);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directive(
            log_level,
            std::env::var("RUST_LOG").ok(),
        )))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .with_ansi(false)
        .init();
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::filter_directive;

    #[test]
    fn test_filter_directive_precedence() {
        assert_eq!(
            filter_directive(Some(LevelFilter::TRACE), Some("info".into())),
            "timekeeper=trace"
        );
        assert_eq!(filter_directive(None, Some("info".into())), "timekeeper=info");
        assert_eq!(filter_directive(None, None), "timekeeper=info");
    }
}
