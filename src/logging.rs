use std::path::Path;

use flexi_logger::{Duplicate, FileSpec, Logger, LoggerHandle};

use crate::config::LoggingConfig;
use crate::error::CampusError;

/// Starts the file logger. The returned handle must be kept alive for the
/// lifetime of the process or buffered log lines are lost.
pub fn init_logging(config: &LoggingConfig, log_dir: &Path) -> Result<LoggerHandle, CampusError> {
    let handle = Logger::try_with_env_or_str(config.log_spec())?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename("campusdesk"),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .start()?;

    Ok(handle)
}
