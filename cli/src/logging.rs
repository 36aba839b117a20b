use flexi_logger::{Logger, LoggerHandle};

use crate::Result;

/// Log level for `-v` given `verbosity` times. `RUST_LOG` takes precedence.
pub(crate) fn level(verbosity: u64) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Send log records to stderr, keeping stdout for command output.
pub(crate) fn init(verbosity: u64) -> Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str(level(verbosity))?
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()?;
    Ok(handle)
}
