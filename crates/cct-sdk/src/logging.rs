use tracing::Level;

use crate::config::LogConfig;
use crate::error::{SdkError, SdkResult};

/// Install a `fmt` subscriber at the configured level.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case the existing one is kept.
pub fn init_tracing(config: &LogConfig) -> SdkResult<bool> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| SdkError::Config(format!("unknown log level '{}'", config.level)))?;
    Ok(tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok())
}
