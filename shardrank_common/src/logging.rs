//! Tracing setup shared by the shardrank binaries.

use ::std::{fs::OpenOptions, path::Path, sync::Mutex};

use ::anyhow::anyhow;

use crate::error::{Result, ShardRankError};

/// Install the global `tracing` subscriber.
/// Logs go to `log_file` (appended, without colors) when given, otherwise to stdout.
pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_target(true);
    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    ShardRankError::fail_to_init_logging(anyhow!(
                        "cannot open log file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.try_init(),
    };
    installed.map_err(|e| ShardRankError::fail_to_init_logging(anyhow!("{}", e)))
}
