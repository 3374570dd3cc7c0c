//! Configuration helpers for shardrank master, worker and gateway.

use ::std::{fs::File, io::BufReader, path::Path};

use ::anyhow::anyhow;
use ::clap::Parser;
use ::serde::de::DeserializeOwned;
use ::serde_json::from_reader;

use crate::error::{Result, ShardRankError};

/// Per-operation deadline used when a config does not set one.
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
/// Command line arguments for every shardrank binary.
pub struct Args {
    /// path to the config file
    #[arg(long)]
    pub config_path: String,
}

impl Args {
    /// helper function for exporting the `clap::Parser::parse` function
    pub fn parse_args() -> Self {
        Args::parse()
    }
}

/// Load a json config file into `C`.
pub fn load_config<C: DeserializeOwned>(path: impl AsRef<Path>) -> Result<C> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        ShardRankError::fail_to_load_config(anyhow!("cannot open {}: {}", path.display(), e))
    })?;
    from_reader(BufReader::new(file)).map_err(ShardRankError::fail_to_load_config)
}

pub fn default_io_timeout_secs() -> u64 {
    DEFAULT_IO_TIMEOUT_SECS
}

pub fn default_host() -> String {
    "0.0.0.0".to_owned()
}
