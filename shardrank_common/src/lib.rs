//! Common types and utilities for the shardrank projects.

pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod node;
pub mod partition;
pub mod protocol;

pub use ::anyhow;
pub use ::clap;
pub use ::futures;
pub use ::serde;
pub use ::serde_json;
pub use ::tokio;
pub use ::tokio_util;
pub use ::tracing;
pub use ::tracing_subscriber;
