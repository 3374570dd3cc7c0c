use ::core::fmt::Display;

use ::anyhow::anyhow;
use ::tokio_util::codec::{AnyDelimiterCodecError, LinesCodecError};

pub type Result<T> = std::result::Result<T, ShardRankError>;

/// The category of a [ShardRankError].
/// Startup kinds abort the process, session kinds abort a single worker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardRankErrorType {
    FailToLoadConfig,
    FailToInitLogging,
    FailToLoadDataset,
    FailToBind,
    IoTimeout,
    Io,
    ConnectionClosed,
    Cancelled,
    NotAllowed,
    CoordinatorUnavailable,
    BackendUnavailable,
}

impl Display for ShardRankErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::FailToLoadConfig => "Fail to load config",
            Self::FailToInitLogging => "Fail to init logging",
            Self::FailToLoadDataset => "Fail to load dataset",
            Self::FailToBind => "Fail to bind",
            Self::IoTimeout => "IO timeout",
            Self::Io => "IO error",
            Self::ConnectionClosed => "Connection closed",
            Self::Cancelled => "Cancelled",
            Self::NotAllowed => "Not allowed",
            Self::CoordinatorUnavailable => "Coordinator unavailable",
            Self::BackendUnavailable => "Backend unavailable",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug)]
pub struct ShardRankError {
    error_type: ShardRankErrorType,
    cause: anyhow::Error,
}

impl ShardRankError {
    pub fn get_error_type(&self) -> ShardRankErrorType {
        self.error_type
    }
}

impl Display for ShardRankError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.cause)
    }
}

impl std::error::Error for ShardRankError {}

macro_rules! define_error_constructors {
    ($($constructor: ident => $error_type: ident),* $(,)?) => {
        impl ShardRankError {
            $(
                pub fn $constructor<E: Into<anyhow::Error>>(cause: E) -> Self {
                    Self {
                        error_type: ShardRankErrorType::$error_type,
                        cause: cause.into(),
                    }
                }
            )*
        }
    };
}

define_error_constructors!(
    fail_to_load_config => FailToLoadConfig,
    fail_to_init_logging => FailToInitLogging,
    fail_to_load_dataset => FailToLoadDataset,
    fail_to_bind => FailToBind,
    io_timeout => IoTimeout,
    io => Io,
    connection_closed => ConnectionClosed,
    cancelled => Cancelled,
    not_allowed => NotAllowed,
    coordinator_unavailable => CoordinatorUnavailable,
    backend_unavailable => BackendUnavailable,
);

impl From<std::io::Error> for ShardRankError {
    fn from(value: std::io::Error) -> Self {
        Self::io(value)
    }
}

impl From<LinesCodecError> for ShardRankError {
    fn from(value: LinesCodecError) -> Self {
        match value {
            LinesCodecError::Io(e) => Self::io(e),
            LinesCodecError::MaxLineLengthExceeded => {
                Self::not_allowed(anyhow!("line exceeds the maximum line length"))
            }
        }
    }
}

impl From<AnyDelimiterCodecError> for ShardRankError {
    fn from(value: AnyDelimiterCodecError) -> Self {
        match value {
            AnyDelimiterCodecError::Io(e) => Self::io(e),
            AnyDelimiterCodecError::MaxChunkLengthExceeded => {
                Self::not_allowed(anyhow!("line exceeds the maximum line length"))
            }
        }
    }
}

impl From<serde_json::Error> for ShardRankError {
    fn from(value: serde_json::Error) -> Self {
        if value.is_io() {
            Self::io(value)
        } else {
            Self::not_allowed(value)
        }
    }
}

impl From<csv::Error> for ShardRankError {
    fn from(value: csv::Error) -> Self {
        Self::fail_to_load_dataset(value)
    }
}
