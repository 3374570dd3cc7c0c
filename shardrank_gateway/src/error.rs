use ::core::fmt::Display;

use ::axum::response::{IntoResponse, Response};
use ::http::StatusCode;
use ::shardrank_common::error::{ShardRankError, ShardRankErrorType::*};

pub(crate) type Result<T> = std::result::Result<T, GatewayError>;

/// [GatewayError] is a wrapper for [ShardRankError] to convert it into Axum response
pub struct GatewayError(ShardRankError);

impl GatewayError {
    fn get_status_code(&self) -> StatusCode {
        match self.0.get_error_type() {
            NotAllowed => StatusCode::BAD_REQUEST,
            BackendUnavailable => StatusCode::BAD_GATEWAY,
            IoTimeout => StatusCode::GATEWAY_TIMEOUT,
            FailToLoadConfig => StatusCode::INTERNAL_SERVER_ERROR,
            FailToInitLogging => StatusCode::INTERNAL_SERVER_ERROR,
            FailToLoadDataset => StatusCode::INTERNAL_SERVER_ERROR,
            FailToBind => StatusCode::INTERNAL_SERVER_ERROR,
            Io => StatusCode::INTERNAL_SERVER_ERROR,
            ConnectionClosed => StatusCode::INTERNAL_SERVER_ERROR,
            Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
            CoordinatorUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ShardRankError> for GatewayError {
    fn from(error: ShardRankError) -> Self {
        Self(error)
    }
}

/// [GatewayError] displays in the same way as [ShardRankError]
impl Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.get_status_code();
        (status, self.to_string()).into_response()
    }
}
