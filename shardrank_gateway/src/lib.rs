use ::std::time::Duration;

use ::axum::{extract::State, routing::get, Router};
use ::shardrank_common::{
    config::{default_host, default_io_timeout_secs},
    error::Result,
    serde::Deserialize,
};
use ::tower_http::trace::TraceLayer;
use backend::RecommendationBackend;
use recommendation::get_recommendation_router;
use state::GatewayState;

pub mod backend;
pub mod error;
pub mod recommendation;
pub(crate) mod state;

/// Configuration for shardrank gateway
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(crate = "shardrank_common::serde")]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// `host:port` of the master query port
    pub master_query_address: String,
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl GatewayConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

/// This is the only entry for users to get the shardrank gateway.
/// # Return the router for the gateway
pub fn get_gateway<B>(backend: B) -> Result<Router>
where
    B: RecommendationBackend,
{
    let state = GatewayState::new(backend);

    let router = Router::new()
        .route(
            "/",
            get(|_: State<GatewayState<B>>| async { "welcome to shardrank" }),
        )
        .merge(get_recommendation_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    Ok(router)
}
