use ::std::path::Path;

use ::shardrank_common::{
    anyhow::anyhow,
    config::{load_config, Args},
    error::{Result, ShardRankError},
    logging::init_tracing,
    tokio::{self, net::TcpListener},
    tracing::info,
};
use ::shardrank_gateway::{backend::TcpBackend, get_gateway, GatewayConfig};

#[tokio::main]
/// Start shardrank gateway
async fn main() -> Result<()> {
    let Args { config_path } = Args::parse_args();
    let config: GatewayConfig = load_config(&config_path)?;
    init_tracing(config.log_file.as_deref().map(Path::new))?;

    let backend = TcpBackend::new(config.master_query_address.clone(), config.io_timeout());
    let app = get_gateway(backend)?;

    // run it
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| {
            ShardRankError::fail_to_bind(anyhow!("cannot bind {}:{}: {}", config.host, config.port, e))
        })?;
    info!(
        "Shardrank gateway is listening on {}, asking {}",
        listener.local_addr()?,
        config.master_query_address
    );
    axum::serve(listener, app).await?;
    Ok(())
}
