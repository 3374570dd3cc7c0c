use ::std::{net::SocketAddr, num::NonZeroUsize, sync::Arc, time::Duration};

use ::shardrank_common::{
    anyhow::anyhow,
    config::{default_host, default_io_timeout_secs},
    dataset::Row,
    error::{Result, ShardRankError},
    serde::Deserialize,
    tokio::{self, net::TcpListener},
    tracing::{info, warn},
};

use acceptor::serve_workers;
use coordinator::{spawn_coordinator, CoordinatorHandle};
use query::serve_queries;

pub mod acceptor;
pub mod aggregator;
pub mod coordinator;
pub mod query;
pub mod session;
pub mod store;

/// Configuration for shardrank master
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(crate = "shardrank_common::serde")]
pub struct MasterConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Port speaking the bulk dataset protocol with workers
    pub worker_port: u16,
    /// Port speaking the single line query protocol
    pub query_port: u16,
    pub dataset_path: String,
    /// Registration closes as soon as this many workers are connected
    pub max_workers: NonZeroUsize,
    /// Close registration earlier, after this many seconds, with the workers connected so far
    #[serde(default)]
    pub registration_timeout_secs: Option<u64>,
    /// Sliding deadline of every socket read and write
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl MasterConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn registration_timeout(&self) -> Option<Duration> {
        self.registration_timeout_secs.map(Duration::from_secs)
    }
}

/// A master with its listeners bound, ready to serve.
pub struct Master {
    worker_listener: TcpListener,
    query_listener: TcpListener,
    coordinator: CoordinatorHandle,
    dataset: Arc<[Row]>,
    io_timeout: Duration,
    registration_timeout: Option<Duration>,
}

impl Master {
    /// Bind both listening ports and start the coordinator.
    pub async fn bind(config: &MasterConfig, dataset: Vec<Row>) -> Result<Self> {
        let worker_listener = bind_port(&config.host, config.worker_port).await?;
        let query_listener = bind_port(&config.host, config.query_port).await?;
        Ok(Self {
            worker_listener,
            query_listener,
            coordinator: spawn_coordinator(config.max_workers),
            dataset: dataset.into(),
            io_timeout: config.io_timeout(),
            registration_timeout: config.registration_timeout(),
        })
    }

    pub fn worker_addr(&self) -> Result<SocketAddr> {
        Ok(self.worker_listener.local_addr()?)
    }

    pub fn query_addr(&self) -> Result<SocketAddr> {
        Ok(self.query_listener.local_addr()?)
    }

    pub fn coordinator(&self) -> CoordinatorHandle {
        self.coordinator.clone()
    }

    /// Serve workers and queries until an unrecoverable error.
    pub async fn serve(self) -> Result<()> {
        info!(
            "Shardrank master is listening on {} for workers and on {} for queries",
            self.worker_addr()?,
            self.query_addr()?
        );
        tokio::spawn(report_aggregation(self.coordinator.clone()));
        tokio::try_join!(
            serve_workers(
                self.worker_listener,
                self.coordinator.clone(),
                self.dataset,
                self.io_timeout,
                self.registration_timeout,
            ),
            serve_queries(self.query_listener, self.coordinator, self.io_timeout),
        )?;
        Ok(())
    }
}

async fn bind_port(host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .map_err(|e| ShardRankError::fail_to_bind(anyhow!("cannot bind {}:{}: {}", host, port, e)))
}

async fn report_aggregation(coordinator: CoordinatorHandle) {
    match coordinator.wait_for_aggregation().await {
        Ok(aggregated) => {
            for (node_id, products) in aggregated.iter() {
                info!("Top products of node {}: {:?}", node_id, products);
            }
            println!("Combined results:\n{}", aggregated);
        }
        Err(e) => warn!("No aggregated result: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use ::shardrank_common::{
        anyhow::Result,
        serde_json::{from_value, json},
    };

    use super::*;

    #[test]
    fn missing_field_max_workers() {
        let config = json!(
            {
                "worker_port": 9000,
                "query_port": 9001,
                "dataset_path": "data.csv"
            }
        );
        let result = from_value::<MasterConfig>(config);
        assert_eq!(
            result.unwrap_err().to_string(),
            "missing field `max_workers`"
        );
    }

    #[test]
    fn zero_workers_is_invalid() {
        let config = json!(
            {
                "worker_port": 9000,
                "query_port": 9001,
                "dataset_path": "data.csv",
                "max_workers": 0
            }
        );
        assert!(from_value::<MasterConfig>(config).is_err());
    }

    #[test]
    fn deny_unknown_fields() {
        let config = json!(
            {
                "worker_port": 9000,
                "query_port": 9001,
                "dataset_path": "data.csv",
                "max_workers": 3,
                "unknown_field": "unknown"
            }
        );
        let result = from_value::<MasterConfig>(config);
        assert_eq!(
            result.unwrap_err().to_string(),
            "unknown field `unknown_field`, expected one of `host`, `worker_port`, `query_port`, `dataset_path`, `max_workers`, `registration_timeout_secs`, `io_timeout_secs`, `log_file`"
        );
    }

    #[test]
    fn deserialize_master_config_with_defaults() -> Result<()> {
        let config = json!(
            {
                "worker_port": 9000,
                "query_port": 9001,
                "dataset_path": "data.csv",
                "max_workers": 3
            }
        );
        let result = from_value::<MasterConfig>(config)?;
        assert_eq!(
            result,
            MasterConfig {
                host: "0.0.0.0".to_owned(),
                worker_port: 9000,
                query_port: 9001,
                dataset_path: "data.csv".to_owned(),
                max_workers: NonZeroUsize::new(3).unwrap(),
                registration_timeout_secs: None,
                io_timeout_secs: 10,
                log_file: None,
            }
        );
        assert_eq!(result.io_timeout(), Duration::from_secs(10));
        assert_eq!(result.registration_timeout(), None);
        Ok(())
    }

    #[test]
    fn deserialize_master_config() -> Result<()> {
        let config = json!(
            {
                "host": "127.0.0.1",
                "worker_port": 9000,
                "query_port": 9001,
                "dataset_path": "data.csv",
                "max_workers": 3,
                "registration_timeout_secs": 30,
                "io_timeout_secs": 5,
                "log_file": "server_errors.log"
            }
        );
        let result = from_value::<MasterConfig>(config)?;
        assert_eq!(result.registration_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(result.io_timeout(), Duration::from_secs(5));
        assert_eq!(result.log_file.as_deref(), Some("server_errors.log"));
        Ok(())
    }
}
