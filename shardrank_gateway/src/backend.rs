//! Where the gateway gets its recommendations from.

use ::core::future::Future;
use ::std::time::Duration;

use ::shardrank_common::{
    anyhow::anyhow,
    error::{Result, ShardRankError},
    futures::{SinkExt, StreamExt},
    node::ProductId,
    protocol::{io_step, MAX_LINE_LENGTH},
    serde_json,
    tokio::net::TcpStream,
    tokio_util::{
        codec::{FramedRead, FramedWrite, LinesCodec},
        sync::CancellationToken,
    },
    tracing::debug,
};

pub trait RecommendationBackend: Sized + Send + Sync + 'static {
    /// Products to recommend to someone looking at `product_name`.
    /// # Return
    /// - `Ok(vec![])` when the master has nothing to recommend yet.
    /// - `Err(_)` with [BackendUnavailable](shardrank_common::error::ShardRankErrorType::BackendUnavailable)
    ///   when the master cannot be reached or answers garbage.
    fn recommend(
        &self,
        product_name: &str,
    ) -> impl Future<Output = Result<Vec<ProductId>>> + Send;
}

/// Asks the master query port, one short lived connection per request.
#[derive(Debug, Clone)]
pub struct TcpBackend {
    address: String,
    io_timeout: Duration,
}

impl TcpBackend {
    pub fn new(address: String, io_timeout: Duration) -> Self {
        Self {
            address,
            io_timeout,
        }
    }

    async fn query(&self, product_name: &str) -> Result<Vec<ProductId>> {
        let cancel = CancellationToken::new();
        let stream = io_step(self.io_timeout, &cancel, TcpStream::connect(&self.address)).await?;
        let (reader, writer) = stream.into_split();

        let mut writer = FramedWrite::new(writer, LinesCodec::new());
        io_step(self.io_timeout, &cancel, writer.send(product_name)).await?;

        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let reply = io_step(self.io_timeout, &cancel, async {
            lines.next().await.transpose()
        })
        .await?
        .ok_or_else(|| ShardRankError::connection_closed(anyhow!("master closed without answer")))?;
        debug!("Master answered {} for {}", reply, product_name);
        Ok(serde_json::from_str(&reply)?)
    }
}

impl RecommendationBackend for TcpBackend {
    async fn recommend(&self, product_name: &str) -> Result<Vec<ProductId>> {
        // the query protocol is one line per request
        if product_name.contains(['\n', '\r']) {
            return Err(ShardRankError::not_allowed(anyhow!(
                "product name {:?} spans several lines",
                product_name
            )));
        }
        self.query(product_name).await.map_err(|e| {
            ShardRankError::backend_unavailable(anyhow!("master {}: {}", self.address, e))
        })
    }
}
