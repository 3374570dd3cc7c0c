//! Single line query protocol served on its own port.
//!
//! The client writes one product identifier per connection and reads back one
//! line: a json array of recommended product identifiers.

use ::std::time::Duration;

use ::shardrank_common::{
    anyhow::anyhow,
    error::{Result, ShardRankError},
    futures::{SinkExt, StreamExt},
    node::ProductId,
    protocol::{io_step, MAX_LINE_LENGTH},
    serde_json,
    tokio::{
        self,
        io::{self, AsyncRead, AsyncWrite},
        net::TcpListener,
    },
    tokio_util::{
        codec::{FramedRead, FramedWrite, LinesCodec},
        sync::CancellationToken,
    },
    tracing::{debug, error, warn},
};

use crate::coordinator::CoordinatorHandle;

/// Answer queries forever, one task per connection.
pub async fn serve_queries(
    listener: TcpListener,
    coordinator: CoordinatorHandle,
    io_timeout: Duration,
) -> Result<()> {
    loop {
        let (stream, address) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept a query connection: {}", e);
                continue;
            }
        };
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            if let Err(e) = answer_query(stream, &coordinator, io_timeout).await {
                warn!("Query from {} failed: {}", address, e);
            }
        });
    }
}

/// Read one product identifier and write its recommendations.
pub async fn answer_query<S>(
    stream: S,
    coordinator: &CoordinatorHandle,
    io_timeout: Duration,
) -> Result<Vec<ProductId>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // queries are not sessions, nothing cancels them
    let cancel = CancellationToken::new();
    let (reader, writer) = io::split(stream);

    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let product_id = io_step(io_timeout, &cancel, async { lines.next().await.transpose() })
        .await?
        .ok_or_else(|| ShardRankError::connection_closed(anyhow!("query closed before a product")))?;
    let product_id = product_id.trim();

    let recommendations = coordinator.recommend(product_id);
    debug!("Recommend {:?} for {}", recommendations, product_id);
    let reply = serde_json::to_string(&recommendations)?;
    let mut writer = FramedWrite::new(writer, LinesCodec::new());
    io_step(io_timeout, &cancel, writer.send(reply)).await?;
    Ok(recommendations)
}
