//! Socket operations under a sliding deadline.
//!
//! Every single read or write gets its own deadline, so a slow peer that keeps
//! making progress stays connected while a stalled one is dropped.

use ::core::future::Future;
use ::std::time::Duration;

use ::anyhow::anyhow;
use ::futures::{SinkExt, StreamExt};
use ::tokio::io::{AsyncRead, AsyncWrite};
use ::tokio_util::{
    codec::{FramedRead, FramedWrite},
    sync::CancellationToken,
};
use ::tracing::warn;

use super::{Frame, LineCodec, WireRecord};
use crate::error::{Result, ShardRankError};

/// Run one I/O step, failing when it takes longer than `timeout`
/// or when `cancel` fires first.
pub async fn io_step<F, T, E>(timeout: Duration, cancel: &CancellationToken, step: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<ShardRankError>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(ShardRankError::cancelled(anyhow!("session cancelled"))),
        outcome = tokio::time::timeout(timeout, step) => match outcome {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ShardRankError::io_timeout(anyhow!(
                "no progress within {:?}",
                timeout
            ))),
        },
    }
}

/// Read the next frame. A stream closed by the peer is an error,
/// since every transmission must end with the end marker.
pub async fn read_frame<S, R>(
    reader: &mut FramedRead<S, LineCodec<R>>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Frame<R>>
where
    S: AsyncRead + Unpin,
    R: WireRecord,
{
    io_step(timeout, cancel, async { reader.next().await.transpose() })
        .await?
        .ok_or_else(|| {
            ShardRankError::connection_closed(anyhow!("peer closed the stream before END"))
        })
}

pub async fn write_frame<S, R>(
    writer: &mut FramedWrite<S, LineCodec<R>>,
    frame: Frame<R>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<()>
where
    S: AsyncWrite + Unpin,
    R: WireRecord,
{
    io_step(timeout, cancel, writer.send(frame)).await
}

/// Write every record followed by the end marker.
pub async fn send_records<S, R, I>(
    writer: &mut FramedWrite<S, LineCodec<R>>,
    records: I,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<usize>
where
    S: AsyncWrite + Unpin,
    R: WireRecord,
    I: IntoIterator<Item = R>,
{
    let mut sent = 0;
    for record in records {
        write_frame(writer, Frame::Record(record), timeout, cancel).await?;
        sent += 1;
    }
    write_frame(writer, Frame::End, timeout, cancel).await?;
    Ok(sent)
}

/// Read records until the end marker.
/// Malformed lines are logged and skipped; `peer` names the other side in the log.
pub async fn receive_records<S, R>(
    reader: &mut FramedRead<S, LineCodec<R>>,
    timeout: Duration,
    cancel: &CancellationToken,
    peer: &str,
) -> Result<Vec<R>>
where
    S: AsyncRead + Unpin,
    R: WireRecord,
{
    receive_records_after(reader, Some(timeout), timeout, cancel, peer).await
}

/// Like [receive_records], but the first frame gets `first_wait` instead of
/// `timeout`, or no deadline at all when `None`.
/// For a peer that legitimately stays silent before it starts sending.
pub async fn receive_records_after<S, R>(
    reader: &mut FramedRead<S, LineCodec<R>>,
    first_wait: Option<Duration>,
    timeout: Duration,
    cancel: &CancellationToken,
    peer: &str,
) -> Result<Vec<R>>
where
    S: AsyncRead + Unpin,
    R: WireRecord,
{
    let mut frame = match first_wait {
        Some(first_wait) => read_frame(reader, first_wait, cancel).await?,
        None => wait_frame(reader, cancel).await?,
    };
    let mut records = vec![];
    loop {
        match frame {
            Frame::Record(record) => records.push(record),
            Frame::Malformed { line, reason } => {
                warn!("Drop malformed line {:?} from {}: {}", line, peer, reason);
            }
            Frame::End => return Ok(records),
        }
        frame = read_frame(reader, timeout, cancel).await?;
    }
}

/// Read the next frame without a deadline, only `cancel` stops the wait.
async fn wait_frame<S, R>(
    reader: &mut FramedRead<S, LineCodec<R>>,
    cancel: &CancellationToken,
) -> Result<Frame<R>>
where
    S: AsyncRead + Unpin,
    R: WireRecord,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(ShardRankError::cancelled(anyhow!("session cancelled"))),
        frame = reader.next() => frame.transpose()?.ok_or_else(|| {
            ShardRankError::connection_closed(anyhow!("peer closed the stream before END"))
        }),
    }
}
