//! A shardrank worker connects to the master, receives its partition of the
//! dataset, scores every product in it and sends the scores back.

use ::std::time::Duration;

use ::shardrank_common::{
    anyhow::anyhow,
    config::default_io_timeout_secs,
    dataset::Row,
    error::{Result, ShardRankError},
    protocol::{io_step, receive_records_after, send_records, LineCodec, ScoreRecord},
    serde::Deserialize,
    tokio::{
        io::{self, AsyncRead, AsyncWrite, AsyncWriteExt},
        net::TcpStream,
    },
    tokio_util::{
        codec::{FramedRead, FramedWrite},
        sync::CancellationToken,
    },
    tracing::info,
};

pub mod scoring;

use scoring::{compute_scores, Scoring};

/// Configuration for shardrank worker
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(crate = "shardrank_common::serde")]
pub struct WorkerConfig {
    /// `host:port` of the master worker port
    pub master_address: String,
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
    /// How long to wait for the first row while the master is still
    /// registering other workers. Waits until the master sends or closes when absent.
    #[serde(default)]
    pub registration_wait_secs: Option<u64>,
    #[serde(default)]
    pub scoring: Scoring,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl WorkerConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn registration_wait(&self) -> Option<Duration> {
        self.registration_wait_secs.map(Duration::from_secs)
    }
}

/// Connect to the master and run one exchange.
/// Returns the number of scores sent back.
pub async fn run_worker(config: &WorkerConfig) -> Result<usize> {
    let io_timeout = config.io_timeout();
    let stream = io_step(
        io_timeout,
        &CancellationToken::new(),
        TcpStream::connect(&config.master_address),
    )
    .await
    .map_err(|e| {
        ShardRankError::connection_closed(anyhow!(
            "cannot connect to master {}: {}",
            config.master_address,
            e
        ))
    })?;
    info!("Connected to master {}", config.master_address);
    exchange(stream, config.scoring, config.registration_wait(), io_timeout).await
}

/// Read rows until the end marker, then write one score per product,
/// in ascending product order, and the end marker.
///
/// The master sends nothing until registration closes, so the first row
/// is awaited for `registration_wait` rather than `io_timeout`.
pub async fn exchange<S>(
    stream: S,
    scoring: Scoring,
    registration_wait: Option<Duration>,
    io_timeout: Duration,
) -> Result<usize>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // nothing aborts a worker but its own deadline
    let cancel = CancellationToken::new();
    let (reader, writer) = io::split(stream);

    let mut reader = FramedRead::new(reader, LineCodec::<Row>::new());
    let rows =
        receive_records_after(&mut reader, registration_wait, io_timeout, &cancel, "master")
            .await?;
    info!("Received {} rows", rows.len());

    let scores = compute_scores(&rows, scoring);
    let records = scores
        .into_iter()
        .map(|(product_id, score)| ScoreRecord::new(product_id, score));
    let mut writer = FramedWrite::new(writer, LineCodec::<ScoreRecord>::new());
    let sent = send_records(&mut writer, records, io_timeout, &cancel).await?;
    io_step(io_timeout, &cancel, writer.get_mut().shutdown()).await?;
    info!("Sent {} scores", sent);
    Ok(sent)
}
