use ::std::{net::SocketAddr, num::NonZeroUsize, time::Duration};

use ::shardrank_common::{
    dataset::Row,
    error::Result,
    tokio::{
        self,
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::TcpStream,
    },
};
use ::shardrank_master::{coordinator::CoordinatorHandle, Master, MasterConfig};

/// Upper bound on any wait in these tests.
pub const PATIENCE: Duration = Duration::from_secs(10);

pub struct TestMaster {
    pub worker_addr: SocketAddr,
    pub query_addr: SocketAddr,
    pub coordinator: CoordinatorHandle,
}

pub fn config(
    max_workers: usize,
    registration_timeout_secs: Option<u64>,
    io_timeout_secs: u64,
) -> MasterConfig {
    MasterConfig {
        host: "127.0.0.1".to_owned(),
        worker_port: 0,
        query_port: 0,
        dataset_path: String::new(),
        max_workers: NonZeroUsize::new(max_workers).expect("at least one worker"),
        registration_timeout_secs,
        io_timeout_secs,
        log_file: None,
    }
}

/// Bind a master on ephemeral ports and serve it in the background.
pub async fn start_master(config: &MasterConfig, dataset: Vec<Row>) -> Result<TestMaster> {
    let master = Master::bind(config, dataset).await?;
    let test_master = TestMaster {
        worker_addr: master.worker_addr()?,
        query_addr: master.query_addr()?,
        coordinator: master.coordinator(),
    };
    tokio::spawn(master.serve());
    Ok(test_master)
}

/// `count` rows, row `i` rates product `Pi` with `i`.
pub fn dataset(count: usize) -> Vec<Row> {
    (1..=count)
        .map(|i| {
            [
                format!("r{}", i),
                format!("u{}", i),
                format!("P{}", i),
                "title".to_owned(),
                i.to_string(),
            ]
            .into_iter()
            .collect()
        })
        .collect()
}

/// A worker answering `rating * 0.2` for every row it receives.
/// Returns the lines it received before the end marker.
pub async fn fifth_worker(worker_addr: SocketAddr) -> Result<Vec<String>> {
    let stream = TcpStream::connect(worker_addr).await?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut received = vec![];
    let mut reply = String::new();
    while let Some(line) = lines.next_line().await? {
        if line == "END" {
            break;
        }
        let fields: Vec<&str> = line.split(',').collect();
        let rating: f64 = fields[4].parse().expect("numeric rating");
        reply.push_str(&format!("{},{:.2}\n", fields[2], rating * 0.2));
        received.push(line);
    }
    reply.push_str("END\n");
    writer.write_all(reply.as_bytes()).await?;
    Ok(received)
}

/// Ask the query port for the recommendations of `product_id`.
pub async fn query(query_addr: SocketAddr, product_id: &str) -> Result<String> {
    let stream = TcpStream::connect(query_addr).await?;
    let (reader, mut writer) = stream.into_split();
    writer
        .write_all(format!("{}\n", product_id).as_bytes())
        .await?;
    let mut reply = String::new();
    BufReader::new(reader).read_line(&mut reply).await?;
    Ok(reply)
}
