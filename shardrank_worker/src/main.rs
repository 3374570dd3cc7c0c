use ::std::path::Path;

use ::shardrank_common::{
    config::{load_config, Args},
    error::Result,
    logging::init_tracing,
    tokio,
    tracing::info,
};
use ::shardrank_worker::{run_worker, WorkerConfig};

#[tokio::main]
/// Start shardrank worker
async fn main() -> Result<()> {
    let Args { config_path } = Args::parse_args();
    let config: WorkerConfig = load_config(&config_path)?;
    init_tracing(config.log_file.as_deref().map(Path::new))?;
    info!("Start shardrank worker with {:?} scoring", config.scoring);

    let sent = run_worker(&config).await?;
    info!("Worker finished, {} scores sent", sent);
    Ok(())
}
