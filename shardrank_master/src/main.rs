use ::std::path::Path;

use ::shardrank_common::{
    config::{load_config, Args},
    dataset::load_dataset,
    error::Result,
    logging::init_tracing,
    tokio,
    tracing::info,
};
use ::shardrank_master::{Master, MasterConfig};

#[tokio::main]
/// Start shardrank master
async fn main() -> Result<()> {
    let Args { config_path } = Args::parse_args();
    let config: MasterConfig = load_config(&config_path)?;
    init_tracing(config.log_file.as_deref().map(Path::new))?;
    info!("Start shardrank master");

    let dataset = load_dataset(&config.dataset_path)?;
    info!("Loaded {} rows from {}", dataset.len(), config.dataset_path);

    let master = Master::bind(&config, dataset).await?;
    master.serve().await
}
