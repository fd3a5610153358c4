pub mod worker;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use parla_service::ParlaService;
use parla_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = parla_cli::VERSION,
	rename_all = "kebab",
	styles = parla_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = parla_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;

	qdrant.ensure_collection().await?;

	let service = ParlaService::new(config, db, qdrant);

	worker::run_worker(service).await
}
