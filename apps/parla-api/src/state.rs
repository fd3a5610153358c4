use std::sync::Arc;

use parla_service::ParlaService;
use parla_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ParlaService>,
}

impl AppState {
	pub async fn new(config: parla_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collection().await?;

		let service = ParlaService::new(config, db, qdrant);

		Ok(Self { service: Arc::new(service) })
	}
}
