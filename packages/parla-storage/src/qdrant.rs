use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
		PointStruct, UpsertPointsBuilder, Value, VectorParamsBuilder,
	},
};
use uuid::Uuid;

use crate::Result;

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &parla_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the note collection and the `user_id` payload index on first
	/// start. The index backs the per-user search filter.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(&self.collection).await? {
			return Ok(());
		}

		self.client
			.create_collection(
				CreateCollectionBuilder::new(&self.collection).vectors_config(
					VectorParamsBuilder::new(self.vector_dim as u64, Distance::Cosine),
				),
			)
			.await?;
		self.client
			.create_field_index(CreateFieldIndexCollectionBuilder::new(
				&self.collection,
				"user_id",
				FieldType::Keyword,
			))
			.await?;

		Ok(())
	}

	pub async fn upsert_note(&self, note_id: Uuid, user_id: &str, vector: Vec<f32>) -> Result<()> {
		let mut payload_map = HashMap::new();

		payload_map.insert("note_id".to_string(), Value::from(note_id.to_string()));
		payload_map.insert("user_id".to_string(), Value::from(user_id.to_string()));

		let point =
			PointStruct::new(note_id.to_string(), vector, Payload::from(payload_map));
		let upsert = UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}
}
