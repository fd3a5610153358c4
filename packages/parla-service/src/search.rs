use qdrant_client::qdrant::{
	Condition, Filter, Query, QueryPointsBuilder, ScoredPoint, point_id::PointIdOptions,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ParlaService, ServiceError, ServiceResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarNotesRequest {
	pub user_id: String,
	pub query: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarNotesResponse {
	pub notes: Vec<SimilarNote>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimilarNote {
	pub note_id: Uuid,
	pub score: f32,
}

impl ParlaService {
	/// Finds the notes closest to a free-text query, restricted to the
	/// caller's own notes. The owner filter is built here from the `user_id`
	/// argument, so no call path can query without it.
	pub async fn search_notes(
		&self,
		req: SimilarNotesRequest,
	) -> ServiceResult<SimilarNotesResponse> {
		let user_id = req.user_id.trim();
		let query = fold_newlines(&req.query);

		if user_id.is_empty() || query.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "user_id and query are required.".to_string(),
			});
		}

		let texts = vec![query];
		let embedded =
			self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;
		let vector = embedded.into_iter().next().ok_or_else(|| ServiceError::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(ServiceError::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		let filter = Filter::must([Condition::matches("user_id", user_id.to_string())]);
		let search = QueryPointsBuilder::new(self.qdrant.collection.clone())
			.query(Query::new_nearest(vector))
			.filter(filter)
			.limit(self.cfg.search.limit as u64);
		let response = self
			.qdrant
			.client
			.query(search)
			.await
			.map_err(|err| ServiceError::Qdrant { message: err.to_string() })?;

		Ok(SimilarNotesResponse {
			notes: response.result.iter().filter_map(scored_point_to_note).collect(),
		})
	}
}

fn scored_point_to_note(point: &ScoredPoint) -> Option<SimilarNote> {
	let point_id = point.id.as_ref()?;

	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) =>
			Uuid::parse_str(id).ok().map(|note_id| SimilarNote { note_id, score: point.score }),
		_ => None,
	}
}

pub(crate) fn fold_newlines(text: &str) -> String {
	text.replace(['\r', '\n'], " ").trim().to_string()
}
