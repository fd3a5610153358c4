use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parla_storage::{outbox, queries};

use crate::{ParlaService, ServiceError, ServiceResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TermLookupRequest {
	pub note_id: Uuid,
	pub user_id: String,
	pub input: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TermLookupResponse {
	pub job_id: Uuid,
}

impl ParlaService {
	/// Schedules a word lookup against a note's transcript. The actual LLM
	/// call runs in the pipeline; callers poll the note for the result.
	pub async fn lookup_term(&self, req: TermLookupRequest) -> ServiceResult<TermLookupResponse> {
		let input = req.input.trim();

		if input.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "input is required.".to_string(),
			});
		}

		let note = queries::fetch_note(&self.db, req.note_id).await?;

		match note {
			Some(note) if note.user_id == req.user_id => {
				if note.transcription.is_none() {
					return Err(ServiceError::InvalidRequest {
						message: "Note has no transcript yet.".to_string(),
					});
				}

				let job_id = outbox::enqueue_job(
					&self.db,
					req.note_id,
					outbox::KIND_LOOKUP,
					serde_json::json!({ "input": input }),
				)
				.await?;

				Ok(TermLookupResponse { job_id })
			},
			_ => Err(ServiceError::NotFound {
				message: format!("Note {} was not found.", req.note_id),
			}),
		}
	}
}
