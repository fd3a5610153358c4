use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use parla_storage::{models::Note, outbox, queries};

use crate::{ParlaService, ServiceError, ServiceResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateNoteRequest {
	pub user_id: String,
	pub audio_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateNoteResponse {
	pub note_id: Uuid,
}

impl ParlaService {
	/// Records a finished recording and schedules transcription. The note row
	/// and its first pipeline job commit together, so a visible note always
	/// has a job that will eventually clear its progress flags.
	pub async fn create_note(&self, req: CreateNoteRequest) -> ServiceResult<CreateNoteResponse> {
		let user_id = req.user_id.trim();
		let audio_url = req.audio_url.trim();

		if user_id.is_empty() || audio_url.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "user_id and audio_url are required.".to_string(),
			});
		}

		let now = OffsetDateTime::now_utc();
		let note = Note {
			note_id: Uuid::new_v4(),
			user_id: user_id.to_string(),
			audio_url: audio_url.to_string(),
			transcription: None,
			title: None,
			summary: None,
			embedding: None,
			translation: None,
			description: None,
			pronunciation: None,
			generating_transcript: true,
			generating_title: true,
			generating_action_items: true,
			created_at: now,
			updated_at: now,
		};

		let mut tx = self.db.pool.begin().await?;

		queries::insert_note_tx(&mut tx, &note).await?;
		outbox::enqueue_job_tx(&mut tx, note.note_id, outbox::KIND_TRANSCRIBE, serde_json::json!({}))
			.await?;
		tx.commit().await?;

		tracing::info!(note_id = %note.note_id, "Note created. Transcription scheduled.");

		Ok(CreateNoteResponse { note_id: note.note_id })
	}
}
