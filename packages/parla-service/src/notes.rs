use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use parla_storage::{models::Note, queries};

use crate::{ParlaService, ServiceError, ServiceResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteFetchRequest {
	pub note_id: Uuid,
	pub user_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListNotesRequest {
	pub user_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListNotesResponse {
	pub notes: Vec<NoteView>,
}

/// A note as callers see it. Raw embeddings stay server side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteView {
	pub note_id: Uuid,
	pub user_id: String,
	pub audio_url: String,
	pub transcription: Option<String>,
	pub title: Option<String>,
	pub summary: Option<String>,
	pub translation: Option<String>,
	pub description: Option<String>,
	pub pronunciation: Option<String>,
	pub generating_transcript: bool,
	pub generating_title: bool,
	pub generating_action_items: bool,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

impl From<Note> for NoteView {
	fn from(note: Note) -> Self {
		Self {
			note_id: note.note_id,
			user_id: note.user_id,
			audio_url: note.audio_url,
			transcription: note.transcription,
			title: note.title,
			summary: note.summary,
			translation: note.translation,
			description: note.description,
			pronunciation: note.pronunciation,
			generating_transcript: note.generating_transcript,
			generating_title: note.generating_title,
			generating_action_items: note.generating_action_items,
			created_at: note.created_at,
			updated_at: note.updated_at,
		}
	}
}

impl ParlaService {
	/// Fetches one note, scoped to its owner. A note that exists but belongs
	/// to another caller reads as not found rather than as forbidden.
	pub async fn fetch_note(&self, req: NoteFetchRequest) -> ServiceResult<NoteView> {
		let note = queries::fetch_note(&self.db, req.note_id).await?;

		match note {
			Some(note) if note.user_id == req.user_id => Ok(note.into()),
			_ => Err(ServiceError::NotFound {
				message: format!("Note {} was not found.", req.note_id),
			}),
		}
	}

	pub async fn list_notes(&self, req: ListNotesRequest) -> ServiceResult<ListNotesResponse> {
		let user_id = req.user_id.trim();

		if user_id.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "user_id is required.".to_string(),
			});
		}

		let notes = queries::list_notes(&self.db, user_id).await?;

		Ok(ListNotesResponse { notes: notes.into_iter().map(NoteView::from).collect() })
	}
}
