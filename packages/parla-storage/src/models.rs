use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// One recorded practice session and the artifacts derived from it. The
/// `generating_*` flags are UI polling signals: raised when the note is
/// created and cleared exactly once by the pipeline stage that owns them.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Note {
	pub note_id: Uuid,
	pub user_id: String,
	pub audio_url: String,
	pub transcription: Option<String>,
	pub title: Option<String>,
	pub summary: Option<String>,
	pub embedding: Option<Vec<f32>>,
	pub translation: Option<String>,
	pub description: Option<String>,
	pub pronunciation: Option<String>,
	pub generating_transcript: bool,
	pub generating_title: bool,
	pub generating_action_items: bool,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// One grammar-feedback entry. `user_id` duplicates the parent note's owner
/// so the dashboard can list feedback without a join.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActionItem {
	pub action_item_id: Uuid,
	pub note_id: Uuid,
	pub user_id: String,
	pub task: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineJob {
	pub job_id: Uuid,
	pub note_id: Uuid,
	pub kind: String,
	pub payload: Value,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
