use sqlx::{Executor, Postgres, Transaction};
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{ActionItem, Note},
};

/// Inserts a note inside the caller's transaction. Note creation always
/// commits together with its first pipeline job, so there is no pool-level
/// variant.
pub async fn insert_note_tx(tx: &mut Transaction<'_, Postgres>, note: &Note) -> Result<()> {
	insert_note_exec(&mut **tx, note).await
}

pub async fn fetch_note(db: &Db, note_id: Uuid) -> Result<Option<Note>> {
	let note = sqlx::query_as("SELECT * FROM notes WHERE note_id = $1")
		.bind(note_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(note)
}

pub async fn list_notes(db: &Db, user_id: &str) -> Result<Vec<Note>> {
	let notes =
		sqlx::query_as("SELECT * FROM notes WHERE user_id = $1 ORDER BY created_at DESC")
			.bind(user_id)
			.fetch_all(&db.pool)
			.await?;

	Ok(notes)
}

/// Records the transcript and clears the transcription progress flag in one
/// statement; the flag never goes back to true for this note.
pub async fn save_transcript(db: &Db, note_id: Uuid, transcript: &str) -> Result<u64> {
	let result = sqlx::query(
		"\
UPDATE notes
SET transcription = $1,
	generating_transcript = FALSE,
	updated_at = now()
WHERE note_id = $2",
	)
	.bind(transcript)
	.bind(note_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

pub async fn save_summary(db: &Db, note_id: Uuid, title: &str, summary: &str) -> Result<u64> {
	let result = sqlx::query(
		"\
UPDATE notes
SET title = $1,
	summary = $2,
	generating_title = FALSE,
	updated_at = now()
WHERE note_id = $3",
	)
	.bind(title)
	.bind(summary)
	.bind(note_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

pub async fn clear_generating_action_items(db: &Db, note_id: Uuid) -> Result<()> {
	sqlx::query(
		"UPDATE notes SET generating_action_items = FALSE, updated_at = now() WHERE note_id = $1",
	)
	.bind(note_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn save_embedding(db: &Db, note_id: Uuid, vec: &[f32]) -> Result<u64> {
	let result =
		sqlx::query("UPDATE notes SET embedding = $1, updated_at = now() WHERE note_id = $2")
			.bind(vec)
			.bind(note_id)
			.execute(&db.pool)
			.await?;

	Ok(result.rows_affected())
}

pub async fn save_lookup(
	db: &Db,
	note_id: Uuid,
	translation: &str,
	description: &str,
	pronunciation: &str,
) -> Result<u64> {
	let result = sqlx::query(
		"\
UPDATE notes
SET translation = $1,
	description = $2,
	pronunciation = $3,
	updated_at = now()
WHERE note_id = $4",
	)
	.bind(translation)
	.bind(description)
	.bind(pronunciation)
	.bind(note_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

pub async fn insert_action_item(db: &Db, item: &ActionItem) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO action_items (action_item_id, note_id, user_id, task, created_at)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(item.action_item_id)
	.bind(item.note_id)
	.bind(item.user_id.as_str())
	.bind(item.task.as_str())
	.bind(item.created_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn list_action_items(db: &Db, user_id: &str) -> Result<Vec<ActionItem>> {
	let items =
		sqlx::query_as("SELECT * FROM action_items WHERE user_id = $1 ORDER BY created_at DESC")
			.bind(user_id)
			.fetch_all(&db.pool)
			.await?;

	Ok(items)
}

pub async fn list_action_items_for_note(db: &Db, note_id: Uuid) -> Result<Vec<ActionItem>> {
	let items =
		sqlx::query_as("SELECT * FROM action_items WHERE note_id = $1 ORDER BY created_at")
			.bind(note_id)
			.fetch_all(&db.pool)
			.await?;

	Ok(items)
}

/// Deletes one action item scoped to its owner; returns the number of rows
/// removed, which is 0 when the row is absent or owned by someone else.
pub async fn delete_action_item(db: &Db, action_item_id: Uuid, user_id: &str) -> Result<u64> {
	let result =
		sqlx::query("DELETE FROM action_items WHERE action_item_id = $1 AND user_id = $2")
			.bind(action_item_id)
			.bind(user_id)
			.execute(&db.pool)
			.await?;

	Ok(result.rows_affected())
}

async fn insert_note_exec<'e, E>(executor: E, note: &Note) -> Result<()>
where
	E: Executor<'e, Database = Postgres>,
{
	sqlx::query(
		"\
INSERT INTO notes (
	note_id,
	user_id,
	audio_url,
	transcription,
	title,
	summary,
	embedding,
	translation,
	description,
	pronunciation,
	generating_transcript,
	generating_title,
	generating_action_items,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
	)
	.bind(note.note_id)
	.bind(note.user_id.as_str())
	.bind(note.audio_url.as_str())
	.bind(note.transcription.as_deref())
	.bind(note.title.as_deref())
	.bind(note.summary.as_deref())
	.bind(note.embedding.as_deref())
	.bind(note.translation.as_deref())
	.bind(note.description.as_deref())
	.bind(note.pronunciation.as_deref())
	.bind(note.generating_transcript)
	.bind(note.generating_title)
	.bind(note.generating_action_items)
	.bind(note.created_at)
	.bind(note.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}
