/// The full schema, rendered as one statement batch. Kept idempotent so
/// `ensure_schema` can run at every process start.
///
/// `action_items.note_id` deliberately carries no foreign key: parent
/// consistency is maintained by the write path, which copies `user_id` from
/// the note row it just read inside the same transaction.
pub fn render_schema() -> String {
	r#"
CREATE TABLE IF NOT EXISTS notes (
	note_id UUID PRIMARY KEY,
	user_id TEXT NOT NULL,
	audio_url TEXT NOT NULL,
	transcription TEXT,
	title TEXT,
	summary TEXT,
	embedding REAL[],
	translation TEXT,
	description TEXT,
	pronunciation TEXT,
	generating_transcript BOOLEAN NOT NULL DEFAULT TRUE,
	generating_title BOOLEAN NOT NULL DEFAULT TRUE,
	generating_action_items BOOLEAN NOT NULL DEFAULT TRUE,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS notes_user_created_idx
	ON notes (user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS action_items (
	action_item_id UUID PRIMARY KEY,
	note_id UUID NOT NULL,
	user_id TEXT NOT NULL,
	task TEXT NOT NULL,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS action_items_user_created_idx
	ON action_items (user_id, created_at DESC);

CREATE INDEX IF NOT EXISTS action_items_note_idx
	ON action_items (note_id);

CREATE TABLE IF NOT EXISTS pipeline_jobs (
	job_id UUID PRIMARY KEY,
	note_id UUID NOT NULL,
	kind TEXT NOT NULL,
	payload JSONB NOT NULL DEFAULT '{}'::jsonb,
	status TEXT NOT NULL DEFAULT 'PENDING',
	attempts INT NOT NULL DEFAULT 0,
	last_error TEXT,
	available_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS pipeline_jobs_claim_idx
	ON pipeline_jobs (status, available_at)
"#
	.to_string()
}
