use serde_json::Value;
use sqlx::{Executor, Postgres, Transaction};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Result, db::Db, models::PipelineJob};

pub const KIND_TRANSCRIBE: &str = "TRANSCRIBE";
pub const KIND_EXTRACT: &str = "EXTRACT";
pub const KIND_EMBED: &str = "EMBED";
pub const KIND_LOOKUP: &str = "LOOKUP";

const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_JOB_ERROR_CHARS: usize = 1_024;

pub async fn enqueue_job(db: &Db, note_id: Uuid, kind: &str, payload: Value) -> Result<Uuid> {
	enqueue_job_exec(&db.pool, note_id, kind, payload).await
}

pub async fn enqueue_job_tx(
	tx: &mut Transaction<'_, Postgres>,
	note_id: Uuid,
	kind: &str,
	payload: Value,
) -> Result<Uuid> {
	enqueue_job_exec(&mut **tx, note_id, kind, payload).await
}

/// Claims the next runnable job. The claim moves `available_at` forward by a
/// lease so a crashed worker releases the job instead of holding it forever.
pub async fn fetch_next_job(
	db: &Db,
	now: OffsetDateTime,
	lease_seconds: i64,
) -> Result<Option<PipelineJob>> {
	let mut tx = db.pool.begin().await?;
	let row: Option<PipelineJob> = sqlx::query_as(
		"\
SELECT *
FROM pipeline_jobs
WHERE status IN ('PENDING', 'FAILED') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.bind(now)
	.fetch_optional(&mut *tx)
	.await?;

	let job = if let Some(mut job) = row {
		let lease_until = now + Duration::seconds(lease_seconds);

		sqlx::query("UPDATE pipeline_jobs SET available_at = $1, updated_at = $2 WHERE job_id = $3")
			.bind(lease_until)
			.bind(now)
			.bind(job.job_id)
			.execute(&mut *tx)
			.await?;

		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn mark_done(db: &Db, job_id: Uuid) -> Result<()> {
	let now = OffsetDateTime::now_utc();

	sqlx::query("UPDATE pipeline_jobs SET status = 'DONE', updated_at = $1 WHERE job_id = $2")
		.bind(now)
		.bind(job_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn mark_failed(db: &Db, job_id: Uuid, attempts: i32, error_text: &str) -> Result<()> {
	let next_attempts = attempts.saturating_add(1);
	let backoff = backoff_for_attempt(next_attempts);
	let now = OffsetDateTime::now_utc();
	let available_at = now + backoff;
	let error_text = sanitize_job_error(error_text);

	sqlx::query(
		"\
UPDATE pipeline_jobs
SET status = 'FAILED',
	attempts = $1,
	last_error = $2,
	available_at = $3,
	updated_at = $4
WHERE job_id = $5",
	)
	.bind(next_attempts)
	.bind(error_text)
	.bind(available_at)
	.bind(now)
	.bind(job_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub fn backoff_for_attempt(attempt: i32) -> Duration {
	let attempts = attempt.max(1) as u32;
	let exp = attempts.saturating_sub(1).min(6);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);
	let capped = base.min(MAX_BACKOFF_MS);

	Duration::milliseconds(capped)
}

/// Provider errors can echo request headers. Redact anything that looks like
/// a credential before it lands in the job row.
pub fn sanitize_job_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = "[REDACTED]".to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		for key in ["api_key", "apikey", "password", "secret", "token"] {
			if lowered.contains(key) && (lowered.contains('=') || lowered.contains(':')) {
				let sep = if raw.contains('=') { '=' } else { ':' };
				let prefix = match raw.split(sep).next() {
					Some(prefix) => prefix,
					None => raw,
				};

				word = format!("{prefix}{sep}[REDACTED]");

				break;
			}
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_JOB_ERROR_CHARS {
		out = out.chars().take(MAX_JOB_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}

async fn enqueue_job_exec<'e, E>(
	executor: E,
	note_id: Uuid,
	kind: &str,
	payload: Value,
) -> Result<Uuid>
where
	E: Executor<'e, Database = Postgres>,
{
	let job_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO pipeline_jobs (job_id, note_id, kind, payload, status)
VALUES ($1, $2, $3, $4, 'PENDING')",
	)
	.bind(job_id)
	.bind(note_id)
	.bind(kind)
	.bind(payload)
	.execute(executor)
	.await?;

	Ok(job_id)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backoff_grows_then_caps() {
		assert_eq!(backoff_for_attempt(1), Duration::milliseconds(500));
		assert_eq!(backoff_for_attempt(2), Duration::milliseconds(1_000));
		assert_eq!(backoff_for_attempt(4), Duration::milliseconds(4_000));
		assert_eq!(backoff_for_attempt(20), Duration::milliseconds(30_000));
	}

	#[test]
	fn bearer_credentials_are_redacted() {
		let sanitized = sanitize_job_error("401 from Bearer sk-super-secret endpoint");

		assert!(!sanitized.contains("sk-super-secret"));
		assert!(sanitized.contains("[REDACTED]"));
	}

	#[test]
	fn key_value_credentials_are_redacted() {
		let sanitized = sanitize_job_error("request failed: api_key=abc123 rejected");

		assert!(!sanitized.contains("abc123"));
		assert!(sanitized.contains("api_key=[REDACTED]"));
	}

	#[test]
	fn long_errors_are_truncated() {
		let long = "x".repeat(5_000);
		let sanitized = sanitize_job_error(&long);

		assert!(sanitized.chars().count() <= 1_024 + 3);
		assert!(sanitized.ends_with("..."));
	}
}
