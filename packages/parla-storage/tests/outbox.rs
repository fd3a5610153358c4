use time::OffsetDateTime;
use uuid::Uuid;

use parla_config::Postgres;
use parla_storage::{db::Db, outbox};
use parla_testkit::TestDatabase;

async fn bootstrap(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set PARLA_PG_DSN to run."]
async fn claimed_job_is_leased_and_markable() {
	let Some(base_dsn) = parla_testkit::env_dsn() else {
		eprintln!("Skipping claimed_job_is_leased_and_markable; set PARLA_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let note_id = Uuid::new_v4();

	outbox::enqueue_job(&db, note_id, outbox::KIND_TRANSCRIBE, serde_json::json!({}))
		.await
		.expect("Failed to enqueue job.");

	let now = OffsetDateTime::now_utc();
	let job = outbox::fetch_next_job(&db, now, 30)
		.await
		.expect("Failed to fetch job.")
		.expect("Expected a claimable job.");

	assert_eq!(job.note_id, note_id);
	assert_eq!(job.kind, outbox::KIND_TRANSCRIBE);
	// The lease hides the job from a second claim at the same instant.
	assert!(
		outbox::fetch_next_job(&db, now, 30).await.expect("Failed to re-fetch.").is_none(),
		"leased job must not be claimable again"
	);

	outbox::mark_done(&db, job.job_id).await.expect("Failed to mark done.");

	let status: String = sqlx::query_scalar("SELECT status FROM pipeline_jobs WHERE job_id = $1")
		.bind(job.job_id)
		.fetch_one(&db.pool)
		.await
		.expect("Failed to read job status.");

	assert_eq!(status, "DONE");
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set PARLA_PG_DSN to run."]
async fn failed_job_records_error_and_backs_off() {
	let Some(base_dsn) = parla_testkit::env_dsn() else {
		eprintln!("Skipping failed_job_records_error_and_backs_off; set PARLA_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let note_id = Uuid::new_v4();

	outbox::enqueue_job(&db, note_id, outbox::KIND_EMBED, serde_json::json!({}))
		.await
		.expect("Failed to enqueue job.");

	let now = OffsetDateTime::now_utc();
	let job = outbox::fetch_next_job(&db, now, 30)
		.await
		.expect("Failed to fetch job.")
		.expect("Expected a claimable job.");

	outbox::mark_failed(&db, job.job_id, job.attempts, "embedding provider unavailable")
		.await
		.expect("Failed to mark failed.");

	let (status, attempts, last_error): (String, i32, Option<String>) = sqlx::query_as(
		"SELECT status, attempts, last_error FROM pipeline_jobs WHERE job_id = $1",
	)
	.bind(job.job_id)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to read job row.");

	assert_eq!(status, "FAILED");
	assert_eq!(attempts, 1);
	assert_eq!(last_error.as_deref(), Some("embedding provider unavailable"));
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
