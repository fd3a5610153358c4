use std::time::Duration;

use color_eyre::Result;
use time::OffsetDateTime;

use parla_service::ParlaService;
use parla_storage::outbox;

/// Polls the job table forever. Each claimed job runs to completion before
/// the next claim; the claim lease releases jobs a crashed worker left behind.
pub async fn run_worker(service: ParlaService) -> Result<()> {
	let poll_interval = Duration::from_millis(service.cfg.worker.poll_interval_ms);

	tracing::info!(
		poll_interval_ms = service.cfg.worker.poll_interval_ms,
		"Pipeline worker started."
	);

	loop {
		match process_one(&service).await {
			Ok(true) => continue,
			Ok(false) => tokio::time::sleep(poll_interval).await,
			Err(err) => {
				tracing::error!(error = %err, "Job processing failed.");
				tokio::time::sleep(poll_interval).await;
			},
		}
	}
}

/// Claims and runs at most one job. Returns whether a job was claimed, so the
/// caller only sleeps on an empty queue.
async fn process_one(service: &ParlaService) -> Result<bool> {
	let now = OffsetDateTime::now_utc();
	let Some(job) = outbox::fetch_next_job(
		&service.db,
		now,
		service.cfg.worker.claim_lease_seconds,
	)
	.await?
	else {
		return Ok(false);
	};

	tracing::debug!(job_id = %job.job_id, kind = %job.kind, note_id = %job.note_id, "Job claimed.");

	match service.run_job(&job).await {
		Ok(()) => outbox::mark_done(&service.db, job.job_id).await?,
		Err(err) => {
			tracing::warn!(job_id = %job.job_id, kind = %job.kind, error = %err, "Job failed.");
			outbox::mark_failed(&service.db, job.job_id, job.attempts, &err.to_string()).await?;
		},
	}

	Ok(true)
}
