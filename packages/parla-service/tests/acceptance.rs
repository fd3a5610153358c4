mod acceptance {
	use std::sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	};

	use serde_json::{Map, Value};
	use uuid::Uuid;

	use parla_config::{
		Config, EmbeddingProviderConfig, LlmProviderConfig, TranscriptionProviderConfig,
	};
	use parla_service::{
		BoxFuture, CreateNoteRequest, EmbeddingProvider, ExtractorProvider, ParlaService,
		Providers, TranscriptionProvider,
	};
	use parla_storage::{db::Db, models::PipelineJob, outbox, qdrant::QdrantStore, queries};
	use parla_testkit::TestDatabase;

	pub struct StubTranscription {
		pub transcript: String,
	}
	impl TranscriptionProvider for StubTranscription {
		fn transcribe<'a>(
			&'a self,
			_cfg: &'a TranscriptionProviderConfig,
			_audio_url: &'a str,
		) -> BoxFuture<'a, color_eyre::Result<String>> {
			let transcript = self.transcript.clone();

			Box::pin(async move { Ok(transcript) })
		}
	}

	pub struct StubEmbedding;
	impl EmbeddingProvider for StubEmbedding {
		fn embed<'a>(
			&'a self,
			cfg: &'a EmbeddingProviderConfig,
			texts: &'a [String],
		) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
			let vec = vec![1.0; cfg.dimensions as usize];

			Box::pin(async move { Ok(vec![vec; texts.len()]) })
		}
	}

	pub struct FailingEmbedding;
	impl EmbeddingProvider for FailingEmbedding {
		fn embed<'a>(
			&'a self,
			_cfg: &'a EmbeddingProviderConfig,
			_texts: &'a [String],
		) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
			Box::pin(async move { Err(color_eyre::eyre::eyre!("embedding endpoint is down")) })
		}
	}

	pub struct StubExtractor {
		pub calls: Arc<AtomicUsize>,
		pub payload: Value,
	}
	impl ExtractorProvider for StubExtractor {
		fn extract<'a>(
			&'a self,
			_cfg: &'a LlmProviderConfig,
			_messages: &'a [Value],
		) -> BoxFuture<'a, color_eyre::Result<Value>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let payload = self.payload.clone();

			Box::pin(async move { Ok(payload) })
		}
	}

	/// Deletes every note while the model call is in flight, recreating the
	/// window between the job's note fetch and its patch.
	pub struct NoteDeletingExtractor {
		pub pool: sqlx::PgPool,
		pub payload: Value,
	}
	impl ExtractorProvider for NoteDeletingExtractor {
		fn extract<'a>(
			&'a self,
			_cfg: &'a LlmProviderConfig,
			_messages: &'a [Value],
		) -> BoxFuture<'a, color_eyre::Result<Value>> {
			Box::pin(async move {
				sqlx::query("DELETE FROM notes").execute(&self.pool).await?;

				Ok(self.payload.clone())
			})
		}
	}

	pub struct FailingExtractor;
	impl ExtractorProvider for FailingExtractor {
		fn extract<'a>(
			&'a self,
			_cfg: &'a LlmProviderConfig,
			_messages: &'a [Value],
		) -> BoxFuture<'a, color_eyre::Result<Value>> {
			Box::pin(async move { Err(color_eyre::eyre::eyre!("model endpoint is down")) })
		}
	}

	pub async fn test_db() -> Option<TestDatabase> {
		let base_dsn = parla_testkit::env_dsn()?;
		let db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");

		Some(db)
	}

	pub fn test_config(dsn: String, collection: String) -> Config {
		Config {
			service: parla_config::Service {
				http_bind: "127.0.0.1:0".to_string(),
				log_level: "info".to_string(),
			},
			storage: parla_config::Storage {
				postgres: parla_config::Postgres { dsn, pool_max_conns: 2 },
				qdrant: parla_config::Qdrant {
					url: "http://localhost:6334".to_string(),
					collection,
					vector_dim: 8,
				},
			},
			providers: parla_config::Providers {
				transcription: TranscriptionProviderConfig {
					provider_id: "p".to_string(),
					api_base: "http://localhost".to_string(),
					api_key: "key".to_string(),
					path: "/".to_string(),
					model: "whisper".to_string(),
					timeout_ms: 1_000,
					default_headers: Map::new(),
				},
				llm_extractor: LlmProviderConfig {
					provider_id: "p".to_string(),
					api_base: "http://localhost".to_string(),
					api_key: "key".to_string(),
					path: "/".to_string(),
					model: "m".to_string(),
					temperature: 0.2,
					max_tokens: 1_024,
					timeout_ms: 1_000,
					default_headers: Map::new(),
				},
				embedding: EmbeddingProviderConfig {
					provider_id: "p".to_string(),
					api_base: "http://localhost".to_string(),
					api_key: "key".to_string(),
					path: "/".to_string(),
					model: "e".to_string(),
					dimensions: 8,
					timeout_ms: 1_000,
					default_headers: Map::new(),
				},
			},
			search: parla_config::Search { limit: 16 },
			worker: parla_config::Worker { poll_interval_ms: 50, claim_lease_seconds: 30 },
		}
	}

	pub async fn build_service(cfg: Config, providers: Providers) -> ParlaService {
		let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect.");

		db.ensure_schema().await.expect("Failed to ensure schema.");

		let qdrant = QdrantStore::new(&cfg.storage.qdrant).expect("Failed to create Qdrant store.");

		ParlaService::with_providers(cfg, db, qdrant, providers)
	}

	pub async fn claim_job(service: &ParlaService, kind: &str) -> PipelineJob {
		loop {
			let job = outbox::fetch_next_job(
				&service.db,
				time::OffsetDateTime::now_utc(),
				service.cfg.worker.claim_lease_seconds,
			)
			.await
			.expect("Failed to claim job.")
			.expect("Expected a runnable job.");

			if job.kind == kind {
				return job;
			}

			outbox::mark_done(&service.db, job.job_id).await.expect("Failed to finish job.");
		}
	}

	pub async fn create_note(service: &ParlaService, user_id: &str) -> Uuid {
		service
			.create_note(CreateNoteRequest {
				user_id: user_id.to_string(),
				audio_url: "https://files.example/recording.mp3".to_string(),
			})
			.await
			.expect("Failed to create note.")
			.note_id
	}

	#[tokio::test]
	#[ignore = "Requires external Postgres. Set PARLA_PG_DSN to run."]
	async fn transcription_job_saves_transcript_and_schedules_followups() {
		let Some(test_db) = test_db().await else {
			eprintln!("Skipping; set PARLA_PG_DSN to run this test.");

			return;
		};
		let providers = Providers::new(
			Arc::new(StubTranscription { transcript: "hola, yo soy triste".to_string() }),
			Arc::new(FailingExtractor),
			Arc::new(StubEmbedding),
		);
		let cfg = test_config(test_db.dsn().to_string(), "parla_test".to_string());
		let service = build_service(cfg, providers).await;
		let note_id = create_note(&service, "user-1").await;
		let job = claim_job(&service, outbox::KIND_TRANSCRIBE).await;

		service.run_job(&job).await.expect("Transcription job failed.");
		outbox::mark_done(&service.db, job.job_id).await.expect("Failed to finish job.");

		let note = queries::fetch_note(&service.db, note_id)
			.await
			.expect("Failed to fetch note.")
			.expect("Note is missing.");

		assert_eq!(note.transcription.as_deref(), Some("hola, yo soy triste"));
		assert!(!note.generating_transcript);
		assert!(note.generating_title);

		let kinds: Vec<String> =
			sqlx::query_scalar("SELECT kind FROM pipeline_jobs WHERE note_id = $1 ORDER BY kind")
				.bind(note_id)
				.fetch_all(&service.db.pool)
				.await
				.expect("Failed to list jobs.");

		assert!(kinds.contains(&outbox::KIND_EXTRACT.to_string()));
		assert!(kinds.contains(&outbox::KIND_EMBED.to_string()));

		test_db.cleanup().await.expect("Failed to cleanup test database.");
	}

	#[tokio::test]
	#[ignore = "Requires external Postgres. Set PARLA_PG_DSN to run."]
	async fn extraction_saves_feedback_and_owner_scoped_action_items() {
		let Some(test_db) = test_db().await else {
			eprintln!("Skipping; set PARLA_PG_DSN to run this test.");

			return;
		};
		let extractor = StubExtractor {
			calls: Arc::new(AtomicUsize::new(0)),
			payload: serde_json::json!({
				"title": "Lesson in Spanish: Feelings",
				"summary": "One mistake with ser and estar.",
				"actionItems": [
					"'Estar' should be used instead of 'ser'. Original phrase: 'yo soy triste', correct phrase: 'yo estoy triste'.",
				]
			}),
		};
		let providers = Providers::new(
			Arc::new(StubTranscription { transcript: "yo soy triste".to_string() }),
			Arc::new(extractor),
			Arc::new(StubEmbedding),
		);
		let cfg = test_config(test_db.dsn().to_string(), "parla_test".to_string());
		let service = build_service(cfg, providers).await;
		let note_id = create_note(&service, "user-1").await;
		let transcribe = claim_job(&service, outbox::KIND_TRANSCRIBE).await;

		service.run_job(&transcribe).await.expect("Transcription job failed.");
		outbox::mark_done(&service.db, transcribe.job_id).await.expect("Failed to finish job.");

		let extract = claim_job(&service, outbox::KIND_EXTRACT).await;

		service.run_job(&extract).await.expect("Extraction job failed.");
		outbox::mark_done(&service.db, extract.job_id).await.expect("Failed to finish job.");

		let note = queries::fetch_note(&service.db, note_id)
			.await
			.expect("Failed to fetch note.")
			.expect("Note is missing.");

		assert_eq!(note.title.as_deref(), Some("Lesson in Spanish: Feelings"));
		assert!(!note.generating_title);
		assert!(!note.generating_action_items);

		let items = queries::list_action_items_for_note(&service.db, note_id)
			.await
			.expect("Failed to list action items.");

		assert_eq!(items.len(), 1);
		assert_eq!(items[0].user_id, "user-1");

		// Re-running the same extraction appends a fresh batch.
		service.run_job(&extract).await.expect("Repeated extraction job failed.");

		let items = queries::list_action_items_for_note(&service.db, note_id)
			.await
			.expect("Failed to list action items.");

		assert_eq!(items.len(), 2);

		test_db.cleanup().await.expect("Failed to cleanup test database.");
	}

	#[tokio::test]
	#[ignore = "Requires external Postgres. Set PARLA_PG_DSN to run."]
	async fn extraction_failure_falls_back_to_sentinels() {
		let Some(test_db) = test_db().await else {
			eprintln!("Skipping; set PARLA_PG_DSN to run this test.");

			return;
		};
		let providers = Providers::new(
			Arc::new(StubTranscription { transcript: "I is sad.".to_string() }),
			Arc::new(FailingExtractor),
			Arc::new(StubEmbedding),
		);
		let cfg = test_config(test_db.dsn().to_string(), "parla_test".to_string());
		let service = build_service(cfg, providers).await;
		let note_id = create_note(&service, "user-1").await;
		let transcribe = claim_job(&service, outbox::KIND_TRANSCRIBE).await;

		service.run_job(&transcribe).await.expect("Transcription job failed.");
		outbox::mark_done(&service.db, transcribe.job_id).await.expect("Failed to finish job.");

		let extract = claim_job(&service, outbox::KIND_EXTRACT).await;

		// The sentinel recovery means the job itself still succeeds.
		service.run_job(&extract).await.expect("Extraction job failed.");
		outbox::mark_done(&service.db, extract.job_id).await.expect("Failed to finish job.");

		let note = queries::fetch_note(&service.db, note_id)
			.await
			.expect("Failed to fetch note.")
			.expect("Note is missing.");

		assert_eq!(note.title.as_deref(), Some("Title"));
		assert_eq!(note.summary.as_deref(), Some("Summary failed to generate"));
		assert!(!note.generating_title);
		assert!(!note.generating_action_items);

		let items = queries::list_action_items_for_note(&service.db, note_id)
			.await
			.expect("Failed to list action items.");

		assert!(items.is_empty());

		test_db.cleanup().await.expect("Failed to cleanup test database.");
	}

	#[tokio::test]
	#[ignore = "Requires external Postgres. Set PARLA_PG_DSN to run."]
	async fn embedding_failure_is_recorded_on_the_job_row() {
		let Some(test_db) = test_db().await else {
			eprintln!("Skipping; set PARLA_PG_DSN to run this test.");

			return;
		};
		let providers = Providers::new(
			Arc::new(StubTranscription { transcript: "hola".to_string() }),
			Arc::new(FailingExtractor),
			Arc::new(FailingEmbedding),
		);
		let cfg = test_config(test_db.dsn().to_string(), "parla_test".to_string());
		let service = build_service(cfg, providers).await;
		let note_id = create_note(&service, "user-1").await;
		let transcribe = claim_job(&service, outbox::KIND_TRANSCRIBE).await;

		service.run_job(&transcribe).await.expect("Transcription job failed.");
		outbox::mark_done(&service.db, transcribe.job_id).await.expect("Failed to finish job.");

		let embed = claim_job(&service, outbox::KIND_EMBED).await;
		let err = service.run_job(&embed).await.expect_err("Embedding job should fail.");

		outbox::mark_failed(&service.db, embed.job_id, embed.attempts, &err.to_string())
			.await
			.expect("Failed to record job failure.");

		let (status, last_error): (String, Option<String>) = sqlx::query_as(
			"SELECT status, last_error FROM pipeline_jobs WHERE job_id = $1",
		)
		.bind(embed.job_id)
		.fetch_one(&service.db.pool)
		.await
		.expect("Failed to fetch job row.");

		assert_eq!(status, "FAILED");
		assert!(last_error.unwrap_or_default().contains("embedding endpoint is down"));
		assert!(
			queries::fetch_note(&service.db, note_id)
				.await
				.expect("Failed to fetch note.")
				.expect("Note is missing.")
				.embedding
				.is_none()
		);

		test_db.cleanup().await.expect("Failed to cleanup test database.");
	}

	#[tokio::test]
	#[ignore = "Requires external Postgres. Set PARLA_PG_DSN to run."]
	async fn extraction_aborts_when_note_vanishes_mid_job() {
		let Some(test_db) = test_db().await else {
			eprintln!("Skipping; set PARLA_PG_DSN to run this test.");

			return;
		};
		let cfg = test_config(test_db.dsn().to_string(), "parla_test".to_string());
		let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect.");

		db.ensure_schema().await.expect("Failed to ensure schema.");

		let extractor = NoteDeletingExtractor {
			pool: db.pool.clone(),
			payload: serde_json::json!({
				"title": "Lesson in Spanish: Feelings",
				"summary": "One mistake.",
				"actionItems": ["A grammar correction."]
			}),
		};
		let providers = Providers::new(
			Arc::new(StubTranscription { transcript: "yo soy triste".to_string() }),
			Arc::new(extractor),
			Arc::new(StubEmbedding),
		);
		let qdrant = QdrantStore::new(&cfg.storage.qdrant).expect("Failed to create Qdrant store.");
		let service = ParlaService::with_providers(cfg, db, qdrant, providers);
		let note_id = create_note(&service, "user-1").await;
		let transcribe = claim_job(&service, outbox::KIND_TRANSCRIBE).await;

		service.run_job(&transcribe).await.expect("Transcription job failed.");
		outbox::mark_done(&service.db, transcribe.job_id).await.expect("Failed to finish job.");

		let extract = claim_job(&service, outbox::KIND_EXTRACT).await;

		// The note disappears during the model call; the job must still
		// succeed and must not insert items for the vanished note.
		service.run_job(&extract).await.expect("Extraction job failed.");

		assert!(
			queries::fetch_note(&service.db, note_id)
				.await
				.expect("Failed to fetch note.")
				.is_none()
		);

		let items = queries::list_action_items_for_note(&service.db, note_id)
			.await
			.expect("Failed to list action items.");

		assert!(items.is_empty(), "no action item may outlive its note");

		test_db.cleanup().await.expect("Failed to cleanup test database.");
	}

	#[tokio::test]
	#[ignore = "Requires external Postgres and Qdrant. Set PARLA_PG_DSN and PARLA_QDRANT_URL to run."]
	async fn similarity_search_is_scoped_to_the_caller() {
		let Some(test_db) = test_db().await else {
			eprintln!("Skipping; set PARLA_PG_DSN to run this test.");

			return;
		};
		let Some(qdrant_url) = parla_testkit::env_qdrant_url() else {
			eprintln!("Skipping; set PARLA_QDRANT_URL to run this test.");

			return;
		};
		let providers = Providers::new(
			Arc::new(StubTranscription { transcript: "hola como estas".to_string() }),
			Arc::new(FailingExtractor),
			Arc::new(StubEmbedding),
		);
		let collection = test_db.collection_name("parla_acceptance");
		let mut cfg = test_config(test_db.dsn().to_string(), collection);

		cfg.storage.qdrant.url = qdrant_url;

		let service = build_service(cfg, providers).await;

		service.qdrant.ensure_collection().await.expect("Failed to ensure collection.");

		let note_a = create_note(&service, "user-1").await;
		let _note_b = create_note(&service, "user-2").await;

		for _ in 0..2 {
			let job = claim_job(&service, outbox::KIND_TRANSCRIBE).await;

			service.run_job(&job).await.expect("Transcription job failed.");
			outbox::mark_done(&service.db, job.job_id).await.expect("Failed to finish job.");
		}
		for _ in 0..2 {
			let job = claim_job(&service, outbox::KIND_EMBED).await;

			service.run_job(&job).await.expect("Embedding job failed.");
			outbox::mark_done(&service.db, job.job_id).await.expect("Failed to finish job.");
		}

		let response = service
			.search_notes(parla_service::SimilarNotesRequest {
				user_id: "user-1".to_string(),
				query: "como estas".to_string(),
			})
			.await
			.expect("Search failed.");

		assert!(!response.notes.is_empty());
		assert!(response.notes.len() <= 16);
		assert!(response.notes.iter().all(|note| note.note_id == note_a));

		test_db.cleanup().await.expect("Failed to cleanup test database.");
	}

	#[tokio::test]
	#[ignore = "Requires external Postgres. Set PARLA_PG_DSN to run."]
	async fn remove_action_item_deletes_exactly_one_owned_row() {
		let Some(test_db) = test_db().await else {
			eprintln!("Skipping; set PARLA_PG_DSN to run this test.");

			return;
		};
		let extractor = StubExtractor {
			calls: Arc::new(AtomicUsize::new(0)),
			payload: serde_json::json!({
				"title": "Lesson in Spanish: Feelings",
				"summary": "Two mistakes.",
				"actionItems": ["First mistake.", "Second mistake."]
			}),
		};
		let providers = Providers::new(
			Arc::new(StubTranscription { transcript: "yo soy triste".to_string() }),
			Arc::new(extractor),
			Arc::new(StubEmbedding),
		);
		let cfg = test_config(test_db.dsn().to_string(), "parla_test".to_string());
		let service = build_service(cfg, providers).await;
		let note_id = create_note(&service, "user-1").await;
		let transcribe = claim_job(&service, outbox::KIND_TRANSCRIBE).await;

		service.run_job(&transcribe).await.expect("Transcription job failed.");
		outbox::mark_done(&service.db, transcribe.job_id).await.expect("Failed to finish job.");

		let extract = claim_job(&service, outbox::KIND_EXTRACT).await;

		service.run_job(&extract).await.expect("Extraction job failed.");

		let items = queries::list_action_items_for_note(&service.db, note_id)
			.await
			.expect("Failed to list action items.");

		assert_eq!(items.len(), 2);

		// Another user cannot delete the row.
		let foreign = service
			.remove_action_item(parla_service::RemoveActionItemRequest {
				action_item_id: items[0].action_item_id,
				user_id: "user-2".to_string(),
			})
			.await;

		assert!(foreign.is_err());

		let removed = service
			.remove_action_item(parla_service::RemoveActionItemRequest {
				action_item_id: items[0].action_item_id,
				user_id: "user-1".to_string(),
			})
			.await
			.expect("Failed to remove action item.");

		assert!(removed.removed);

		let items = queries::list_action_items_for_note(&service.db, note_id)
			.await
			.expect("Failed to list action items.");

		assert_eq!(items.len(), 1);

		test_db.cleanup().await.expect("Failed to cleanup test database.");
	}
}
