use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use parla_storage::{
	models::{ActionItem, Note, PipelineJob},
	outbox, queries,
};

use crate::{ParlaService, ServiceError, ServiceResult, search::fold_newlines};

pub const TITLE_SENTINEL: &str = "Title";
pub const SUMMARY_SENTINEL: &str = "Summary failed to generate";
pub const TRANSLATION_SENTINEL: &str = "Translation failed to generate";
pub const DESCRIPTION_SENTINEL: &str = "Description failed to generate";
pub const PRONUNCIATION_SENTINEL: &str = "Pronunciation failed to generate";

/// Grammar feedback as the extractor must return it. `actionItems` keeps the
/// wire name the prompt asks for.
#[derive(Clone, Debug, Deserialize, Serialize)]
struct NoteExtraction {
	title: String,
	summary: String,
	#[serde(rename = "actionItems")]
	action_items: Vec<String>,
}

/// Word lookup as the extractor must return it. Some models misspell the
/// pronunciation key, so both spellings are accepted.
#[derive(Clone, Debug, Deserialize, Serialize)]
struct TermLookup {
	translation: String,
	description: String,
	#[serde(alias = "pronounciation")]
	pronunciation: String,
}

#[derive(Clone, Debug, Deserialize)]
struct LookupPayload {
	input: String,
}

impl ParlaService {
	/// Runs one claimed pipeline job to completion. `Ok` means the job is
	/// finished from the queue's point of view, including the sentinel
	/// recovery paths; `Err` asks the queue to record the failure and retry.
	pub async fn run_job(&self, job: &PipelineJob) -> ServiceResult<()> {
		match job.kind.as_str() {
			outbox::KIND_TRANSCRIBE => self.run_transcribe(job).await,
			outbox::KIND_EXTRACT => self.run_extract(job).await,
			outbox::KIND_EMBED => self.run_embed(job).await,
			outbox::KIND_LOOKUP => self.run_lookup(job).await,
			other => Err(ServiceError::InvalidRequest {
				message: format!("Unknown job kind: {other}."),
			}),
		}
	}

	async fn run_transcribe(&self, job: &PipelineJob) -> ServiceResult<()> {
		let Some(note) = queries::fetch_note(&self.db, job.note_id).await? else {
			tracing::warn!(note_id = %job.note_id, "Note vanished before transcription.");

			return Ok(());
		};
		let transcript = self
			.providers
			.transcription
			.transcribe(&self.cfg.providers.transcription, &note.audio_url)
			.await?;
		let updated = queries::save_transcript(&self.db, note.note_id, &transcript).await?;

		if updated == 0 {
			tracing::warn!(note_id = %note.note_id, "Note vanished before transcript patch.");

			return Ok(());
		}

		// Extraction and embedding proceed independently from here.
		outbox::enqueue_job(&self.db, note.note_id, outbox::KIND_EXTRACT, serde_json::json!({}))
			.await?;
		outbox::enqueue_job(&self.db, note.note_id, outbox::KIND_EMBED, serde_json::json!({}))
			.await?;

		tracing::info!(note_id = %note.note_id, "Transcript saved. Extraction and embedding scheduled.");

		Ok(())
	}

	async fn run_extract(&self, job: &PipelineJob) -> ServiceResult<()> {
		let Some(note) = queries::fetch_note(&self.db, job.note_id).await? else {
			tracing::warn!(note_id = %job.note_id, "Note vanished before extraction.");

			return Ok(());
		};
		let Some(transcript) = note.transcription.clone() else {
			tracing::warn!(note_id = %note.note_id, "Extraction ran before transcription.");

			return Ok(());
		};
		let messages = build_extraction_messages(&transcript);
		let extraction = match self
			.providers
			.extractor
			.extract(&self.cfg.providers.llm_extractor, &messages)
			.await
		{
			Ok(raw) => serde_json::from_value::<NoteExtraction>(raw).ok(),
			Err(err) => {
				tracing::warn!(note_id = %note.note_id, error = %err, "Extractor call failed.");

				None
			},
		};

		match extraction {
			Some(extraction) => self.apply_extraction(&note, extraction).await,
			// The note must leave its loading state even when the model lets
			// us down, so the failure patches sentinels and the job succeeds.
			None => self.apply_extraction_fallback(&note).await,
		}
	}

	async fn apply_extraction(&self, note: &Note, extraction: NoteExtraction) -> ServiceResult<()> {
		let updated =
			queries::save_summary(&self.db, note.note_id, &extraction.title, &extraction.summary)
				.await?;

		// The note can be deleted between the fetch and this patch. Action
		// items must never outlive their note, so stop before inserting any.
		if updated == 0 {
			tracing::warn!(note_id = %note.note_id, "Note vanished before summary patch.");

			return Ok(());
		}

		let now = OffsetDateTime::now_utc();

		for task in extraction.action_items {
			let item = ActionItem {
				action_item_id: Uuid::new_v4(),
				note_id: note.note_id,
				user_id: note.user_id.clone(),
				task,
				created_at: now,
			};

			queries::insert_action_item(&self.db, &item).await?;
		}

		queries::clear_generating_action_items(&self.db, note.note_id).await?;

		tracing::info!(note_id = %note.note_id, "Grammar feedback saved.");

		Ok(())
	}

	async fn apply_extraction_fallback(&self, note: &Note) -> ServiceResult<()> {
		let updated =
			queries::save_summary(&self.db, note.note_id, TITLE_SENTINEL, SUMMARY_SENTINEL).await?;

		if updated == 0 {
			tracing::warn!(note_id = %note.note_id, "Note vanished before sentinel patch.");

			return Ok(());
		}

		queries::clear_generating_action_items(&self.db, note.note_id).await?;

		tracing::warn!(note_id = %note.note_id, "Grammar feedback fell back to sentinels.");

		Ok(())
	}

	async fn run_embed(&self, job: &PipelineJob) -> ServiceResult<()> {
		let Some(note) = queries::fetch_note(&self.db, job.note_id).await? else {
			tracing::warn!(note_id = %job.note_id, "Note vanished before embedding.");

			return Ok(());
		};
		let Some(transcript) = note.transcription.clone() else {
			tracing::warn!(note_id = %note.note_id, "Embedding ran before transcription.");

			return Ok(());
		};
		let texts = vec![fold_newlines(&transcript)];
		let embedded =
			self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;
		let vector = embedded.into_iter().next().ok_or_else(|| ServiceError::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(ServiceError::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		let updated = queries::save_embedding(&self.db, note.note_id, &vector).await?;

		// A note deleted during the provider call must never reach the
		// search index.
		if updated == 0 {
			tracing::warn!(note_id = %note.note_id, "Note vanished before embedding patch.");

			return Ok(());
		}

		self.qdrant.upsert_note(note.note_id, &note.user_id, vector).await?;

		tracing::info!(note_id = %note.note_id, "Embedding saved and indexed.");

		Ok(())
	}

	async fn run_lookup(&self, job: &PipelineJob) -> ServiceResult<()> {
		let payload: LookupPayload =
			serde_json::from_value(job.payload.clone()).map_err(|_| ServiceError::InvalidRequest {
				message: "Lookup job payload is missing input.".to_string(),
			})?;
		let Some(note) = queries::fetch_note(&self.db, job.note_id).await? else {
			tracing::warn!(note_id = %job.note_id, "Note vanished before lookup.");

			return Ok(());
		};
		let Some(transcript) = note.transcription.clone() else {
			tracing::warn!(note_id = %note.note_id, "Lookup ran before transcription.");

			return Ok(());
		};
		let messages = build_lookup_messages(&payload.input, &transcript);
		let lookup = match self
			.providers
			.extractor
			.extract(&self.cfg.providers.llm_extractor, &messages)
			.await
		{
			Ok(raw) => serde_json::from_value::<TermLookup>(raw).ok(),
			Err(err) => {
				tracing::warn!(note_id = %note.note_id, error = %err, "Lookup call failed.");

				None
			},
		};
		let lookup = lookup.unwrap_or_else(|| TermLookup {
			translation: TRANSLATION_SENTINEL.to_string(),
			description: DESCRIPTION_SENTINEL.to_string(),
			pronunciation: PRONUNCIATION_SENTINEL.to_string(),
		});

		let updated = queries::save_lookup(
			&self.db,
			note.note_id,
			&lookup.translation,
			&lookup.description,
			&lookup.pronunciation,
		)
		.await?;

		if updated == 0 {
			tracing::warn!(note_id = %note.note_id, "Note vanished before lookup patch.");

			return Ok(());
		}

		tracing::info!(note_id = %note.note_id, "Lookup saved.");

		Ok(())
	}
}

fn build_extraction_messages(transcript: &str) -> Vec<Value> {
	let system_prompt = "This text is a transcript of someone participating in a language \
exchange or language lesson, where they are an active learner of the language, and the person \
on the other side of the call is a native speaker in that language. You are an expert, \
experienced grammar checker and are tasked to correct the learner's speaking so they can get \
better at the language. First, generate the title: provide a concise title for the transcript \
starting with 'Lesson in {language the transcript is in}' and ending with the topic of the \
lesson. For example, 'Lesson in English: Ordering food at a restaurant'. Second, provide a \
summary of the grammar errors they made. Third, provide a list of EVERY SINGLE grammar mistake \
the learner made in the transcript: describe each grammar error in detail, along with the \
original phrase AND the corrected phrase. However! If there are no grammar errors, write 'You \
had no grammar errors :).' Answer in JSON in the following format: \
{\"title\": string, \"summary\": string, \"actionItems\": [string, string, ...]}";

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": transcript }),
	]
}

fn build_lookup_messages(input: &str, transcript: &str) -> Vec<Value> {
	let system_prompt = "The first part of the user message (starting with 'Input:') is the word \
or expression the user typed into the search bar. The second part (starting with 'Transcript:') \
is the transcript of the user practicing speaking the language. Do not consider the transcript's \
content, just use it to determine the language the user is trying to learn. First, provide a few \
literal translations of the input, in order of descending popularity. If the input is English, \
translate it into the language of the transcript; if it is not English, translate it into \
English. Second, provide a description of the meaning of the input. Third, provide the \
pronunciation of the input in the language of the transcript. For example, if it is Chinese, \
write the pinyin. Answer in JSON in the following format: \
{\"translation\": string, \"description\": string, \"pronunciation\": string}";

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": format!("Input: {input} | Transcript: {transcript}") }),
	]
}
