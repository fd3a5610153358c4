pub mod action_items;
pub mod create_note;
pub mod lookup;
pub mod notes;
pub mod pipeline;
pub mod search;
pub mod time_serde;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

pub use action_items::{
	ActionItemView, ListActionItemsRequest, ListActionItemsResponse, RemoveActionItemRequest,
	RemoveActionItemResponse,
};
pub use create_note::{CreateNoteRequest, CreateNoteResponse};
pub use lookup::{TermLookupRequest, TermLookupResponse};
pub use notes::{ListNotesRequest, ListNotesResponse, NoteFetchRequest, NoteView};
pub use search::{SimilarNotesRequest, SimilarNotesResponse, SimilarNote};

use parla_config::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, TranscriptionProviderConfig,
};
use parla_providers::{embedding, extractor, transcription};
use parla_storage::{db::Db, qdrant::QdrantStore};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait TranscriptionProvider
where
	Self: Send + Sync,
{
	fn transcribe<'a>(
		&'a self,
		cfg: &'a TranscriptionProviderConfig,
		audio_url: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait ExtractorProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Value>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

#[derive(Debug)]
pub enum ServiceError {
	InvalidRequest { message: String },
	NotFound { message: String },
	Provider { message: String },
	Storage { message: String },
	Qdrant { message: String },
}

#[derive(Clone)]
pub struct Providers {
	pub transcription: Arc<dyn TranscriptionProvider>,
	pub extractor: Arc<dyn ExtractorProvider>,
	pub embedding: Arc<dyn EmbeddingProvider>,
}

pub struct ParlaService {
	pub cfg: Config,
	pub db: Db,
	pub qdrant: QdrantStore,
	pub providers: Providers,
}

struct DefaultProviders;

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::NotFound { message } => write!(f, "Not found: {message}"),
			Self::Provider { message } => write!(f, "Provider error: {message}"),
			Self::Storage { message } => write!(f, "Storage error: {message}"),
			Self::Qdrant { message } => write!(f, "Qdrant error: {message}"),
		}
	}
}

impl std::error::Error for ServiceError {}

impl From<sqlx::Error> for ServiceError {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<parla_storage::Error> for ServiceError {
	fn from(err: parla_storage::Error) -> Self {
		match err {
			parla_storage::Error::Qdrant(err) => Self::Qdrant { message: err.to_string() },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<color_eyre::Report> for ServiceError {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl TranscriptionProvider for DefaultProviders {
	fn transcribe<'a>(
		&'a self,
		cfg: &'a TranscriptionProviderConfig,
		audio_url: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(transcription::transcribe(cfg, audio_url))
	}
}

impl ExtractorProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Value>> {
		Box::pin(extractor::extract(cfg, messages))
	}
}

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl Providers {
	pub fn new(
		transcription: Arc<dyn TranscriptionProvider>,
		extractor: Arc<dyn ExtractorProvider>,
		embedding: Arc<dyn EmbeddingProvider>,
	) -> Self {
		Self { transcription, extractor, embedding }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { transcription: provider.clone(), extractor: provider.clone(), embedding: provider }
	}
}

impl ParlaService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		Self { cfg, db, qdrant, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, qdrant: QdrantStore, providers: Providers) -> Self {
		Self { cfg, db, qdrant, providers }
	}
}
