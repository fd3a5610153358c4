use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub search: Search,
	pub worker: Worker,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub transcription: TranscriptionProviderConfig,
	pub llm_extractor: LlmProviderConfig,
	pub embedding: EmbeddingProviderConfig,
}

/// Hosted speech-to-text endpoint. `model` is the model or version handle the
/// endpoint expects in its request body.
#[derive(Debug, Deserialize)]
pub struct TranscriptionProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_search_limit")]
	pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct Worker {
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	#[serde(default = "default_claim_lease_seconds")]
	pub claim_lease_seconds: i64,
}

fn default_search_limit() -> u32 {
	16
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_claim_lease_seconds() -> i64 {
	30
}
