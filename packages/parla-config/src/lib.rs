mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers, Qdrant, Search,
	Service, Storage, TranscriptionProviderConfig, Worker,
};

use std::{env, fs, path::Path};

/// Hard cap on similarity-search results per query.
pub const MAX_SEARCH_LIMIT: u32 = 16;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	resolve_api_keys(&mut cfg)?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.llm_extractor.max_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.llm_extractor.max_tokens must be greater than zero.".to_string(),
		});
	}
	if cfg.search.limit == 0 {
		return Err(Error::Validation {
			message: "search.limit must be greater than zero.".to_string(),
		});
	}
	if cfg.search.limit > MAX_SEARCH_LIMIT {
		return Err(Error::Validation {
			message: format!("search.limit must not exceed {MAX_SEARCH_LIMIT}."),
		});
	}
	if cfg.worker.claim_lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("transcription", &cfg.providers.transcription.api_key),
		("llm_extractor", &cfg.providers.llm_extractor.api_key),
		("embedding", &cfg.providers.embedding.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

/// An `api_key` of the form `env:VAR_NAME` is replaced with the value of that
/// process environment variable before validation.
fn resolve_api_keys(cfg: &mut Config) -> Result<()> {
	for (label, key) in [
		("transcription", &mut cfg.providers.transcription.api_key),
		("llm_extractor", &mut cfg.providers.llm_extractor.api_key),
		("embedding", &mut cfg.providers.embedding.api_key),
	] {
		let Some(var) = key.strip_prefix("env:") else {
			continue;
		};
		let var = var.trim();

		if var.is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key env reference names no variable."),
			});
		}

		*key = env::var(var).map_err(|_| Error::Validation {
			message: format!("Provider {label} api_key references unset variable {var}."),
		})?;
	}

	Ok(())
}
