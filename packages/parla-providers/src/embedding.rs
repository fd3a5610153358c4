use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
	#[serde(default)]
	index: Option<usize>,
	embedding: Vec<f32>,
}

pub async fn embed(
	cfg: &parla_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let response: EmbeddingResponse = res
		.error_for_status()?
		.json()
		.await
		.map_err(|err| eyre::eyre!("Embedding response did not match schema: {err}."))?;

	order_embeddings(response)
}

fn order_embeddings(response: EmbeddingResponse) -> Result<Vec<Vec<f32>>> {
	if response.data.is_empty() {
		return Err(eyre::eyre!("Embedding response contains no vectors."));
	}

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(response.data.len());

	for (fallback_index, item) in response.data.into_iter().enumerate() {
		indexed.push((item.index.unwrap_or(fallback_index), item.embedding));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}
