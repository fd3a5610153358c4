use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

/// Attempts before giving up on a model that keeps returning non-JSON content.
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
	choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
	message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
	content: String,
}

/// Runs a chat completion constrained to JSON output and returns the parsed
/// content object. The model is asked for `json_object` output, but the reply
/// is still validated here; a reply that is not valid JSON costs one attempt.
pub async fn extract(cfg: &parla_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);

	for _ in 0..MAX_ATTEMPTS {
		let body = serde_json::json!({
			"model": cfg.model,
			"temperature": cfg.temperature,
			"max_tokens": cfg.max_tokens,
			"response_format": { "type": "json_object" },
			"messages": messages,
		});
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let response: ChatCompletionResponse = res
			.error_for_status()?
			.json()
			.await
			.map_err(|err| eyre::eyre!("Chat completion response did not match schema: {err}."))?;

		if let Ok(parsed) = parse_content(&response) {
			return Ok(parsed);
		}
	}

	Err(eyre::eyre!("Extractor returned no valid JSON content in {MAX_ATTEMPTS} attempts."))
}

fn parse_content(response: &ChatCompletionResponse) -> Result<Value> {
	let content = response
		.choices
		.first()
		.map(|choice| choice.message.content.as_str())
		.ok_or_else(|| eyre::eyre!("Chat completion response has no choices."))?;
	let parsed: Value = serde_json::from_str(content)
		.map_err(|_| eyre::eyre!("Chat completion content is not valid JSON."))?;

	if !parsed.is_object() {
		return Err(eyre::eyre!("Chat completion content is not a JSON object."));
	}

	Ok(parsed)
}
