use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Deserialize;

/// Replicate-style prediction response. `output` carries the Whisper result
/// once the prediction has run; older endpoints return the transcript at the
/// top level instead.
#[derive(Debug, Deserialize)]
struct PredictionResponse {
	#[serde(default)]
	output: Option<WhisperOutput>,
	#[serde(default)]
	transcription: Option<String>,
	#[serde(default)]
	text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
	#[serde(default)]
	transcription: Option<String>,
}

/// Transcribes the audio at `audio_url` and returns the plain-text
/// transcript. The request asks the endpoint to hold the connection until the
/// prediction completes.
pub async fn transcribe(
	cfg: &parla_config::TranscriptionProviderConfig,
	audio_url: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"version": cfg.model,
		"input": {
			"audio": audio_url,
			"transcription": "plain text",
			"translate": false,
			"temperature": 0,
		},
	});
	let mut headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	headers.insert("Prefer", "wait".parse()?);

	let res = client.post(url).headers(headers).json(&body).send().await?;
	let response: PredictionResponse = res
		.error_for_status()?
		.json()
		.await
		.map_err(|err| eyre::eyre!("Transcription response did not match schema: {err}."))?;

	extract_transcript(response)
}

fn extract_transcript(response: PredictionResponse) -> Result<String> {
	let transcript = response
		.output
		.and_then(|output| output.transcription)
		.or(response.transcription)
		.or(response.text)
		.ok_or_else(|| eyre::eyre!("Transcription response carries no transcript."))?;

	if transcript.trim().is_empty() {
		return Err(eyre::eyre!("Transcription response carries an empty transcript."));
	}

	Ok(transcript)
}
