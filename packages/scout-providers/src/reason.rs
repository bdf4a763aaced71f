// std
use std::time::Duration as StdDuration;

// crates.io
use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Invokes a reasoning engine with a system instruction and a user prompt
/// and returns the raw completion text. The engine is treated as opaque,
/// possibly slow, and possibly failing; callers parse the text defensively.
pub async fn invoke(
	cfg: &scout_config::EngineConfig,
	system_instructions: &str,
	user_prompt: &str,
) -> Result<String> {
	let client = Client::builder().timeout(StdDuration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"reasoning_effort": cfg.effort,
		"messages": [
			{ "role": "system", "content": system_instructions },
			{ "role": "user", "content": user_prompt }
		]
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	completion_text(json)
}

fn completion_text(json: Value) -> Result<String> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		return Ok(content.to_string());
	}

	// Some providers return the text at the top level.
	if let Some(content) = json.get("output_text").and_then(|c| c.as_str()) {
		return Ok(content.to_string());
	}

	Err(eyre::eyre!("Completion response is missing text content."))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "WHERE T1.location = 'Seoul'" } }
			]
		});

		assert_eq!(completion_text(json).expect("parse failed"), "WHERE T1.location = 'Seoul'");
	}

	#[test]
	fn extracts_top_level_output_text() {
		let json = serde_json::json!({ "output_text": "hello" });

		assert_eq!(completion_text(json).expect("parse failed"), "hello");
	}

	#[test]
	fn missing_content_is_an_error() {
		let json = serde_json::json!({ "choices": [] });

		assert!(completion_text(json).is_err());
	}
}
