use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use mnemo_config::Message;

use crate::{Error, Result};

/// A named JSON schema the generated object must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
	pub name: String,
	pub schema: Value,
}
impl ResponseSchema {
	pub fn new(name: impl Into<String>, schema: Value) -> Self {
		Self { name: name.into(), schema }
	}
}

/// Runs one structured-decoding chat completion and returns the decoded object.
///
/// There is no retry: a transport failure, a refusal, or content that is not a JSON object is an
/// error for the caller to surface.
pub async fn generate(
	cfg: &mnemo_config::LlmProviderConfig,
	messages: &[Message],
	schema: &ResponseSchema,
) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = request_body(cfg, messages, schema);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_generation_json(json)
}

fn request_body(
	cfg: &mnemo_config::LlmProviderConfig,
	messages: &[Message],
	schema: &ResponseSchema,
) -> Value {
	serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"response_format": {
			"type": "json_schema",
			"json_schema": {
				"name": schema.name,
				"schema": schema.schema,
				"strict": true,
			},
		},
	})
}

fn parse_generation_json(json: Value) -> Result<Value> {
	let message = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.ok_or_else(|| Error::invalid_response("Generation response is missing a message."))?;

	if let Some(refusal) = message.get("refusal").and_then(|v| v.as_str()) {
		return Err(Error::invalid_response(format!("Generation was refused: {refusal}")));
	}

	let content = message
		.get("content")
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::invalid_response("Generation message has no content."))?;
	let parsed: Value = serde_json::from_str(content)
		.map_err(|_| Error::invalid_response("Generation content is not valid JSON."))?;

	if !parsed.is_object() {
		return Err(Error::invalid_response("Generation content is not a JSON object."));
	}

	Ok(parsed)
}
