use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Embeds `texts` with an OpenAI-compatible `/embeddings` endpoint. The result has exactly one
/// vector per input, in input order.
pub async fn embed(
	cfg: &mnemo_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let json: Value = client
		.post(format!("{}{}", cfg.api_base, cfg.path))
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?
		.error_for_status()?
		.json()
		.await?;

	slot_embeddings(json, texts.len())
}

/// Places every `data` item into the slot named by its `index` (its position when absent).
/// Gaps, repeats and out-of-range indices are provider errors.
fn slot_embeddings(mut json: Value, expected: usize) -> Result<Vec<Vec<f32>>> {
	let Some(Value::Array(data)) = json.get_mut("data").map(Value::take) else {
		return Err(Error::invalid_response("Embedding response is missing data array."));
	};
	let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];

	for (position, mut item) in data.into_iter().enumerate() {
		let index = match item.get("index") {
			Some(value) => value
				.as_u64()
				.and_then(|index| usize::try_from(index).ok())
				.ok_or_else(|| Error::invalid_response("Embedding index must be an integer."))?,
			None => position,
		};
		let raw = item.get_mut("embedding").map(Value::take).unwrap_or_default();
		let vector: Vec<f32> = serde_json::from_value(raw).map_err(|_| {
			Error::invalid_response(format!("Embedding {index} is not an array of numbers."))
		})?;
		let slot = slots.get_mut(index).ok_or_else(|| {
			Error::invalid_response(format!(
				"Embedding index {index} is out of range for {expected} inputs."
			))
		})?;

		if slot.replace(vector).is_some() {
			return Err(Error::invalid_response(format!("Embedding index {index} is repeated.")));
		}
	}

	slots
		.into_iter()
		.enumerate()
		.map(|(index, slot)| {
			slot.ok_or_else(|| {
				Error::invalid_response(format!("Embedding response has no vector for input {index}."))
			})
		})
		.collect()
}
