use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		mnemo_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn default_headers_are_forwarded() {
	let mut defaults = Map::new();

	defaults.insert("x-team".to_string(), Value::String("memory".to_string()));

	let headers = mnemo_providers::auth_headers("secret", &defaults).expect("Failed to build headers.");

	assert_eq!(headers.get("x-team").expect("Missing default header."), "memory");
}

#[test]
fn non_string_default_header_is_rejected() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = mnemo_providers::auth_headers("secret", &defaults).expect_err("Expected failure.");

	assert!(err.to_string().contains("x-retries"));
}

#[tokio::test]
async fn empty_embedding_batch_skips_the_network() {
	let cfg = mnemo_config::EmbeddingProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: "secret".to_string(),
		path: "/embeddings".to_string(),
		model: "test-embedding".to_string(),
		dimensions: 4,
		timeout_ms: 100,
		default_headers: Map::new(),
	};
	let vectors = mnemo_providers::embedding::embed(&cfg, &[]).await.expect("Empty batch failed.");

	assert!(vectors.is_empty());
}
