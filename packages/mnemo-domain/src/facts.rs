use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FACTS_SCHEMA_NAME: &str = "extracted_facts";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FactsOutput {
	pub facts: Vec<ExtractedFact>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractedFact {
	pub fact: String,
}

impl FactsOutput {
	/// Trimmed fact texts in emission order, blanks removed. Duplicates are kept; callers
	/// collapse them where it matters.
	pub fn into_texts(self) -> Vec<String> {
		self.facts
			.into_iter()
			.map(|fact| fact.fact.trim().to_string())
			.filter(|fact| !fact.is_empty())
			.collect()
	}
}

/// JSON schema for `{facts: [{fact: string}]}`.
pub fn facts_schema() -> Value {
	serde_json::json!({
		"type": "object",
		"properties": {
			"facts": {
				"type": "array",
				"items": {
					"type": "object",
					"properties": {
						"fact": { "type": "string" }
					},
					"required": ["fact"],
					"additionalProperties": false
				}
			}
		},
		"required": ["facts"],
		"additionalProperties": false
	})
}

/// First occurrence order, textual duplicates dropped.
pub fn distinct(facts: &[String]) -> Vec<&str> {
	let mut seen = std::collections::HashSet::new();

	facts.iter().map(String::as_str).filter(|fact| seen.insert(*fact)).collect()
}
