use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub memory: Memory,
	#[serde(default)]
	pub prompts: Prompts,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
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
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Memory {
	/// Must match `providers.embedding.dimensions`.
	#[serde(default = "default_vector_dim")]
	pub vector_dim: u32,
	/// Nearest neighbors fetched per extracted fact during reconciliation.
	#[serde(default = "default_candidate_k")]
	pub candidate_k: u32,
	#[serde(default = "default_search_limit")]
	pub search_limit: u32,
	#[serde(default = "default_page_size")]
	pub default_page_size: u32,
	#[serde(default)]
	pub backward_has_more: BackwardHasMore,
}
impl Default for Memory {
	fn default() -> Self {
		Self {
			vector_dim: default_vector_dim(),
			candidate_k: default_candidate_k(),
			search_limit: default_search_limit(),
			default_page_size: default_page_size(),
			backward_has_more: BackwardHasMore::default(),
		}
	}
}

/// How `has_more` is reported for pages fetched with an `ending_before` cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackwardHasMore {
	/// Report whether a further newer page exists.
	#[default]
	Exact,
	/// Report `true` whenever a cursor was resolved.
	Always,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
	/// Instruction sequence used when an organization has no override.
	pub fact_extraction: Vec<Message>,
	/// System instruction for the reconciliation step.
	pub reconciliation: String,
}
impl Default for Prompts {
	fn default() -> Self {
		Self {
			fact_extraction: vec![Message::system(DEFAULT_FACT_EXTRACTION_PROMPT)],
			reconciliation: DEFAULT_RECONCILIATION_PROMPT.to_string(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
	pub role: Role,
	pub content: String,
}
impl Message {
	pub fn system(content: impl Into<String>) -> Self {
		Self { role: Role::System, content: content.into() }
	}

	pub fn user(content: impl Into<String>) -> Self {
		Self { role: Role::User, content: content.into() }
	}
}

const DEFAULT_FACT_EXTRACTION_PROMPT: &str = "You organize personal information about a user. \
Read the conversation and extract the distinct facts worth remembering across sessions: \
preferences, personal details, plans, relationships, professional details, health and \
lifestyle details, and anything the user explicitly asks to remember. \
Write each fact as one short, self-contained sentence in the language the user wrote in. \
Only extract facts stated or clearly implied by the user, never by the assistant. \
If a fact replaces an earlier one in the same conversation, keep only the latest version. \
If nothing is worth remembering, return an empty facts list. \
Respond only with JSON matching the provided schema.";

const DEFAULT_RECONCILIATION_PROMPT: &str = "You maintain a user's memory. \
You are given the existing memories, each with a short id, and a list of newly extracted facts. \
For each new fact decide one event: \
ADD when it is new information, reusing no id; \
UPDATE when it refines or replaces an existing memory, keeping that memory's id, giving the \
merged text and copying the previous text into old_memory; \
DELETE when it contradicts an existing memory that should be retired, giving that memory's id; \
NONE when the information is already present. \
Existing memories that are unaffected may be returned with event NONE. \
Only use ids that appear in the existing memories. Never invent ids. \
Respond only with JSON matching the provided schema.";

fn default_vector_dim() -> u32 {
	768
}

fn default_candidate_k() -> u32 {
	10
}

fn default_search_limit() -> u32 {
	100
}

fn default_page_size() -> u32 {
	10
}
