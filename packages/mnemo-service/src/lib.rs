pub mod add;
pub mod delete;
pub mod get;
pub mod list;
pub mod prompts;
pub mod search;
pub mod update;

mod error;

pub use add::{AddRequest, AddResponse, MemoryOperation};
pub use delete::{DeleteRequest, DeleteResponse};
pub use error::{Error, Result};
pub use get::{MemoryItem, MemoryMetadata};
pub use list::{ListRequest, ListResponse};
pub use mnemo_storage::BoxFuture;
pub use prompts::{PromptResponse, SetPromptRequest};
pub use search::{SearchItem, SearchRequest};
pub use update::{UpdateRequest, UpdateResponse};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use mnemo_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, Message};
use mnemo_providers::{embedding, generator, generator::ResponseSchema};
use mnemo_storage::{MemoryStore, PromptStore, db::Db};

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, mnemo_providers::Result<Vec<Vec<f32>>>>;
}

pub trait TextGenerator
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Message],
		schema: &'a ResponseSchema,
	) -> BoxFuture<'a, mnemo_providers::Result<Value>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generator: Arc<dyn TextGenerator>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, generator: Arc<dyn TextGenerator>) -> Self {
		Self { embedding, generator }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), generator: provider }
	}
}

/// The reconciliation engine and the read paths that share its store.
pub struct MnemoService {
	pub cfg: Config,
	pub store: Arc<dyn MemoryStore>,
	pub prompts: Arc<dyn PromptStore>,
	pub providers: Providers,
}
impl MnemoService {
	pub fn new(cfg: Config, store: Arc<dyn MemoryStore>, prompts: Arc<dyn PromptStore>) -> Self {
		Self { cfg, store, prompts, providers: Providers::default() }
	}

	pub fn with_providers(
		cfg: Config,
		store: Arc<dyn MemoryStore>,
		prompts: Arc<dyn PromptStore>,
		providers: Providers,
	) -> Self {
		Self { cfg, store, prompts, providers }
	}

	/// Backs both memories and prompt overrides with one Postgres pool.
	pub fn with_db(cfg: Config, db: Db) -> Self {
		let db = Arc::new(db);

		Self::new(cfg, db.clone(), db)
	}

	/// Embeds `texts` and checks the provider honored the count and the configured dimension.
	pub(crate) async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let vectors = self.providers.embedding.embed(&self.cfg.providers.embedding, texts).await?;

		if vectors.len() != texts.len() {
			return Err(Error::provider(format!(
				"Embedding provider returned {} vectors for {} texts.",
				vectors.len(),
				texts.len()
			)));
		}

		let expected = self.cfg.memory.vector_dim as usize;

		if let Some(vector) = vectors.iter().find(|vector| vector.len() != expected) {
			return Err(Error::provider(format!(
				"Embedding dimension mismatch: expected {expected}, got {}.",
				vector.len()
			)));
		}

		Ok(vectors)
	}

	pub(crate) async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		self.embed_texts(&[text.to_string()])
			.await?
			.pop()
			.ok_or_else(|| Error::provider("Embedding provider returned no vector."))
	}

	/// Runs one structured generation and decodes it into `T`.
	pub(crate) async fn generate_json<T>(
		&self,
		messages: &[Message],
		schema: &ResponseSchema,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let value =
			self.providers.generator.generate(&self.cfg.providers.llm, messages, schema).await?;

		serde_json::from_value(value).map_err(|err| {
			Error::provider(format!("Generator output does not match {}: {err}.", schema.name))
		})
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, mnemo_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl TextGenerator for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Message],
		schema: &'a ResponseSchema,
	) -> BoxFuture<'a, mnemo_providers::Result<Value>> {
		Box::pin(generator::generate(cfg, messages, schema))
	}
}

pub(crate) fn require<'a>(value: &'a str, field: &str) -> Result<&'a str> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::invalid(format!("{field} is required.")));
	}

	Ok(trimmed)
}
