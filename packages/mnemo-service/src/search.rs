use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mnemo_storage::models::{MemoryFilter, ScoredMemory, VectorQuery};

use crate::{MemoryMetadata, MnemoService, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	pub user_id: String,
	pub org_id: String,
	#[serde(default)]
	pub agent_id: Option<String>,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
	pub id: Uuid,
	pub text: String,
	pub metadata: MemoryMetadata,
	pub score: f32,
}
impl From<ScoredMemory> for SearchItem {
	fn from(scored: ScoredMemory) -> Self {
		let ScoredMemory { record, score } = scored;

		Self {
			id: record.id,
			text: record.memory_text,
			metadata: MemoryMetadata {
				user_id: record.user_id,
				org_id: record.org_id,
				agent_id: record.agent_id,
			},
			score,
		}
	}
}

impl MnemoService {
	/// Semantic search over one user's memories, most similar first.
	pub async fn search(&self, req: SearchRequest) -> Result<Vec<SearchItem>> {
		let query = crate::require(&req.query, "query")?;
		let user_id = crate::require(&req.user_id, "user_id")?;
		let org_id = crate::require(&req.org_id, "org_id")?;
		let agent_id = req
			.agent_id
			.as_deref()
			.map(str::trim)
			.filter(|agent_id| !agent_id.is_empty())
			.map(str::to_string);
		let limit = req.limit.unwrap_or(self.cfg.memory.search_limit).max(1);
		let embedding = self.embed_one(query).await?;
		let hits = self
			.store
			.query(VectorQuery {
				embedding,
				limit,
				filter: MemoryFilter {
					org_id: org_id.to_string(),
					user_id: Some(user_id.to_string()),
					agent_id,
				},
			})
			.await?;

		Ok(hits.into_iter().map(SearchItem::from).collect())
	}
}
