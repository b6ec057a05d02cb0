//! In-process store with the same observable semantics as [`crate::db::Db`].
//!
//! Used by tests and by embedders that do not need durability.

use std::{collections::HashMap, sync::Arc};

use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use mnemo_config::Message;
use mnemo_domain::pagination::{self, CursorKey, Direction, Page};

use crate::{
	BoxFuture, Error, MemoryStore, PromptStore, Result,
	models::{MemoryRecord, NewMemory, PageQuery, ScoredMemory, VectorQuery},
	vector,
};

#[derive(Clone, Default)]
pub struct InMemoryStore {
	state: Arc<RwLock<State>>,
}
impl InMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored memories across all organizations.
	pub async fn len(&self) -> usize {
		self.state.read().await.memories.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}

	/// Stored embedding of a memory, regardless of organization.
	pub async fn embedding_of(&self, id: Uuid) -> Option<Vec<f32>> {
		self.state.read().await.memories.get(&id).map(|stored| stored.embedding.clone())
	}
}

#[derive(Default)]
struct State {
	memories: HashMap<Uuid, StoredMemory>,
	prompts: HashMap<String, Vec<Message>>,
	last_timestamp: Option<OffsetDateTime>,
}
impl State {
	/// Strictly increasing wall clock at microsecond precision, like `timestamptz`.
	fn tick(&mut self) -> OffsetDateTime {
		let now = OffsetDateTime::now_utc();
		let now = now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000).unwrap_or(now);
		let next = match self.last_timestamp {
			Some(last) if now <= last => last + Duration::microseconds(1),
			_ => now,
		};

		self.last_timestamp = Some(next);

		next
	}
}

#[derive(Clone)]
struct StoredMemory {
	record: MemoryRecord,
	embedding: Vec<f32>,
}

impl MemoryStore for InMemoryStore {
	fn add<'a>(&'a self, items: Vec<NewMemory>) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(async move {
			for item in &items {
				item.validate()?;
			}

			let mut state = self.state.write().await;
			// Staged on a copy so a failing item leaves the store untouched.
			let mut staged = state.memories.clone();
			let mut ids = Vec::with_capacity(items.len());

			for item in items {
				let id = item.id.unwrap_or_else(Uuid::new_v4);
				let now = state.tick();

				match staged.get_mut(&id) {
					Some(existing) => {
						if existing.record.org_id != item.org_id {
							return Err(Error::NotFound(format!("memory {id}")));
						}

						existing.record.user_id = item.user_id;
						existing.record.agent_id = item.agent_id;
						existing.record.memory_text = item.memory_text;
						existing.record.updated_at = now;
						existing.embedding = item.embedding;
					},
					None => {
						let record = MemoryRecord {
							id,
							org_id: item.org_id,
							user_id: item.user_id,
							agent_id: item.agent_id,
							memory_text: item.memory_text,
							created_at: now,
							updated_at: now,
						};

						staged.insert(id, StoredMemory { record, embedding: item.embedding });
					},
				}

				ids.push(id);
			}

			state.memories = staged;

			Ok(ids)
		})
	}

	fn query<'a>(&'a self, query: VectorQuery) -> BoxFuture<'a, Result<Vec<ScoredMemory>>> {
		Box::pin(async move {
			if query.embedding.is_empty() {
				return Err(Error::InvalidArgument("Query embedding must be non-empty.".to_string()));
			}

			let state = self.state.read().await;
			let mut scored: Vec<ScoredMemory> = state
				.memories
				.values()
				.filter(|stored| query.filter.matches(&stored.record))
				.map(|stored| ScoredMemory {
					record: stored.record.clone(),
					score: vector::cosine_similarity(&query.embedding, &stored.embedding),
				})
				.collect();

			scored.sort_by(|a, b| {
				b.score.total_cmp(&a.score).then_with(|| a.record.id.cmp(&b.record.id))
			});
			scored.truncate(query.limit as usize);

			Ok(scored)
		})
	}

	fn get_all_by_ids<'a>(
		&'a self,
		org_id: &'a str,
		ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<MemoryRecord>>> {
		Box::pin(async move {
			let state = self.state.read().await;
			let mut seen = std::collections::HashSet::new();

			Ok(ids
				.iter()
				.filter(|id| seen.insert(**id))
				.filter_map(|id| state.memories.get(id))
				.filter(|stored| stored.record.org_id == org_id)
				.map(|stored| stored.record.clone())
				.collect())
		})
	}

	fn delete<'a>(&'a self, org_id: &'a str, ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let mut state = self.state.write().await;
			let mut removed = 0;

			for id in ids {
				if state.memories.get(id).is_some_and(|stored| stored.record.org_id == org_id) {
					state.memories.remove(id);

					removed += 1;
				}
			}

			Ok(removed)
		})
	}

	fn get_by_filters<'a>(&'a self, query: PageQuery) -> BoxFuture<'a, Result<Page<MemoryRecord>>> {
		Box::pin(async move {
			let PageQuery { filter, window, include_total } = query;
			let state = self.state.read().await;
			let cursor = match window.cursor.id() {
				Some(id) => {
					let stored = state
						.memories
						.get(&id)
						.filter(|stored| stored.record.org_id == filter.org_id)
						.ok_or_else(|| Error::NotFound("cursor record not found".to_string()))?;

					Some(CursorKey { created_at: stored.record.created_at, id })
				},
				None => None,
			};
			let direction = window.direction();
			let matching: Vec<&MemoryRecord> = state
				.memories
				.values()
				.map(|stored| &stored.record)
				.filter(|record| filter.matches(record))
				.collect();
			let total = include_total.then(|| matching.len() as i64);
			let mut rows: Vec<MemoryRecord> = matching
				.into_iter()
				.filter(|record| {
					cursor.is_none_or(|key| key.admits(direction, record.created_at, record.id))
				})
				.cloned()
				.collect();

			rows.sort_by(|a, b| {
				let order = (a.created_at, a.id).cmp(&(b.created_at, b.id));

				match direction {
					Direction::Forward => order.reverse(),
					Direction::Backward => order,
				}
			});
			rows.truncate(window.fetch_limit() as usize);

			let mut page = pagination::finish_page(rows, &window);

			page.total = total;

			Ok(page)
		})
	}
}

impl PromptStore for InMemoryStore {
	fn get<'a>(&'a self, org_id: &'a str) -> BoxFuture<'a, Result<Option<Vec<Message>>>> {
		Box::pin(async move { Ok(self.state.read().await.prompts.get(org_id).cloned()) })
	}

	fn upsert<'a>(&'a self, org_id: &'a str, messages: &'a [Message]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.state.write().await.prompts.insert(org_id.to_string(), messages.to_vec());

			Ok(())
		})
	}

	fn insert_if_absent<'a>(
		&'a self,
		org_id: &'a str,
		messages: &'a [Message],
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let mut state = self.state.write().await;

			if state.prompts.contains_key(org_id) {
				return Ok(false);
			}

			state.prompts.insert(org_id.to_string(), messages.to_vec());

			Ok(true)
		})
	}

	fn delete<'a>(&'a self, org_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(self.state.write().await.prompts.remove(org_id).is_some()) })
	}
}
