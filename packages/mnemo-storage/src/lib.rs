pub mod db;
pub mod in_memory;
pub mod memories;
pub mod models;
pub mod prompts;
pub mod schema;
pub mod vector;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin};

use uuid::Uuid;

use mnemo_config::Message;
use mnemo_domain::pagination::Page;
use models::{MemoryRecord, NewMemory, PageQuery, ScoredMemory, VectorQuery};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Vector-indexed persistence for memory rows. Every operation is scoped to one organization.
pub trait MemoryStore
where
	Self: Send + Sync,
{
	/// Upserts `items` in one transaction and returns their ids in input order.
	fn add<'a>(&'a self, items: Vec<NewMemory>) -> BoxFuture<'a, Result<Vec<Uuid>>>;

	/// Nearest rows to `query.embedding` under the filter, best first.
	fn query<'a>(&'a self, query: VectorQuery) -> BoxFuture<'a, Result<Vec<ScoredMemory>>>;

	fn get_all_by_ids<'a>(
		&'a self,
		org_id: &'a str,
		ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<Vec<MemoryRecord>>>;

	/// Physically removes the rows. Returns how many existed.
	fn delete<'a>(&'a self, org_id: &'a str, ids: &'a [Uuid]) -> BoxFuture<'a, Result<u64>>;

	fn get_by_filters<'a>(&'a self, query: PageQuery) -> BoxFuture<'a, Result<Page<MemoryRecord>>>;
}

/// Per-organization fact extraction prompt overrides.
pub trait PromptStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, org_id: &'a str) -> BoxFuture<'a, Result<Option<Vec<Message>>>>;

	fn upsert<'a>(&'a self, org_id: &'a str, messages: &'a [Message]) -> BoxFuture<'a, Result<()>>;

	/// Writes `messages` only when the organization has no override yet. Returns whether a row
	/// was written.
	fn insert_if_absent<'a>(
		&'a self,
		org_id: &'a str,
		messages: &'a [Message],
	) -> BoxFuture<'a, Result<bool>>;

	/// Returns whether an override existed.
	fn delete<'a>(&'a self, org_id: &'a str) -> BoxFuture<'a, Result<bool>>;
}
