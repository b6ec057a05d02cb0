use time::OffsetDateTime;
use uuid::Uuid;

use mnemo_domain::pagination::PageWindow;

use crate::{Error, Result};

/// A row to insert, or to overwrite when `id` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
	pub id: Option<Uuid>,
	pub org_id: String,
	pub user_id: String,
	pub agent_id: String,
	pub memory_text: String,
	pub embedding: Vec<f32>,
}
impl NewMemory {
	pub fn validate(&self) -> Result<()> {
		if self.org_id.trim().is_empty() {
			return Err(Error::InvalidArgument("org_id must be non-empty.".to_string()));
		}
		if self.user_id.trim().is_empty() {
			return Err(Error::InvalidArgument("user_id must be non-empty.".to_string()));
		}
		if self.memory_text.trim().is_empty() {
			return Err(Error::InvalidArgument("memory_text must be non-empty.".to_string()));
		}
		if self.embedding.is_empty() {
			return Err(Error::InvalidArgument("embedding must be non-empty.".to_string()));
		}

		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MemoryRecord {
	pub id: Uuid,
	pub org_id: String,
	pub user_id: String,
	pub agent_id: String,
	pub memory_text: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ScoredMemory {
	#[sqlx(flatten)]
	pub record: MemoryRecord,
	pub score: f32,
}

/// Equality predicates ANDed together. `org_id` is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFilter {
	pub org_id: String,
	pub user_id: Option<String>,
	pub agent_id: Option<String>,
}
impl MemoryFilter {
	pub fn org(org_id: impl Into<String>) -> Self {
		Self { org_id: org_id.into(), user_id: None, agent_id: None }
	}

	pub fn matches(&self, record: &MemoryRecord) -> bool {
		record.org_id == self.org_id
			&& self.user_id.as_ref().is_none_or(|user_id| &record.user_id == user_id)
			&& self.agent_id.as_ref().is_none_or(|agent_id| &record.agent_id == agent_id)
	}
}

#[derive(Debug, Clone)]
pub struct VectorQuery {
	pub embedding: Vec<f32>,
	pub limit: u32,
	pub filter: MemoryFilter,
}

#[derive(Debug, Clone)]
pub struct PageQuery {
	pub filter: MemoryFilter,
	pub window: PageWindow,
	pub include_total: bool,
}
