use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use mnemo_storage::models::MemoryRecord;

use crate::{MnemoService, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMetadata {
	pub user_id: String,
	pub org_id: String,
	pub agent_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryItem {
	pub id: Uuid,
	pub text: String,
	pub metadata: MemoryMetadata,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl From<MemoryRecord> for MemoryItem {
	fn from(record: MemoryRecord) -> Self {
		let MemoryRecord { id, org_id, user_id, agent_id, memory_text, created_at, updated_at } =
			record;

		Self {
			id,
			text: memory_text,
			metadata: MemoryMetadata { user_id, org_id, agent_id },
			created_at,
			updated_at,
		}
	}
}

impl MnemoService {
	/// Point lookup within `org_id`. Absence is `None`, not an error.
	pub async fn get(&self, org_id: &str, id: Uuid) -> Result<Option<MemoryItem>> {
		let org_id = crate::require(org_id, "org_id")?;
		let records = self.store.get_all_by_ids(org_id, &[id]).await?;

		Ok(records.into_iter().next().map(MemoryItem::from))
	}
}
