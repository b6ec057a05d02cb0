use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mnemo_domain::pagination::{self, Page, PageWindow};
use mnemo_storage::models::{MemoryFilter, PageQuery};

use crate::{MemoryItem, MnemoService, Result};

pub type ListResponse = Page<MemoryItem>;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListRequest {
	pub org_id: String,
	#[serde(default)]
	pub user_id: Option<String>,
	#[serde(default)]
	pub agent_id: Option<String>,
	#[serde(default)]
	pub limit: Option<i64>,
	#[serde(default)]
	pub starting_after: Option<Uuid>,
	#[serde(default)]
	pub ending_before: Option<Uuid>,
	#[serde(default)]
	pub include_total: bool,
}

impl MnemoService {
	/// One page of memories, newest first, walking from an optional cursor.
	pub async fn list(&self, req: ListRequest) -> Result<ListResponse> {
		let org_id = crate::require(&req.org_id, "org_id")?;
		let window = PageWindow::new(
			req.limit,
			self.cfg.memory.default_page_size,
			req.starting_after,
			req.ending_before,
		)?;
		let filter = MemoryFilter {
			org_id: org_id.to_string(),
			user_id: non_blank(req.user_id),
			agent_id: non_blank(req.agent_id),
		};
		let mut page = self
			.store
			.get_by_filters(PageQuery { filter, window, include_total: req.include_total })
			.await?;

		page.has_more =
			pagination::report_has_more(page.has_more, &window, self.cfg.memory.backward_has_more);

		Ok(page.map(MemoryItem::from))
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
