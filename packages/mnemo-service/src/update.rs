use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mnemo_storage::models::NewMemory;

use crate::{Error, MnemoService, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateRequest {
	pub org_id: String,
	pub id: Uuid,
	pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
	pub id: Uuid,
	pub message: String,
}

impl MnemoService {
	/// Replaces the text of an existing memory and re-embeds it. Ownership and `created_at`
	/// are kept.
	pub async fn update(&self, req: UpdateRequest) -> Result<UpdateResponse> {
		let org_id = crate::require(&req.org_id, "org_id")?;
		let text = crate::require(&req.text, "text")?;
		let current = self
			.store
			.get_all_by_ids(org_id, &[req.id])
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| Error::NotFound { message: format!("memory {}", req.id) })?;
		let embedding = self.embed_one(text).await?;

		self.store
			.add(vec![NewMemory {
				id: Some(current.id),
				org_id: current.org_id,
				user_id: current.user_id,
				agent_id: current.agent_id,
				memory_text: text.to_string(),
				embedding,
			}])
			.await?;

		tracing::debug!(memory_id = %req.id, "Memory text replaced.");

		Ok(UpdateResponse { id: req.id, message: "Memory updated successfully!".to_string() })
	}
}
