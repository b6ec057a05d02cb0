use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{MnemoService, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
	pub org_id: String,
	pub id: Uuid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
	pub id: Uuid,
	pub message: String,
}

impl MnemoService {
	/// Deletes without checking existence first, so repeating it is harmless.
	pub async fn delete(&self, req: DeleteRequest) -> Result<DeleteResponse> {
		let org_id = crate::require(&req.org_id, "org_id")?;
		let removed = self.store.delete(org_id, &[req.id]).await?;

		tracing::debug!(memory_id = %req.id, removed, "Memory delete applied.");

		Ok(DeleteResponse { id: req.id, message: "Memory deleted successfully!".to_string() })
	}
}
