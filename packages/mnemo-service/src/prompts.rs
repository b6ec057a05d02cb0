use serde::{Deserialize, Serialize};

use mnemo_config::Message;

use crate::{Error, MnemoService, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptResponse {
	pub messages: Vec<Message>,
	/// `true` when the organization has no override and the configured default applies.
	pub is_default: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetPromptRequest {
	pub org_id: String,
	pub messages: Vec<Message>,
}

impl MnemoService {
	/// Effective fact extraction prompt. Never writes.
	pub async fn get_prompt(&self, org_id: &str) -> Result<PromptResponse> {
		let org_id = crate::require(org_id, "org_id")?;

		Ok(match self.prompts.get(org_id).await? {
			Some(messages) => PromptResponse { messages, is_default: false },
			None => self.default_prompt(),
		})
	}

	/// Replaces the organization's override wholesale.
	pub async fn set_prompt(&self, req: SetPromptRequest) -> Result<PromptResponse> {
		let org_id = crate::require(&req.org_id, "org_id")?;

		if req.messages.is_empty() {
			return Err(Error::invalid("messages must contain at least one message."));
		}
		if req.messages.iter().any(|message| message.content.trim().is_empty()) {
			return Err(Error::invalid("messages must have non-empty content."));
		}

		self.prompts.upsert(org_id, &req.messages).await?;

		Ok(PromptResponse { messages: req.messages, is_default: false })
	}

	/// Drops the override so the default applies again. Resetting twice is harmless.
	pub async fn reset_prompt(&self, org_id: &str) -> Result<PromptResponse> {
		let org_id = crate::require(org_id, "org_id")?;
		let removed = self.prompts.delete(org_id).await?;

		tracing::debug!(org_id, removed, "Prompt override reset.");

		Ok(self.default_prompt())
	}

	/// Persists the configured default for an organization without an override. Returns
	/// whether a row was written.
	pub async fn ensure_default_prompt(&self, org_id: &str) -> Result<bool> {
		let org_id = crate::require(org_id, "org_id")?;

		Ok(self.prompts.insert_if_absent(org_id, &self.cfg.prompts.fact_extraction).await?)
	}

	/// Prompt for the extraction step. A failing lookup degrades to the default.
	pub(crate) async fn resolve_fact_prompt(&self, org_id: &str) -> Vec<Message> {
		match self.prompts.get(org_id).await {
			Ok(Some(messages)) if !messages.is_empty() => messages,
			Ok(_) => self.cfg.prompts.fact_extraction.clone(),
			Err(err) => {
				tracing::warn!(error = %err, org_id, "Prompt lookup failed. Using the default prompt.");

				self.cfg.prompts.fact_extraction.clone()
			},
		}
	}

	fn default_prompt(&self) -> PromptResponse {
		PromptResponse { messages: self.cfg.prompts.fact_extraction.clone(), is_default: true }
	}
}
