//! Conversation ingestion: extract facts, retrieve similar memories, let the generator
//! reconcile them, then apply the resulting operations.
//!
//! The generator only ever sees candidate indices. Real ids are recovered through the
//! per-request [`CandidateIndex`] before anything touches storage, so an index the generator
//! made up can never reach a row.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mnemo_config::Message;
use mnemo_domain::{
	candidates::{Candidate, CandidateIndex},
	facts::{self, FACTS_SCHEMA_NAME, FactsOutput},
	reconcile::{self, PlannedOp, RECONCILE_SCHEMA_NAME, ReconcileOutput, SkippedInstruction},
};
use mnemo_providers::generator::ResponseSchema;
use mnemo_storage::models::{MemoryFilter, NewMemory, VectorQuery};

use crate::{Error, MnemoService, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddRequest {
	pub user_id: String,
	pub org_id: String,
	#[serde(default)]
	pub agent_id: Option<String>,
	pub messages: Vec<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum MemoryOperation {
	Add { id: Uuid, text: String },
	Update { id: Uuid, old_text: String, new_text: String },
	Delete { id: Uuid },
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct AddResponse {
	/// Applied operations in the order the generator emitted them.
	pub operations: Vec<MemoryOperation>,
	/// Instructions dropped because they named no usable candidate or carried no text.
	pub skipped: Vec<SkippedInstruction>,
}

struct Scope<'a> {
	org_id: &'a str,
	user_id: &'a str,
	agent_id: &'a str,
}

impl MnemoService {
	pub async fn add(&self, req: AddRequest) -> Result<AddResponse> {
		let scope = validate_add_request(&req)?;
		let prompt = self.resolve_fact_prompt(scope.org_id).await;
		let facts = self.extract_facts(prompt, &req.messages).await?;

		if facts.is_empty() {
			tracing::info!(org_id = scope.org_id, user_id = scope.user_id, "No facts extracted.");

			return Ok(AddResponse::default());
		}

		let vectors = self.embed_texts(&facts).await?;
		// Identical facts collapse onto one entry, the later one wins.
		let mut embeddings: HashMap<String, Vec<f32>> =
			facts.iter().cloned().zip(vectors).collect();
		let new_facts = facts::distinct(&facts);
		let index = self.retrieve_candidates(&scope, &new_facts, &embeddings).await?;
		let output: ReconcileOutput = self.reconcile_facts(&index, &new_facts).await?;
		let plan = reconcile::plan(output.memory, &index);

		for skipped in &plan.skipped {
			tracing::warn!(
				event = ?skipped.event,
				index = ?skipped.index,
				reason = ?skipped.reason,
				"Skipping reconcile instruction."
			);
		}

		let mut operations = Vec::with_capacity(plan.ops.len());

		for op in plan.ops {
			operations.push(self.apply_op(&scope, op, &mut embeddings).await?);
		}

		tracing::info!(
			org_id = scope.org_id,
			user_id = scope.user_id,
			facts = new_facts.len(),
			candidates = index.len(),
			operations = operations.len(),
			skipped = plan.skipped.len(),
			"Memory add completed."
		);

		Ok(AddResponse { operations, skipped: plan.skipped })
	}

	async fn extract_facts(
		&self,
		prompt: Vec<Message>,
		conversation: &[Message],
	) -> Result<Vec<String>> {
		let mut messages = prompt;

		messages.extend(conversation.iter().cloned());

		let schema = ResponseSchema::new(FACTS_SCHEMA_NAME, facts::facts_schema());
		let output: FactsOutput = self.generate_json(&messages, &schema).await?;

		Ok(output.into_texts())
	}

	/// Nearest memories of every fact, unioned by id in discovery order.
	async fn retrieve_candidates(
		&self,
		scope: &Scope<'_>,
		new_facts: &[&str],
		embeddings: &HashMap<String, Vec<f32>>,
	) -> Result<CandidateIndex> {
		let mut index = CandidateIndex::new();

		for fact in new_facts {
			let Some(embedding) = embeddings.get(*fact) else {
				continue;
			};
			let hits = self
				.store
				.query(VectorQuery {
					embedding: embedding.clone(),
					limit: self.cfg.memory.candidate_k,
					filter: MemoryFilter {
						org_id: scope.org_id.to_string(),
						user_id: Some(scope.user_id.to_string()),
						agent_id: None,
					},
				})
				.await?;

			for hit in hits {
				index.insert(Candidate {
					id: hit.record.id,
					text: hit.record.memory_text,
					agent_id: hit.record.agent_id,
					score: hit.score,
				});
			}
		}

		Ok(index)
	}

	async fn reconcile_facts(
		&self,
		index: &CandidateIndex,
		new_facts: &[&str],
	) -> Result<ReconcileOutput> {
		let messages = reconcile_messages(&self.cfg.prompts.reconciliation, index, new_facts)?;
		let schema = ResponseSchema::new(RECONCILE_SCHEMA_NAME, reconcile::reconcile_schema());

		self.generate_json(&messages, &schema).await
	}

	async fn apply_op(
		&self,
		scope: &Scope<'_>,
		op: PlannedOp,
		embeddings: &mut HashMap<String, Vec<f32>>,
	) -> Result<MemoryOperation> {
		match op {
			PlannedOp::Add { text } => {
				let embedding = self.embedding_for(&text, embeddings).await?;
				let id = self
					.write_memory(NewMemory {
						id: None,
						org_id: scope.org_id.to_string(),
						user_id: scope.user_id.to_string(),
						agent_id: scope.agent_id.to_string(),
						memory_text: text.clone(),
						embedding,
					})
					.await?;

				tracing::debug!(memory_id = %id, "Memory added.");

				Ok(MemoryOperation::Add { id, text })
			},
			PlannedOp::Update { target, text, old_text } => {
				let embedding = self.embedding_for(&text, embeddings).await?;
				let id = self
					.write_memory(NewMemory {
						id: Some(target.id),
						org_id: scope.org_id.to_string(),
						user_id: scope.user_id.to_string(),
						agent_id: target.agent_id,
						memory_text: text.clone(),
						embedding,
					})
					.await?;

				tracing::debug!(memory_id = %id, "Memory updated.");

				Ok(MemoryOperation::Update { id, old_text, new_text: text })
			},
			PlannedOp::Delete { target } => {
				self.store.delete(scope.org_id, &[target.id]).await?;

				tracing::debug!(memory_id = %target.id, "Memory deleted.");

				Ok(MemoryOperation::Delete { id: target.id })
			},
		}
	}

	/// Embedding computed for an extracted fact, or a fresh one when the generator rephrased it.
	async fn embedding_for(
		&self,
		text: &str,
		embeddings: &mut HashMap<String, Vec<f32>>,
	) -> Result<Vec<f32>> {
		if let Some(embedding) = embeddings.get(text) {
			return Ok(embedding.clone());
		}

		let embedding = self.embed_one(text).await?;

		embeddings.insert(text.to_string(), embedding.clone());

		Ok(embedding)
	}

	async fn write_memory(&self, memory: NewMemory) -> Result<Uuid> {
		self.store
			.add(vec![memory])
			.await?
			.pop()
			.ok_or_else(|| Error::Storage { message: "Store returned no id for a write.".to_string() })
	}
}

fn validate_add_request(req: &AddRequest) -> Result<Scope<'_>> {
	let user_id = crate::require(&req.user_id, "user_id")?;
	let org_id = crate::require(&req.org_id, "org_id")?;
	let agent_id = req.agent_id.as_deref().map(str::trim).unwrap_or_default();

	if req.messages.is_empty() {
		return Err(Error::invalid("messages must contain at least one message."));
	}
	if req.messages.iter().all(|message| message.content.trim().is_empty()) {
		return Err(Error::invalid("messages must contain non-empty content."));
	}

	Ok(Scope { org_id, user_id, agent_id })
}

/// System instruction plus the candidate view and the new facts. Candidates appear by index only.
fn reconcile_messages(
	instruction: &str,
	index: &CandidateIndex,
	new_facts: &[&str],
) -> Result<Vec<Message>> {
	let old_memory = serde_json::to_string_pretty(&index.old_memory_view())
		.map_err(|err| Error::invalid(format!("Failed to render candidate memories: {err}.")))?;
	let new_facts = serde_json::to_string_pretty(new_facts)
		.map_err(|err| Error::invalid(format!("Failed to render new facts: {err}.")))?;

	Ok(vec![
		Message::system(instruction),
		Message::user(format!(
			"Current memory:\n{old_memory}\n\nNew facts:\n{new_facts}\n\nReturn the updated memory."
		)),
	])
}
