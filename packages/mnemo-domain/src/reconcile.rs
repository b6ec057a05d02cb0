use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::candidates::{Candidate, CandidateIndex};

pub const RECONCILE_SCHEMA_NAME: &str = "memory_reconciliation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryEvent {
	Add,
	Update,
	Delete,
	None,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileOutput {
	pub memory: Vec<ReconcileItem>,
}

/// One decision as emitted by the generator. `id` is a candidate index, never a real id.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileItem {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub text: String,
	pub event: MemoryEvent,
	#[serde(default)]
	pub old_memory: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedOp {
	Add { text: String },
	Update { target: Candidate, text: String, old_text: String },
	Delete { target: Candidate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
	MissingId,
	UnknownId,
	EmptyText,
	/// An earlier DELETE in the same output already removed the target.
	AlreadyDeleted,
}

/// An instruction dropped without touching storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedInstruction {
	pub event: MemoryEvent,
	pub index: Option<String>,
	pub text: String,
	pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct ReconcilePlan {
	pub ops: Vec<PlannedOp>,
	pub skipped: Vec<SkippedInstruction>,
}

/// JSON schema for `{memory: [{id, text, event, old_memory}]}`. Optional members are
/// nullable so strict structured decoding can require every key.
pub fn reconcile_schema() -> Value {
	serde_json::json!({
		"type": "object",
		"properties": {
			"memory": {
				"type": "array",
				"items": {
					"type": "object",
					"properties": {
						"id": { "type": ["string", "null"] },
						"text": { "type": "string" },
						"event": { "type": "string", "enum": ["ADD", "UPDATE", "DELETE", "NONE"] },
						"old_memory": { "type": ["string", "null"] }
					},
					"required": ["id", "text", "event", "old_memory"],
					"additionalProperties": false
				}
			}
		},
		"required": ["memory"],
		"additionalProperties": false
	})
}

/// Translates generator decisions into storage operations, in emission order.
///
/// UPDATE and DELETE must name an index present in `index` that no earlier DELETE in the same
/// output removed; anything else is recorded in `skipped` and produces no operation.
pub fn plan(items: Vec<ReconcileItem>, index: &CandidateIndex) -> ReconcilePlan {
	let mut plan = ReconcilePlan::default();
	let mut deleted: HashSet<Uuid> = HashSet::new();

	for item in items {
		let ReconcileItem { id, text, event, old_memory } = item;
		let text = text.trim().to_string();
		let skip = |reason| SkippedInstruction {
			event,
			index: id.clone(),
			text: text.clone(),
			reason,
		};

		match event {
			MemoryEvent::None => {},
			MemoryEvent::Add => {
				if text.is_empty() {
					plan.skipped.push(skip(SkipReason::EmptyText));

					continue;
				}

				plan.ops.push(PlannedOp::Add { text });
			},
			MemoryEvent::Update | MemoryEvent::Delete => {
				let Some(raw_index) = id.as_deref().filter(|value| !value.trim().is_empty())
				else {
					plan.skipped.push(skip(SkipReason::MissingId));

					continue;
				};
				let Some(target) = index.resolve(raw_index).cloned() else {
					plan.skipped.push(skip(SkipReason::UnknownId));

					continue;
				};

				if deleted.contains(&target.id) {
					plan.skipped.push(skip(SkipReason::AlreadyDeleted));

					continue;
				}
				if event == MemoryEvent::Delete {
					deleted.insert(target.id);
					plan.ops.push(PlannedOp::Delete { target });

					continue;
				}
				if text.is_empty() {
					plan.skipped.push(skip(SkipReason::EmptyText));

					continue;
				}

				let old_text = old_memory
					.map(|value| value.trim().to_string())
					.filter(|value| !value.is_empty())
					.unwrap_or_else(|| target.text.clone());

				plan.ops.push(PlannedOp::Update { target, text, old_text });
			},
		}
	}

	plan
}
