//! Same-request mapping between the short indices shown to the text generator and the real
//! memory ids they stand for.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
	pub id: Uuid,
	pub text: String,
	pub agent_id: String,
	pub score: f32,
}

/// One entry of the old-memory view handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedMemory<'a> {
	pub id: &'a str,
	pub text: &'a str,
}

/// Candidates in discovery order, reachable by the index shown to the generator.
#[derive(Debug, Default)]
pub struct CandidateIndex {
	entries: Vec<(String, Candidate)>,
	positions: HashMap<String, usize>,
	seen: HashSet<Uuid>,
}
impl CandidateIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a candidate under the next index. Returns `false` and keeps the first
	/// occurrence when the id is already known.
	pub fn insert(&mut self, candidate: Candidate) -> bool {
		if !self.seen.insert(candidate.id) {
			return false;
		}

		let position = self.entries.len();
		let index = position.to_string();

		self.positions.insert(index.clone(), position);
		self.entries.push((index, candidate));

		true
	}

	pub fn resolve(&self, index: &str) -> Option<&Candidate> {
		let position = *self.positions.get(index.trim())?;

		self.entries.get(position).map(|(_, candidate)| candidate)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// The view the generator sees. Real ids never appear in it.
	pub fn old_memory_view(&self) -> Vec<IndexedMemory<'_>> {
		self.entries
			.iter()
			.map(|(index, candidate)| IndexedMemory { id: index, text: &candidate.text })
			.collect()
	}
}

impl FromIterator<Candidate> for CandidateIndex {
	fn from_iter<T: IntoIterator<Item = Candidate>>(iter: T) -> Self {
		let mut index = Self::new();

		for candidate in iter {
			index.insert(candidate);
		}

		index
	}
}
