//! Rendering of embeddings into pgvector's text form, plus the similarity used by the
//! in-process store.

pub fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);

	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

/// `1 - cosine distance`, matching pgvector's `<=>`. Degenerate inputs score zero.
pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> f32 {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return 0.0;
	}

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return 0.0;
	}

	dot / (lhs_norm.sqrt() * rhs_norm.sqrt())
}
