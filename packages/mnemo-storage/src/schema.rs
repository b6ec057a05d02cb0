pub fn render_schema(vector_dim: u32) -> String {
	let init = include_str!("../../../sql/init.sql");
	let expanded = expand_includes(init);

	expanded.replace("<VECTOR_DIM>", &vector_dim.to_string())
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_memories.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_memories.sql")),
				"tables/002_prompts.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_prompts.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_are_expanded_and_dimension_substituted() {
		let sql = render_schema(1_536);

		assert!(!sql.contains("\\ir "));
		assert!(!sql.contains("<VECTOR_DIM>"));
		assert!(sql.contains("vector(1536)"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS memories"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS prompts"));
	}
}
