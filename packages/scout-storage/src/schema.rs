pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_runs.sql" => out.push_str(include_str!("../../../sql/tables/001_runs.sql")),
				"tables/002_run_pages.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_run_pages.sql")),
				"tables/003_judgment_summaries.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_judgment_summaries.sql")),
				"tables/004_candidates.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_candidates.sql")),
				"tables/005_candidate_experience.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_candidate_experience.sql")),
				"tables/006_candidate_education.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_candidate_education.sql")),
				"tables/007_candidate_publications.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_candidate_publications.sql")),
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
	fn expands_every_include() {
		let schema = render_schema();

		assert!(!schema.contains("\\ir "));
		for table in [
			"runs",
			"run_pages",
			"judgment_summaries",
			"candidates",
			"candidate_experience",
			"candidate_education",
			"candidate_publications",
		] {
			assert!(
				schema.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
				"Schema is missing table {table}."
			);
		}
	}
}
