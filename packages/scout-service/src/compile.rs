use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use scout_domain::status::RunStatus;
use scout_providers::payload;

use crate::{Error, Result, RunSnapshot, ScoutService};

/// Result of query compilation: an executable filter expression, or a typed
/// clarification payload when the engine asks the recruiter a question
/// instead of producing SQL.
#[derive(Clone, Debug)]
pub enum CompileOutcome {
	Expression(String),
	NeedsClarification(Value),
}

const GENERATE_SYSTEM: &str = "You are a head-hunting expert and SQL query parser. Your input is \
a natural-language request describing criteria for searching job candidates.";

const GENERATE_RULES: &str = "\
Translate the request into a PostgreSQL filter for the candidate database.

Schema:
- candidates(id, name, headline, location)
- candidate_experience(candidate_id, company, title, description, started_at, ended_at)
- candidate_education(candidate_id, school, degree, field, started_at, ended_at)
- candidate_publications(candidate_id, title, venue, published_at)

Rules:
- Output ONLY the JOIN/WHERE clause to append after `FROM candidates AS T1`.
- Filter-only: never emit INSERT, UPDATE, DELETE, DROP, or any DDL.
- Expand role and industry terms with common synonyms (e.g. fintech: \
payments, banking, lending) using ILIKE patterns.
- Prefer broad matching over narrow matching; downstream review filters \
precisely.
- If the request is too vague to search at all, output a JSON object \
{\"clarify\": \"<question for the recruiter>\"} instead of SQL.";

const REFINE_SYSTEM: &str =
	"You are a SQL query refinement expert, for stable and fast search.";

const REFINE_RULES: &str = "\
Rewrite the SQL query below for execution efficiency WITHOUT changing which \
rows match:
- Convert implicit joins on child tables into EXISTS subqueries.
- Collapse chains of OR'd ILIKE patterns on the same column into index-friendly \
set membership or a single pattern where possible.
- Make sure a full-text ranking term on candidates.fts is present so results \
can be ordered by relevance.
- Return a single SELECT statement only, no commentary.";

static DESTRUCTIVE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\b(insert|update|delete|drop|alter|truncate|grant|revoke|create)\b")
		.expect("Destructive-statement pattern must compile.")
});

static AGGREGATE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\b(count|sum|avg|min|max|array_agg|string_agg)\s*\(")
		.expect("Aggregate pattern must compile.")
});

impl ScoutService {
	/// Two-phase compilation: a generate pass drafts the filter clause, a
	/// refine pass rewrites the full statement for execution efficiency.
	/// Both phases check cancellation after returning from the engine.
	pub(crate) async fn compile_query(
		&self,
		run: &RunSnapshot,
		extra_context: &str,
	) -> Result<CompileOutcome> {
		self.stores.runs.update_status(run.id, RunStatus::Parsing).await?;

		let mut prompt = format!(
			"{GENERATE_RULES}\nNatural language query: {query}\nCriteria: {criteria}",
			query = run.query_text,
			criteria = run.criteria.join(", "),
		);

		if !extra_context.is_empty() {
			prompt.push_str("\nExtra context: ");
			prompt.push_str(extra_context);
		}

		let draft = self
			.providers
			.reason
			.invoke(&self.cfg.engines.planner, GENERATE_SYSTEM, &prompt)
			.await
			.map_err(|err| Error::CompileFailure { message: err.to_string() })?;

		self.ensure_active(run.id).await?;

		// A JSON-object reply is the engine asking for clarification.
		if let Ok(value) = serde_json::from_str::<Value>(payload::strip_code_fence(&draft))
			&& value.is_object()
		{
			return Ok(CompileOutcome::NeedsClarification(value));
		}

		let clause = sanitize_expression(&draft)?;
		let scaffolded = ensure_group_by(&wrap_in_scaffold(&clause));

		self.stores.runs.update_status(run.id, RunStatus::Refine).await?;

		let refine_prompt = format!("{REFINE_RULES}\nInput SQL query: \"\"\"{scaffolded}\"\"\"");
		let refined = self
			.providers
			.reason
			.invoke(&self.cfg.engines.planner, REFINE_SYSTEM, &refine_prompt)
			.await
			.map_err(|err| Error::CompileFailure { message: err.to_string() })?;

		self.ensure_active(run.id).await?;

		// A refine pass that produced nothing usable falls back to the
		// scaffolded draft; the execution controller repairs downstream.
		let final_sql = match sanitize_expression(&refined) {
			Ok(sql) if !sql.is_empty() => sql,
			_ => scaffolded,
		};

		Ok(CompileOutcome::Expression(final_sql))
	}
}

/// Normalizes engine output into a best-effort SQL fragment: fences
/// stripped, trailing semicolon dropped. Destructive statements are the one
/// hard rejection; everything else is left for the execution controller to
/// repair.
pub(crate) fn sanitize_expression(raw: &str) -> Result<String> {
	let cleaned = payload::strip_code_fence(raw).trim().trim_end_matches(';').trim().to_string();

	if DESTRUCTIVE.is_match(&cleaned) {
		return Err(Error::CompileFailure {
			message: "Engine produced a destructive statement.".to_string(),
		});
	}

	Ok(cleaned)
}

pub(crate) fn wrap_in_scaffold(clause: &str) -> String {
	format!(
		"\
SELECT DISTINCT ON (T1.id)
	T1.id::text AS id,
	T1.name,
	T1.headline,
	T1.location
FROM
	candidates AS T1
{clause}"
	)
}

/// Drafts that aggregate over joined child rows need a GROUP BY the model
/// routinely forgets; add one over the selected columns when missing.
pub(crate) fn ensure_group_by(sql: &str) -> String {
	let lowered = sql.to_lowercase();

	if !AGGREGATE.is_match(sql) || lowered.contains("group by") {
		return sql.to_string();
	}

	format!("{sql}\nGROUP BY T1.id, T1.name, T1.headline, T1.location")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sanitize_strips_fence_and_semicolon() {
		let raw = "```sql\nWHERE T1.location ILIKE '%seoul%';\n```";

		assert_eq!(
			sanitize_expression(raw).expect("sanitize failed"),
			"WHERE T1.location ILIKE '%seoul%'"
		);
	}

	#[test]
	fn sanitize_rejects_destructive_statements() {
		let raw = "DROP TABLE candidates";

		assert!(matches!(
			sanitize_expression(raw),
			Err(Error::CompileFailure { .. })
		));
	}

	#[test]
	fn sanitize_allows_update_like_words() {
		// Word-boundary match: "updated" is not the UPDATE keyword.
		let raw = "WHERE T1.id IN (SELECT candidate_id FROM candidate_experience WHERE description ILIKE '%updated the billing stack%')";

		assert!(sanitize_expression(raw).is_ok());
	}

	#[test]
	fn scaffold_selects_text_ids() {
		let sql = wrap_in_scaffold("WHERE T1.name ILIKE '%kim%'");

		assert!(sql.starts_with("SELECT DISTINCT ON (T1.id)"));
		assert!(sql.contains("T1.id::text AS id"));
		assert!(sql.ends_with("WHERE T1.name ILIKE '%kim%'"));
	}

	#[test]
	fn group_by_added_only_for_aggregates() {
		let plain = wrap_in_scaffold("WHERE T1.name ILIKE '%kim%'");

		assert_eq!(ensure_group_by(&plain), plain);

		let aggregated = wrap_in_scaffold(
			"JOIN candidate_experience e ON e.candidate_id = T1.id\nWHERE true\nHAVING count(e.id) > 2",
		);
		let guarded = ensure_group_by(&aggregated);

		assert!(guarded.contains("GROUP BY T1.id, T1.name, T1.headline, T1.location"));
		assert_eq!(ensure_group_by(&guarded), guarded);
	}
}
