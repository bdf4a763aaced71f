use scout_domain::{candidates as candidate_sets, candidates::CandidateRecord, status::RunStatus};
use scout_providers::payload;
use tracing::warn;

use crate::{
	Error, Result, RunSnapshot, ScoutService,
	compile::{ensure_group_by, sanitize_expression},
};

/// Output of the escalation ladder: the deduplicated candidate union and
/// the review cap, which grows when the fallback tier enlarges the limit.
#[derive(Debug)]
pub(crate) struct RetrievedSet {
	pub(crate) records: Vec<CandidateRecord>,
	pub(crate) review_cap: usize,
}

const REPAIR_SYSTEM: &str =
	"You are a specialized SQL query fixing assistant. Fix errors and return a single SQL \
statement only.";

const TIMEOUT_DIRECTIVE: &str = "\
The query timed out. Rewrite it for performance: replace correlated work with \
EXISTS subqueries, drop redundant joins, and keep the result set identical or \
broader.";

const BROADEN_DIRECTIVE: &str = "\
The query matched too few candidates. Broaden the constraints: relax exact \
matches into pattern matches, widen date ranges, and add synonyms, while \
keeping the original intent.";

const FALLBACK_SYSTEM: &str = "You are a recruitment search expert. Your goal is to maximize \
candidate recall using broad full-text search keywords.";

const FALLBACK_RULES: &str = "\
Produce a PostgreSQL full-text retrieval over the candidates table:
- Use `websearch_to_tsquery('simple', ...)` against the `fts` column with \
broad OR'd keywords and synonyms derived from the request.
- Select `id` and `ts_rank_cd(fts, <query>) AS fts_rank`.
- Return ONLY a JSON object of the shape {\"sql\": \"SELECT ...\"}.";

impl ScoutService {
	/// Runs the compiled expression through up to three tiers: primary,
	/// LLM repair, and broad keyword fallback. Each tier transition writes
	/// the run status before the next engine call so a polling client never
	/// observes a stale stage during a long external call.
	pub(crate) async fn execute_with_escalation(
		&self,
		run: &RunSnapshot,
		sql: &str,
		offset: i64,
	) -> Result<RetrievedSet> {
		let search_cfg = &self.cfg.search;
		let timeout_ms = search_cfg.statement_timeout_ms;
		let mut limit = i64::from(search_cfg.limit);
		let mut review_cap = self.cfg.rerank.review_cap as usize;

		// Tier 0: the compiled expression as-is.
		self.stores.runs.update_status(run.id, RunStatus::Running).await?;

		let mut records = Vec::new();
		let mut last_error = None;

		match self.stores.candidates.execute(sql, limit, offset, timeout_ms).await {
			Ok(rows) => records = candidate_sets::dedupe(rows),
			Err(err) => {
				warn!(run_id = %run.id, error = %err, "Primary retrieval failed.");
				last_error = Some(err);
			},
		}

		self.ensure_active(run.id).await?;

		// Tier 1: targeted repair when the primary tier errored or came
		// back deficient.
		let deficient = records.len() < search_cfg.min_viable_count as usize;

		if last_error.is_some() || deficient {
			let tier_status = if last_error.is_some() {
				RunStatus::Error
			} else {
				RunStatus::Expanding
			};

			self.stores.runs.update_status(run.id, tier_status).await?;

			match self.repair_query(run, sql, last_error.as_ref()).await {
				Ok(repaired) => {
					self.stores.runs.set_compiled_sql(run.id, &repaired).await?;
					self.ensure_active(run.id).await?;

					match self.stores.candidates.execute(&repaired, limit, offset, timeout_ms).await
					{
						Ok(rows) => {
							records.extend(rows);
							records = candidate_sets::dedupe(records);
							last_error = None;
						},
						Err(err) => {
							warn!(run_id = %run.id, error = %err, "Repaired retrieval failed.");
							last_error = Some(err);
						},
					}
				},
				Err(Error::Canceled) => return Err(Error::Canceled),
				Err(err) => {
					// An unreachable engine counts as a tier failure; the
					// fallback tier still gets its chance.
					warn!(run_id = %run.id, error = %err, "Repair pass failed.");
				},
			}

			self.ensure_active(run.id).await?;
		}

		// Tier 2: broad keyword retrieval, independent of the structured
		// draft, with an enlarged limit.
		let still_deficient = records.len() < search_cfg.fallback_min_count as usize;

		if last_error.is_some() || still_deficient {
			self.stores.runs.update_status(run.id, RunStatus::Expanding).await?;

			limit += i64::from(search_cfg.fallback_extra_limit);
			review_cap += search_cfg.fallback_extra_limit as usize;

			let fallback_sql = match self.fallback_query(run).await {
				Ok(sql) => sql,
				Err(Error::Canceled) => return Err(Error::Canceled),
				Err(err) => {
					self.stores.runs.update_status(run.id, RunStatus::Error).await?;

					return Err(Error::ExecutionFailure { message: err.to_string() });
				},
			};

			self.stores.runs.set_compiled_sql(run.id, &fallback_sql).await?;
			self.ensure_active(run.id).await?;

			match self.stores.candidates.execute(&fallback_sql, limit, offset, timeout_ms).await {
				Ok(rows) => {
					records.extend(rows);
					records = candidate_sets::dedupe(records);
				},
				Err(err) => {
					// All tiers are spent: park the run in a visible,
					// non-terminal error state and surface the failure.
					self.stores.runs.update_status(run.id, RunStatus::Error).await?;

					return Err(Error::ExecutionFailure { message: err.to_string() });
				},
			}

			self.ensure_active(run.id).await?;
		}

		Ok(RetrievedSet { records, review_cap })
	}

	async fn repair_query(
		&self,
		run: &RunSnapshot,
		original_sql: &str,
		error: Option<&scout_storage::Error>,
	) -> Result<String> {
		let directive = match error {
			Some(err) if err.is_timeout() => TIMEOUT_DIRECTIVE,
			_ => BROADEN_DIRECTIVE,
		};
		let mut prompt = format!(
			"You are an expert PostgreSQL SQL fixer for a recruitment candidate search system.
{directive}

[Input for search from user]
criteria: {criteria}
input text for searching: {query}

[Original SQL]
{original_sql}",
			criteria = run.criteria.join(", "),
			query = run.query_text,
		);

		if let Some(err) = error {
			prompt.push_str(&format!("\n\n[ERROR]\n{err}\n"));
		}

		let raw = self
			.providers
			.reason
			.invoke(&self.cfg.engines.planner, REPAIR_SYSTEM, &prompt)
			.await?;

		self.ensure_active(run.id).await?;

		Ok(ensure_group_by(&sanitize_expression(&raw)?))
	}

	/// Builds the tier-2 retrieval: a broad FTS keyword query joined back
	/// to the candidates table, ordered by relevance rank.
	async fn fallback_query(&self, run: &RunSnapshot) -> Result<String> {
		let prompt = format!(
			"{FALLBACK_RULES}
[Input for search from user]
criteria: {criteria}
input text for searching: {query}",
			criteria = run.criteria.join(", "),
			query = run.query_text,
		);
		let raw = self
			.providers
			.reason
			.invoke(&self.cfg.engines.fallback, FALLBACK_SYSTEM, &prompt)
			.await?;

		self.ensure_active(run.id).await?;

		let inner = payload::extract_json(&raw)
			.and_then(|value| value.get("sql").and_then(|sql| sql.as_str()).map(str::to_string))
			.ok_or_else(|| Error::Provider {
				message: "Fallback engine returned no usable SQL payload.".to_string(),
			})?;
		let inner = sanitize_expression(&inner)?;

		Ok(format!(
			"\
WITH identified_ids AS (
{inner}
)
SELECT
	c.id::text AS id,
	c.name,
	i.fts_rank
FROM identified_ids i
JOIN candidates c ON c.id = i.id
ORDER BY i.fts_rank DESC"
		))
	}
}
