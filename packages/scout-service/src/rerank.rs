use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use scout_config::EngineConfig;
use scout_domain::{
	candidates::{self, CandidateRecord, ScoredCandidate},
	judgment, score,
	status::RunStatus,
};

use crate::{Providers, Result, RunSnapshot, ScoutService, Stores, concurrency, ensure_not_stopped};

const JUDGE_SYSTEM: &str = "You are a recruitment reviewer. You judge whether a candidate \
satisfies each hiring criterion based only on the profile given to you.";

/// One scored candidate plus the raw judgment text destined for the
/// summary cache. A `None` summary means the judge call failed and the
/// candidate failed open.
struct Scored {
	id: String,
	score: f64,
	summary: Option<String>,
}

/// Shared append-then-flush buffer. Workers complete in any order; pushes
/// and flushes happen under one lock, so cache writes are strictly
/// sequential and always score-sorted.
struct FlushState {
	stack: Vec<Scored>,
	total: Vec<ScoredCandidate>,
	page_id: Option<i64>,
	streamed: bool,
}

impl ScoutService {
	/// Scores the retrieved set against the run's criteria with a bounded
	/// fan-out, streaming partial results into the page cache as batches
	/// complete. Individual scoring failures never abort the batch; cache
	/// write failures log and continue.
	pub(crate) async fn rerank_candidates(
		&self,
		run: &RunSnapshot,
		records: Vec<CandidateRecord>,
		review_cap: usize,
	) -> Result<Vec<ScoredCandidate>> {
		self.stores.runs.update_status(run.id, RunStatus::Reranking).await?;

		let capped: Vec<CandidateRecord> = records.into_iter().take(review_cap).collect();
		let ids: Vec<String> = capped.iter().map(|record| record.id.clone()).collect();
		// Profile context is best-effort: a failed lookup degrades the
		// judge prompt to display fields instead of aborting the batch.
		let mut profiles: HashMap<String, Value> =
			match self.stores.candidates.profiles(&ids).await {
				Ok(pairs) => pairs.into_iter().collect(),
				Err(err) => {
					warn!(run_id = %run.id, error = %err, "Profile lookup failed.");
					HashMap::new()
				},
			};

		let flush_batch_size = self.cfg.rerank.flush_batch as usize;
		let concurrency_limit = self.cfg.rerank.concurrency as usize;
		let state = Arc::new(Mutex::new(FlushState {
			stack: Vec::new(),
			total: Vec::new(),
			page_id: None,
			streamed: false,
		}));
		let criteria = Arc::new(run.criteria.clone());
		let query_text = Arc::new(run.query_text.clone());
		let judge_cfg = Arc::new(self.cfg.engines.judge.clone());
		let providers = self.providers.clone();
		let stores = self.stores.clone();
		let run_id = run.id;

		let inputs: Vec<(CandidateRecord, Option<Value>)> = capped
			.into_iter()
			.map(|record| {
				let profile = profiles.remove(&record.id);

				(record, profile)
			})
			.collect();
		let worker_state = state.clone();

		concurrency::map_bounded(inputs, concurrency_limit, move |(record, profile)| {
			let state = worker_state.clone();
			let criteria = criteria.clone();
			let query_text = query_text.clone();
			let judge_cfg = judge_cfg.clone();
			let providers = providers.clone();
			let stores = stores.clone();

			async move {
				score_one(ScoreOneArgs {
					record,
					profile,
					state,
					criteria,
					query_text,
					judge_cfg,
					providers,
					stores,
					run_id,
					flush_batch_size,
				})
				.await
			}
		})
		.await?;

		// Everything scored: flush the remainder, then run the fairness
		// pass and persist the authoritative ranked list.
		let mut guard = state.lock().await;

		flush(&self.stores, run.id, &mut guard).await?;

		let mut final_list = guard.total.clone();

		drop(guard);

		candidates::shuffled_resort(&mut final_list, candidates::run_seed(run.id));
		self.ensure_active(run.id).await?;
		self.stores.pages.insert_page(run.id, 0, &final_list).await?;

		Ok(final_list)
	}
}

struct ScoreOneArgs {
	record: CandidateRecord,
	profile: Option<Value>,
	state: Arc<Mutex<FlushState>>,
	criteria: Arc<Vec<String>>,
	query_text: Arc<String>,
	judge_cfg: Arc<EngineConfig>,
	providers: Providers,
	stores: Stores,
	run_id: Uuid,
	flush_batch_size: usize,
}

async fn score_one(args: ScoreOneArgs) -> Result<ScoredCandidate> {
	let ScoreOneArgs {
		record,
		profile,
		state,
		criteria,
		query_text,
		judge_cfg,
		providers,
		stores,
		run_id,
		flush_batch_size,
	} = args;

	// Checkpoint before the engine call.
	ensure_not_stopped(&stores, run_id).await?;

	let prompt = judge_prompt(&criteria, &query_text, &record, profile.as_ref());
	let summary = match providers.reason.invoke(&judge_cfg, JUDGE_SYSTEM, &prompt).await {
		Ok(text) => Some(text),
		Err(err) => {
			warn!(run_id = %run_id, candidate_id = %record.id, error = %err, "Judgment failed; candidate fails open.");
			None
		},
	};
	let lines = summary.as_deref().map(judgment::parse_judgment).unwrap_or_default();
	let candidate_score = score::score(judgment::points_total(&lines), criteria.len());
	let scored = ScoredCandidate { id: record.id.clone(), score: candidate_score };

	let mut state = state.lock().await;

	state.stack.push(Scored { id: record.id, score: candidate_score, summary });

	if state.stack.len() >= flush_batch_size {
		flush(&stores, run_id, &mut state).await?;
	}

	Ok(scored)
}

/// Drains the buffer: upserts judgment summaries, merges the batch into the
/// running total, re-sorts, and overwrites the evolving page-0 row. The
/// first successful page write flips the run into the streaming sub-state.
async fn flush(stores: &Stores, run_id: Uuid, state: &mut FlushState) -> Result<()> {
	if state.stack.is_empty() {
		return Ok(());
	}

	// Checkpoint before cache writes.
	ensure_not_stopped(stores, run_id).await?;

	let batch: Vec<Scored> = state.stack.drain(..).collect();
	let summaries: Vec<(String, String)> = batch
		.iter()
		.filter_map(|scored| {
			scored.summary.as_ref().map(|text| (scored.id.clone(), text.clone()))
		})
		.collect();

	if let Err(err) = stores.pages.upsert_summaries(run_id, &summaries).await {
		warn!(run_id = %run_id, error = %err, "Summary cache write failed; continuing.");
	}

	state
		.total
		.extend(batch.into_iter().map(|scored| ScoredCandidate { id: scored.id, score: scored.score }));
	candidates::sort_by_score(&mut state.total);

	let page_write = match state.page_id {
		Some(page_id) => stores.pages.update_page(page_id, &state.total).await,
		None => match stores.pages.insert_page(run_id, 0, &state.total).await {
			Ok(page_id) => {
				state.page_id = Some(page_id);

				Ok(())
			},
			Err(err) => Err(err),
		},
	};

	match page_write {
		Ok(()) => {
			if !state.streamed {
				stores.runs.update_status(run_id, RunStatus::RerankingStreaming).await?;
				state.streamed = true;
			}
		},
		Err(err) => {
			// The client re-derives state from the next successful write.
			warn!(run_id = %run_id, error = %err, "Page cache write failed; continuing.");
		},
	}

	Ok(())
}

fn judge_prompt(
	criteria: &[String],
	query_text: &str,
	record: &CandidateRecord,
	profile: Option<&Value>,
) -> String {
	let context = profile.cloned().unwrap_or_else(|| {
		serde_json::json!({
			"name": record.name,
			"headline": record.headline,
			"location": record.location
		})
	});
	let criteria_lines: String = criteria
		.iter()
		.enumerate()
		.map(|(idx, criterion)| format!("{}. {criterion}\n", idx + 1))
		.collect();

	format!(
		"\
Judge the candidate below against each criterion.

Search request: {query_text}

Criteria:
{criteria_lines}
Candidate profile:
{profile}

Return ONLY a JSON array with one object per criterion, in the criteria \
order, of the shape:
[{{\"criterion\": \"<criterion text>\", \"verdict\": \"satisfied\" | \"ambiguous\" | \"unsatisfied\", \"evidence\": \"<short quote or reasoning>\"}}]
Use \"ambiguous\" when the profile gives insufficient evidence.",
		profile = serde_json::to_string_pretty(&context).unwrap_or_else(|_| context.to_string()),
	)
}
