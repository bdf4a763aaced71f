use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use scout_domain::{candidates, candidates::ScoredCandidate, status::RunStatus};

use crate::{CompileOutcome, Error, Result, ScoutService};

/// Result of `start`: a page of candidate ids, or the engine's
/// clarification payload when the query was too vague to compile.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartOutcome {
	Page {
		next_page_idx: i32,
		candidate_ids: Vec<String>,
		new_search: bool,
		charged: bool,
	},
	NeedsClarification {
		payload: Value,
	},
}

/// Read-only slice of the authoritative cached ranking.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PageSlice {
	pub next_page_idx: i32,
	pub candidate_ids: Vec<String>,
	pub total: usize,
}

impl ScoutService {
	/// Serves page `page_idx` of a run. Later pages slice the cached
	/// ranking when enough good-enough entries remain; otherwise the full
	/// pipeline runs (compile → execute with escalation → rerank) and the
	/// result is cached. Re-requesting an already-seen page returns the
	/// same ids without charging again.
	pub async fn start(&self, run_id: Uuid, page_idx: i32) -> Result<StartOutcome> {
		if page_idx < 0 {
			return Err(Error::InvalidRequest {
				message: "page_idx must be zero or greater.".to_string(),
			});
		}

		let page_size = self.cfg.paging.page_size as usize;
		let boundary_window = self.cfg.paging.boundary_window as usize;
		let next_page_idx = page_idx + 1;
		let mut offset = 0i64;
		let mut cached_tail: Vec<ScoredCandidate> = Vec::new();

		if page_idx > 0 {
			let Some(prev) = self.stores.pages.page_at(run_id, page_idx - 1).await? else {
				return Ok(StartOutcome::Page {
					next_page_idx,
					candidate_ids: Vec::new(),
					new_search: false,
					charged: false,
				});
			};

			if prev.entries.is_empty() {
				return Ok(StartOutcome::Page {
					next_page_idx,
					candidate_ids: Vec::new(),
					new_search: false,
					charged: false,
				});
			}

			let rest: Vec<ScoredCandidate> =
				prev.entries.iter().skip(page_size).cloned().collect();
			let on_boundary =
				(prev.entries.len() + page_idx as usize * page_size) % boundary_window == 0;

			if !on_boundary {
				return self.serve_cached_slice(run_id, page_idx, rest).await;
			}

			// Boundary: serve the cached tail only while its next slice
			// still clears the quality threshold; otherwise re-search with
			// an offset and merge the tail back in afterwards.
			let tail_score: f64 =
				rest.iter().take(page_size).map(|candidate| candidate.score).sum();

			if tail_score >= self.cfg.paging.tail_score_threshold {
				return self.serve_cached_slice(run_id, page_idx, rest).await;
			}

			info!(
				run_id = %run_id,
				page_idx,
				tail_score,
				"Cached tail quality below threshold; launching a broader search."
			);

			offset = boundary_window as i64;
			cached_tail = rest;
		}

		let run = self.stores.runs.fetch(run_id).await?;

		if run.status.is_stopped() {
			return Err(Error::Canceled);
		}
		if !run.status.accepts_start() {
			return Err(Error::InvalidRequest {
				message: format!("Run is already in progress ({}).", run.status),
			});
		}

		let sql = match &run.compiled_sql {
			Some(sql) => sql.clone(),
			None => match self.compile_query(&run, "").await? {
				CompileOutcome::Expression(sql) => {
					self.stores.runs.set_compiled_sql(run.id, &sql).await?;

					sql
				},
				CompileOutcome::NeedsClarification(payload) => {
					return Ok(StartOutcome::NeedsClarification { payload });
				},
			},
		};

		let retrieved = self.execute_with_escalation(&run, &sql, offset).await?;

		// Confirmed empty result: finish immediately, skip reranking, and
		// charge nothing.
		if retrieved.records.is_empty() {
			self.stores.runs.update_status(run.id, RunStatus::Finished).await?;

			return Ok(StartOutcome::Page {
				next_page_idx,
				candidate_ids: Vec::new(),
				new_search: true,
				charged: false,
			});
		}

		let scored =
			self.rerank_candidates(&run, retrieved.records, retrieved.review_cap).await?;
		let merged = if cached_tail.is_empty() {
			scored
		} else {
			let merged = candidates::merge_with_cache(scored, &cached_tail);

			// Persist the merged superset as the new authoritative row so
			// later pages slice the union, not just the fresh results.
			self.stores.pages.insert_page(run_id, 0, &merged).await?;

			merged
		};

		self.stores.runs.update_status(run.id, RunStatus::Finished).await?;

		let charged = self.stores.runs.advance_seen_page(run_id, page_idx).await?;
		let candidate_ids =
			merged.iter().take(page_size).map(|candidate| candidate.id.clone()).collect();

		Ok(StartOutcome::Page { next_page_idx, candidate_ids, new_search: true, charged })
	}

	/// Read-only paging over the latest authoritative ranking; never
	/// triggers a search and never charges.
	pub async fn read_page(&self, run_id: Uuid, page_idx: i32) -> Result<PageSlice> {
		if page_idx < 0 {
			return Err(Error::InvalidRequest {
				message: "page_idx must be zero or greater.".to_string(),
			});
		}

		let page_size = self.cfg.paging.page_size as usize;
		let entries = self
			.stores
			.pages
			.latest_page(run_id)
			.await?
			.map(|page| page.entries)
			.unwrap_or_default();
		let start = page_idx as usize * page_size;
		let candidate_ids = entries
			.iter()
			.skip(start)
			.take(page_size)
			.map(|candidate| candidate.id.clone())
			.collect();

		Ok(PageSlice { next_page_idx: page_idx + 1, candidate_ids, total: entries.len() })
	}

	async fn serve_cached_slice(
		&self,
		run_id: Uuid,
		page_idx: i32,
		rest: Vec<ScoredCandidate>,
	) -> Result<StartOutcome> {
		self.ensure_active(run_id).await?;
		self.stores.pages.insert_page(run_id, page_idx, &rest).await?;

		let charged = self.stores.runs.advance_seen_page(run_id, page_idx).await?;
		let page_size = self.cfg.paging.page_size as usize;
		let candidate_ids =
			rest.iter().take(page_size).map(|candidate| candidate.id.clone()).collect();

		Ok(StartOutcome::Page {
			next_page_idx: page_idx + 1,
			candidate_ids,
			new_search: false,
			charged,
		})
	}
}
