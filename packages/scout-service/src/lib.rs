pub mod compile;
pub mod concurrency;
pub mod execute;
pub mod pages;
pub mod rerank;

mod error;

pub use compile::CompileOutcome;
pub use error::{Error, Result};
pub use pages::{PageSlice, StartOutcome};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use uuid::Uuid;

use scout_config::{Config, EngineConfig};
use scout_domain::{
	candidates::{CandidateRecord, ScoredCandidate},
	status::{Feedback, RunStatus},
};
use scout_storage::{db::Db, models::CandidateRow};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The service-level view of a run row: criteria decoded, status parsed.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RunSnapshot {
	pub id: Uuid,
	pub query_id: Uuid,
	pub query_text: String,
	pub criteria: Vec<String>,
	pub compiled_sql: Option<String>,
	pub status: RunStatus,
	pub feedback: Feedback,
	pub seen_page_idx: i32,
}

#[derive(Clone, Debug)]
pub struct NewRun {
	pub id: Uuid,
	pub query_id: Uuid,
	pub query_text: String,
	pub criteria: Vec<String>,
}

/// A cached page row: the ranked `(identity, score)` superset for a run.
#[derive(Clone, Debug)]
pub struct CachedPage {
	pub id: i64,
	pub page_idx: i32,
	pub entries: Vec<ScoredCandidate>,
}

/// Opaque reasoning engine. Possibly slow, possibly failing, never assumed
/// deterministic; callers parse the returned text defensively.
pub trait ReasonProvider
where
	Self: Send + Sync,
{
	fn invoke<'a>(
		&'a self,
		cfg: &'a EngineConfig,
		system_instructions: &'a str,
		user_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// The candidate store. `execute` must distinguish statement timeouts and
/// syntax errors from other failures through the storage error type.
pub trait CandidateStore
where
	Self: Send + Sync,
{
	fn execute<'a>(
		&'a self,
		expression: &'a str,
		limit: i64,
		offset: i64,
		statement_timeout_ms: u64,
	) -> BoxFuture<'a, scout_storage::Result<Vec<CandidateRecord>>>;

	fn profiles<'a>(
		&'a self,
		ids: &'a [String],
	) -> BoxFuture<'a, scout_storage::Result<Vec<(String, Value)>>>;
}

pub trait RunStore
where
	Self: Send + Sync,
{
	fn create<'a>(&'a self, run: &'a NewRun) -> BoxFuture<'a, scout_storage::Result<()>>;

	fn fetch<'a>(&'a self, run_id: Uuid) -> BoxFuture<'a, scout_storage::Result<RunSnapshot>>;

	fn status<'a>(&'a self, run_id: Uuid) -> BoxFuture<'a, scout_storage::Result<RunStatus>>;

	fn update_status<'a>(
		&'a self,
		run_id: Uuid,
		status: RunStatus,
	) -> BoxFuture<'a, scout_storage::Result<()>>;

	fn mark_stopped<'a>(&'a self, run_id: Uuid) -> BoxFuture<'a, scout_storage::Result<()>>;

	fn set_compiled_sql<'a>(
		&'a self,
		run_id: Uuid,
		sql: &'a str,
	) -> BoxFuture<'a, scout_storage::Result<()>>;

	fn set_feedback<'a>(
		&'a self,
		run_id: Uuid,
		feedback: Feedback,
	) -> BoxFuture<'a, scout_storage::Result<()>>;

	fn advance_seen_page<'a>(
		&'a self,
		run_id: Uuid,
		page_idx: i32,
	) -> BoxFuture<'a, scout_storage::Result<bool>>;
}

pub trait PageStore
where
	Self: Send + Sync,
{
	fn latest_page<'a>(
		&'a self,
		run_id: Uuid,
	) -> BoxFuture<'a, scout_storage::Result<Option<CachedPage>>>;

	fn page_at<'a>(
		&'a self,
		run_id: Uuid,
		page_idx: i32,
	) -> BoxFuture<'a, scout_storage::Result<Option<CachedPage>>>;

	fn insert_page<'a>(
		&'a self,
		run_id: Uuid,
		page_idx: i32,
		entries: &'a [ScoredCandidate],
	) -> BoxFuture<'a, scout_storage::Result<i64>>;

	fn update_page<'a>(
		&'a self,
		page_id: i64,
		entries: &'a [ScoredCandidate],
	) -> BoxFuture<'a, scout_storage::Result<()>>;

	fn upsert_summaries<'a>(
		&'a self,
		run_id: Uuid,
		items: &'a [(String, String)],
	) -> BoxFuture<'a, scout_storage::Result<()>>;
}

#[derive(Clone)]
pub struct Providers {
	pub reason: Arc<dyn ReasonProvider>,
}

impl Providers {
	pub fn new(reason: Arc<dyn ReasonProvider>) -> Self {
		Self { reason }
	}
}

impl Default for Providers {
	fn default() -> Self {
		Self { reason: Arc::new(DefaultReason) }
	}
}

#[derive(Clone)]
pub struct Stores {
	pub candidates: Arc<dyn CandidateStore>,
	pub runs: Arc<dyn RunStore>,
	pub pages: Arc<dyn PageStore>,
}

impl Stores {
	pub fn postgres(db: &Db) -> Self {
		Self {
			candidates: Arc::new(PgCandidateStore { pool: db.pool.clone() }),
			runs: Arc::new(PgRunStore { pool: db.pool.clone() }),
			pages: Arc::new(PgPageStore { pool: db.pool.clone() }),
		}
	}
}

pub struct ScoutService {
	pub cfg: Config,
	pub providers: Providers,
	pub stores: Stores,
}

impl ScoutService {
	pub fn new(cfg: Config, db: &Db) -> Self {
		Self { cfg, providers: Providers::default(), stores: Stores::postgres(db) }
	}

	pub fn with_parts(cfg: Config, providers: Providers, stores: Stores) -> Self {
		Self { cfg, providers, stores }
	}

	pub async fn create_run(&self, run: NewRun) -> Result<Uuid> {
		if run.criteria.len() > 6 {
			return Err(Error::InvalidRequest {
				message: "A run accepts at most 6 criteria.".to_string(),
			});
		}

		let id = run.id;

		self.stores.runs.create(&run).await?;

		Ok(id)
	}

	pub async fn run_status(&self, run_id: Uuid) -> Result<RunStatus> {
		Ok(self.stores.runs.status(run_id).await?)
	}

	/// Requests cooperative cancellation. Stages observe the stored status
	/// at their next checkpoint and no-op from then on.
	pub async fn stop(&self, run_id: Uuid) -> Result<()> {
		self.stores.runs.mark_stopped(run_id).await?;

		Ok(())
	}

	pub async fn set_feedback(&self, run_id: Uuid, feedback: Feedback) -> Result<()> {
		self.stores.runs.set_feedback(run_id, feedback).await?;

		Ok(())
	}

	/// Cancellation checkpoint, consulted before every reasoning-engine
	/// call and before every cache write.
	pub(crate) async fn ensure_active(&self, run_id: Uuid) -> Result<()> {
		ensure_not_stopped(&self.stores, run_id).await
	}
}

pub(crate) async fn ensure_not_stopped(stores: &Stores, run_id: Uuid) -> Result<()> {
	if stores.runs.status(run_id).await?.is_stopped() {
		return Err(Error::Canceled);
	}

	Ok(())
}

struct DefaultReason;

impl ReasonProvider for DefaultReason {
	fn invoke<'a>(
		&'a self,
		cfg: &'a EngineConfig,
		system_instructions: &'a str,
		user_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(scout_providers::reason::invoke(cfg, system_instructions, user_prompt))
	}
}

struct PgCandidateStore {
	pool: sqlx::PgPool,
}

impl CandidateStore for PgCandidateStore {
	fn execute<'a>(
		&'a self,
		expression: &'a str,
		limit: i64,
		offset: i64,
		statement_timeout_ms: u64,
	) -> BoxFuture<'a, scout_storage::Result<Vec<CandidateRecord>>> {
		Box::pin(async move {
			let rows = scout_storage::candidates::execute_search(
				&self.pool,
				expression,
				limit,
				offset,
				statement_timeout_ms,
			)
			.await?;

			Ok(rows.into_iter().map(record_from_row).collect())
		})
	}

	fn profiles<'a>(
		&'a self,
		ids: &'a [String],
	) -> BoxFuture<'a, scout_storage::Result<Vec<(String, Value)>>> {
		Box::pin(scout_storage::candidates::profiles(&self.pool, ids))
	}
}

struct PgRunStore {
	pool: sqlx::PgPool,
}

impl RunStore for PgRunStore {
	fn create<'a>(&'a self, run: &'a NewRun) -> BoxFuture<'a, scout_storage::Result<()>> {
		Box::pin(async move {
			let criteria = serde_json::to_value(&run.criteria).map_err(|err| {
				scout_storage::Error::InvalidArgument(format!("Criteria are not encodable: {err}"))
			})?;
			let new_run = scout_storage::runs::NewRun {
				id: run.id,
				query_id: run.query_id,
				query_text: &run.query_text,
				criteria: &criteria,
			};

			scout_storage::runs::insert_run(&self.pool, &new_run).await
		})
	}

	fn fetch<'a>(&'a self, run_id: Uuid) -> BoxFuture<'a, scout_storage::Result<RunSnapshot>> {
		Box::pin(async move {
			let row = scout_storage::runs::fetch_run(&self.pool, run_id).await?;
			let status = parse_status(&row.status)?;

			Ok(RunSnapshot {
				id: row.id,
				query_id: row.query_id,
				query_text: row.query_text.clone(),
				criteria: row.criteria_list(),
				compiled_sql: row.compiled_sql,
				status,
				feedback: Feedback::from_i16(row.feedback),
				seen_page_idx: row.seen_page_idx,
			})
		})
	}

	fn status<'a>(&'a self, run_id: Uuid) -> BoxFuture<'a, scout_storage::Result<RunStatus>> {
		Box::pin(async move {
			let raw = scout_storage::runs::run_status(&self.pool, run_id).await?;

			parse_status(&raw)
		})
	}

	fn update_status<'a>(
		&'a self,
		run_id: Uuid,
		status: RunStatus,
	) -> BoxFuture<'a, scout_storage::Result<()>> {
		Box::pin(scout_storage::runs::update_status(&self.pool, run_id, status.as_str()))
	}

	fn mark_stopped<'a>(&'a self, run_id: Uuid) -> BoxFuture<'a, scout_storage::Result<()>> {
		Box::pin(scout_storage::runs::mark_stopped(&self.pool, run_id))
	}

	fn set_compiled_sql<'a>(
		&'a self,
		run_id: Uuid,
		sql: &'a str,
	) -> BoxFuture<'a, scout_storage::Result<()>> {
		Box::pin(scout_storage::runs::set_compiled_sql(&self.pool, run_id, sql))
	}

	fn set_feedback<'a>(
		&'a self,
		run_id: Uuid,
		feedback: Feedback,
	) -> BoxFuture<'a, scout_storage::Result<()>> {
		Box::pin(scout_storage::runs::set_feedback(&self.pool, run_id, feedback.as_i16()))
	}

	fn advance_seen_page<'a>(
		&'a self,
		run_id: Uuid,
		page_idx: i32,
	) -> BoxFuture<'a, scout_storage::Result<bool>> {
		Box::pin(scout_storage::runs::advance_seen_page(&self.pool, run_id, page_idx))
	}
}

struct PgPageStore {
	pool: sqlx::PgPool,
}

impl PageStore for PgPageStore {
	fn latest_page<'a>(
		&'a self,
		run_id: Uuid,
	) -> BoxFuture<'a, scout_storage::Result<Option<CachedPage>>> {
		Box::pin(async move {
			let row = scout_storage::pages::latest_page(&self.pool, run_id).await?;

			Ok(row.map(cached_page_from_row))
		})
	}

	fn page_at<'a>(
		&'a self,
		run_id: Uuid,
		page_idx: i32,
	) -> BoxFuture<'a, scout_storage::Result<Option<CachedPage>>> {
		Box::pin(async move {
			let row = scout_storage::pages::page_at(&self.pool, run_id, page_idx).await?;

			Ok(row.map(cached_page_from_row))
		})
	}

	fn insert_page<'a>(
		&'a self,
		run_id: Uuid,
		page_idx: i32,
		entries: &'a [ScoredCandidate],
	) -> BoxFuture<'a, scout_storage::Result<i64>> {
		Box::pin(async move {
			let encoded = encode_entries(entries)?;

			scout_storage::pages::insert_page(&self.pool, run_id, page_idx, &encoded).await
		})
	}

	fn update_page<'a>(
		&'a self,
		page_id: i64,
		entries: &'a [ScoredCandidate],
	) -> BoxFuture<'a, scout_storage::Result<()>> {
		Box::pin(async move {
			let encoded = encode_entries(entries)?;

			scout_storage::pages::update_page_entries(&self.pool, page_id, &encoded).await
		})
	}

	fn upsert_summaries<'a>(
		&'a self,
		run_id: Uuid,
		items: &'a [(String, String)],
	) -> BoxFuture<'a, scout_storage::Result<()>> {
		Box::pin(scout_storage::pages::upsert_summaries(&self.pool, run_id, items))
	}
}

fn parse_status(raw: &str) -> scout_storage::Result<RunStatus> {
	RunStatus::parse(raw)
		.ok_or_else(|| scout_storage::Error::InvalidArgument(format!("Unknown run status {raw}.")))
}

fn record_from_row(row: CandidateRow) -> CandidateRecord {
	CandidateRecord {
		id: row.id,
		name: row.name,
		headline: row.headline,
		location: row.location,
		fts_rank: row.fts_rank,
	}
}

fn cached_page_from_row(row: scout_storage::models::RunPageRow) -> CachedPage {
	// Entries were written by this service; anything undecodable is treated
	// as an empty page rather than a hard failure.
	let entries = serde_json::from_value(row.entries).unwrap_or_default();

	CachedPage { id: row.id, page_idx: row.page_idx, entries }
}

fn encode_entries(entries: &[ScoredCandidate]) -> scout_storage::Result<Value> {
	serde_json::to_value(entries).map_err(|err| {
		scout_storage::Error::InvalidArgument(format!("Page entries are not encodable: {err}"))
	})
}
