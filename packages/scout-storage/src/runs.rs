use serde_json::Value;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, models::RunRow};

pub struct NewRun<'a> {
	pub id: Uuid,
	pub query_id: Uuid,
	pub query_text: &'a str,
	pub criteria: &'a Value,
}

pub async fn insert_run(pool: &PgPool, run: &NewRun<'_>) -> Result<()> {
	let now = OffsetDateTime::now_utc();

	sqlx::query(
		"\
INSERT INTO runs (id, query_id, query_text, criteria, status, created_at, updated_at)
VALUES ($1, $2, $3, $4, 'queued', $5, $5)",
	)
	.bind(run.id)
	.bind(run.query_id)
	.bind(run.query_text)
	.bind(run.criteria)
	.bind(now)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn fetch_run(pool: &PgPool, run_id: Uuid) -> Result<RunRow> {
	sqlx::query_as::<_, RunRow>("SELECT * FROM runs WHERE id = $1")
		.bind(run_id)
		.fetch_optional(pool)
		.await?
		.ok_or_else(|| Error::NotFound(format!("Run {run_id} does not exist.")))
}

pub async fn run_status(pool: &PgPool, run_id: Uuid) -> Result<String> {
	sqlx::query_scalar::<_, String>("SELECT status FROM runs WHERE id = $1")
		.bind(run_id)
		.fetch_optional(pool)
		.await?
		.ok_or_else(|| Error::NotFound(format!("Run {run_id} does not exist.")))
}

/// Writes a lifecycle status. A stopped run is never overwritten, so a
/// cancellation observed by one task cannot be undone by a slower one.
pub async fn update_status(pool: &PgPool, run_id: Uuid, status: &str) -> Result<()> {
	sqlx::query(
		"UPDATE runs SET status = $2, updated_at = $3 WHERE id = $1 AND status <> 'stopped'",
	)
	.bind(run_id)
	.bind(status)
	.bind(OffsetDateTime::now_utc())
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn mark_stopped(pool: &PgPool, run_id: Uuid) -> Result<()> {
	sqlx::query(
		"\
UPDATE runs SET status = 'stopped', updated_at = $2
WHERE id = $1 AND status NOT IN ('finished', 'stopped')",
	)
	.bind(run_id)
	.bind(OffsetDateTime::now_utc())
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn set_compiled_sql(pool: &PgPool, run_id: Uuid, sql: &str) -> Result<()> {
	sqlx::query(
		"UPDATE runs SET compiled_sql = $2, updated_at = $3 WHERE id = $1 AND status <> 'stopped'",
	)
	.bind(run_id)
	.bind(sql)
	.bind(OffsetDateTime::now_utc())
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn set_feedback(pool: &PgPool, run_id: Uuid, feedback: i16) -> Result<()> {
	let result = sqlx::query("UPDATE runs SET feedback = $2, updated_at = $3 WHERE id = $1")
		.bind(run_id)
		.bind(feedback)
		.bind(OffsetDateTime::now_utc())
		.execute(pool)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Run {run_id} does not exist.")));
	}

	Ok(())
}

/// Advances the monotonic billing counter. Returns `true` when the page
/// was newly seen (billable), `false` when it was already charged; the
/// guard makes repeated requests for the same page free.
pub async fn advance_seen_page(pool: &PgPool, run_id: Uuid, page_idx: i32) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE runs SET seen_page_idx = $2, updated_at = $3
WHERE id = $1 AND seen_page_idx < $2",
	)
	.bind(run_id)
	.bind(page_idx)
	.bind(OffsetDateTime::now_utc())
	.execute(pool)
	.await?;

	Ok(result.rows_affected() > 0)
}
