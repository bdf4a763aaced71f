use serde_json::Value;
use sqlx::{PgPool, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::RunPageRow};

/// The most recently created page row is the authoritative ranked list for
/// the run; older rows are retained for audit only.
pub async fn latest_page(pool: &PgPool, run_id: Uuid) -> Result<Option<RunPageRow>> {
	let row = sqlx::query_as::<_, RunPageRow>(
		"\
SELECT * FROM run_pages
WHERE run_id = $1
ORDER BY created_at DESC, id DESC
LIMIT 1",
	)
	.bind(run_id)
	.fetch_optional(pool)
	.await?;

	Ok(row)
}

pub async fn page_at(pool: &PgPool, run_id: Uuid, page_idx: i32) -> Result<Option<RunPageRow>> {
	let row = sqlx::query_as::<_, RunPageRow>(
		"\
SELECT * FROM run_pages
WHERE run_id = $1 AND page_idx = $2
ORDER BY created_at DESC, id DESC
LIMIT 1",
	)
	.bind(run_id)
	.bind(page_idx)
	.fetch_optional(pool)
	.await?;

	Ok(row)
}

pub async fn insert_page(
	pool: &PgPool,
	run_id: Uuid,
	page_idx: i32,
	entries: &Value,
) -> Result<i64> {
	let id = sqlx::query_scalar::<_, i64>(
		"\
INSERT INTO run_pages (run_id, page_idx, entries, created_at)
VALUES ($1, $2, $3, $4)
RETURNING id",
	)
	.bind(run_id)
	.bind(page_idx)
	.bind(entries)
	.bind(OffsetDateTime::now_utc())
	.fetch_one(pool)
	.await?;

	Ok(id)
}

/// Overwrites the evolving streaming row in place. The reranking engine
/// updates one page-0 row while batches flush, then inserts a fresh
/// authoritative row once scoring completes.
pub async fn update_page_entries(pool: &PgPool, page_id: i64, entries: &Value) -> Result<()> {
	sqlx::query("UPDATE run_pages SET entries = $2, created_at = $3 WHERE id = $1")
		.bind(page_id)
		.bind(entries)
		.bind(OffsetDateTime::now_utc())
		.execute(pool)
		.await?;

	Ok(())
}

/// Idempotent upsert of judgment texts keyed `(candidate_id, run_id)`.
/// Safe to repeat on retries of the scoring stage.
pub async fn upsert_summaries(
	pool: &PgPool,
	run_id: Uuid,
	items: &[(String, String)],
) -> Result<()> {
	if items.is_empty() {
		return Ok(());
	}

	let now = OffsetDateTime::now_utc();
	let mut builder = QueryBuilder::new(
		"INSERT INTO judgment_summaries (candidate_id, run_id, text, created_at, updated_at) ",
	);

	builder.push_values(items, |mut b, (candidate_id, text)| {
		b.push_bind(candidate_id).push_bind(run_id).push_bind(text).push_bind(now).push_bind(now);
	});
	builder.push(
		" ON CONFLICT (candidate_id, run_id) DO UPDATE SET text = EXCLUDED.text, updated_at = EXCLUDED.updated_at",
	);
	builder.build().execute(pool).await?;

	Ok(())
}

pub async fn summary_for(
	pool: &PgPool,
	run_id: Uuid,
	candidate_id: &str,
) -> Result<Option<String>> {
	let text = sqlx::query_scalar::<_, String>(
		"SELECT text FROM judgment_summaries WHERE run_id = $1 AND candidate_id = $2",
	)
	.bind(run_id)
	.bind(candidate_id)
	.fetch_optional(pool)
	.await?;

	Ok(text)
}
