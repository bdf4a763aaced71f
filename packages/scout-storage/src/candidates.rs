use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{Error, Result, models::CandidateRow};

/// Executes a compiled retrieval expression with a statement timeout scoped
/// to one transaction, mirroring the store contract
/// `execute(expression, limit, offset, statement_timeout)`. Timeout and
/// syntax failures come back as distinct error variants.
pub async fn execute_search(
	pool: &PgPool,
	expression: &str,
	limit: i64,
	offset: i64,
	timeout_ms: u64,
) -> Result<Vec<CandidateRow>> {
	let mut tx = pool.begin().await?;

	// SET LOCAL does not take bind parameters; the value is a config
	// integer, never caller input.
	sqlx::query(&format!("SET LOCAL statement_timeout = {timeout_ms}"))
		.execute(&mut *tx)
		.await
		.map_err(Error::classify_query_error)?;

	let wrapped = format!("SELECT * FROM ({expression}) AS results LIMIT $1 OFFSET $2");
	let rows = sqlx::query(&wrapped)
		.bind(limit)
		.bind(offset)
		.fetch_all(&mut *tx)
		.await
		.map_err(Error::classify_query_error)?;

	tx.commit().await?;

	Ok(rows.iter().filter_map(decode_candidate).collect())
}

/// Builds the scoring context for each candidate: display fields plus the
/// nested experience/education/publication collections as one JSON value.
pub async fn profiles(pool: &PgPool, ids: &[String]) -> Result<Vec<(String, Value)>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query(
		"\
SELECT
	c.id,
	json_build_object(
		'name', c.name,
		'headline', c.headline,
		'location', c.location,
		'experience', coalesce((
			SELECT json_agg(json_build_object(
				'company', e.company,
				'title', e.title,
				'description', e.description,
				'started_at', e.started_at,
				'ended_at', e.ended_at
			) ORDER BY e.started_at DESC NULLS LAST)
			FROM candidate_experience e WHERE e.candidate_id = c.id
		), '[]'::json),
		'education', coalesce((
			SELECT json_agg(json_build_object(
				'school', s.school,
				'degree', s.degree,
				'field', s.field,
				'started_at', s.started_at,
				'ended_at', s.ended_at
			) ORDER BY s.started_at DESC NULLS LAST)
			FROM candidate_education s WHERE s.candidate_id = c.id
		), '[]'::json),
		'publications', coalesce((
			SELECT json_agg(json_build_object(
				'title', p.title,
				'venue', p.venue,
				'published_at', p.published_at
			) ORDER BY p.published_at DESC NULLS LAST)
			FROM candidate_publications p WHERE p.candidate_id = c.id
		), '[]'::json)
	) AS profile
FROM candidates c
WHERE c.id = ANY($1)",
	)
	.bind(ids)
	.fetch_all(pool)
	.await?;

	let mut out = Vec::with_capacity(rows.len());

	for row in rows {
		let id: String = row.try_get("id")?;
		let profile: Value = row.try_get("profile")?;

		out.push((id, profile));
	}

	Ok(out)
}

/// Row shapes vary across tiers (the fallback tier selects an `fts_rank`
/// column, repaired queries may re-cast the id), so decoding is defensive:
/// a row without a usable identity is dropped, everything else defaults.
fn decode_candidate(row: &PgRow) -> Option<CandidateRow> {
	let id = column_text(row, "id")?;
	let name = column_text(row, "name").unwrap_or_default();
	let headline = column_text(row, "headline");
	let location = column_text(row, "location");
	let fts_rank = row.try_get::<f32, _>("fts_rank").ok();

	Some(CandidateRow { id, name, headline, location, fts_rank })
}

fn column_text(row: &PgRow, column: &str) -> Option<String> {
	if let Ok(text) = row.try_get::<String, _>(column) {
		return Some(text);
	}

	// Tolerate json-wrapped columns such as `to_json(id)`.
	match row.try_get::<Value, _>(column) {
		Ok(Value::String(text)) => Some(text),
		Ok(Value::Number(number)) => Some(number.to_string()),
		_ => None,
	}
}
