use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct RunRow {
	pub id: Uuid,
	pub query_id: Uuid,
	pub query_text: String,
	pub criteria: Value,
	pub compiled_sql: Option<String>,
	pub status: String,
	pub feedback: i16,
	pub seen_page_idx: i32,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

impl RunRow {
	/// Criteria are stored as a jsonb array of short strings; anything
	/// else in the column decodes to an empty list.
	pub fn criteria_list(&self) -> Vec<String> {
		self.criteria
			.as_array()
			.map(|items| {
				items.iter().filter_map(Value::as_str).map(str::to_string).collect()
			})
			.unwrap_or_default()
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct RunPageRow {
	pub id: i64,
	pub run_id: Uuid,
	pub page_idx: i32,
	pub entries: Value,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct CandidateRow {
	pub id: String,
	pub name: String,
	pub headline: Option<String>,
	pub location: Option<String>,
	pub fts_rank: Option<f32>,
}
