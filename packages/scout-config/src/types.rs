use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub engines: Engines,
	pub search: Search,
	pub rerank: Rerank,
	pub paging: Paging,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	#[serde(default = "default_bind_localhost_only")]
	pub bind_localhost_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

/// The three reasoning-engine profiles the pipeline talks to: `planner`
/// compiles and repairs SQL, `fallback` produces the broad keyword
/// retrieval, `judge` scores candidates against criteria.
#[derive(Debug, Deserialize)]
pub struct Engines {
	pub planner: EngineConfig,
	pub fallback: EngineConfig,
	pub judge: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	#[serde(default = "default_effort")]
	pub effort: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_search_limit")]
	pub limit: u32,
	#[serde(default = "default_min_viable_count")]
	pub min_viable_count: u32,
	#[serde(default = "default_fallback_min_count")]
	pub fallback_min_count: u32,
	#[serde(default = "default_fallback_extra_limit")]
	pub fallback_extra_limit: u32,
	#[serde(default = "default_statement_timeout_ms")]
	pub statement_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Rerank {
	#[serde(default = "default_review_cap")]
	pub review_cap: u32,
	#[serde(default = "default_rerank_concurrency")]
	pub concurrency: u32,
	#[serde(default = "default_flush_batch")]
	pub flush_batch: u32,
}

/// Pagination policy. `boundary_window` and `tail_score_threshold` encode
/// the "serve cached tail vs. launch a broader search" tradeoff; the
/// defaults reproduce the original product behavior and are deliberately
/// configurable rather than hard-coded.
#[derive(Debug, Deserialize)]
pub struct Paging {
	#[serde(default = "default_page_size")]
	pub page_size: u32,
	#[serde(default = "default_boundary_window")]
	pub boundary_window: u32,
	#[serde(default = "default_tail_score_threshold")]
	pub tail_score_threshold: f64,
}

fn default_bind_localhost_only() -> bool {
	true
}

fn default_effort() -> String {
	"low".to_string()
}

fn default_search_limit() -> u32 {
	150
}

fn default_min_viable_count() -> u32 {
	10
}

fn default_fallback_min_count() -> u32 {
	5
}

fn default_fallback_extra_limit() -> u32 {
	50
}

fn default_statement_timeout_ms() -> u64 {
	15_000
}

fn default_review_cap() -> u32 {
	100
}

fn default_rerank_concurrency() -> u32 {
	20
}

fn default_flush_batch() -> u32 {
	20
}

fn default_page_size() -> u32 {
	10
}

fn default_boundary_window() -> u32 {
	50
}

fn default_tail_score_threshold() -> f64 {
	10.0
}
