mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, EngineConfig, Engines, Paging, Postgres, Rerank, Search, Service, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	for (label, engine) in [
		("engines.planner", &cfg.engines.planner),
		("engines.fallback", &cfg.engines.fallback),
		("engines.judge", &cfg.engines.judge),
	] {
		validate_engine(label, engine)?;
	}

	if cfg.search.limit == 0 {
		return Err(Error::Validation {
			message: "search.limit must be greater than zero.".to_string(),
		});
	}
	if cfg.search.min_viable_count == 0 {
		return Err(Error::Validation {
			message: "search.min_viable_count must be greater than zero.".to_string(),
		});
	}
	if cfg.search.fallback_min_count > cfg.search.min_viable_count {
		return Err(Error::Validation {
			message: "search.fallback_min_count must not exceed search.min_viable_count."
				.to_string(),
		});
	}
	if cfg.search.statement_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.statement_timeout_ms must be greater than zero.".to_string(),
		});
	}

	if cfg.rerank.review_cap == 0 {
		return Err(Error::Validation {
			message: "rerank.review_cap must be greater than zero.".to_string(),
		});
	}
	if cfg.rerank.concurrency == 0 {
		return Err(Error::Validation {
			message: "rerank.concurrency must be greater than zero.".to_string(),
		});
	}
	if cfg.rerank.flush_batch == 0 {
		return Err(Error::Validation {
			message: "rerank.flush_batch must be greater than zero.".to_string(),
		});
	}

	if cfg.paging.page_size == 0 {
		return Err(Error::Validation {
			message: "paging.page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.paging.boundary_window == 0 || cfg.paging.boundary_window % cfg.paging.page_size != 0 {
		return Err(Error::Validation {
			message: "paging.boundary_window must be a positive multiple of paging.page_size."
				.to_string(),
		});
	}
	if !cfg.paging.tail_score_threshold.is_finite() || cfg.paging.tail_score_threshold < 0.0 {
		return Err(Error::Validation {
			message: "paging.tail_score_threshold must be zero or greater.".to_string(),
		});
	}

	Ok(())
}

fn validate_engine(label: &str, engine: &EngineConfig) -> Result<()> {
	if engine.api_base.trim().is_empty() {
		return Err(Error::Validation { message: format!("{label}.api_base must be non-empty.") });
	}
	if engine.model.trim().is_empty() {
		return Err(Error::Validation { message: format!("{label}.model must be non-empty.") });
	}
	if !engine.temperature.is_finite() || !(0.0..=2.0).contains(&engine.temperature) {
		return Err(Error::Validation {
			message: format!("{label}.temperature must be in the range 0.0-2.0."),
		});
	}
	if !matches!(engine.effort.as_str(), "low" | "medium" | "high") {
		return Err(Error::Validation {
			message: format!("{label}.effort must be one of low, medium, or high."),
		});
	}
	if engine.timeout_ms == 0 {
		return Err(Error::Validation {
			message: format!("{label}.timeout_ms must be greater than zero."),
		});
	}

	Ok(())
}
