use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use scout_config::Config;

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("scout_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_mutated(mutate: impl FnOnce(&mut Value)) -> scout_config::Result<Config> {
	let mut value = sample_value();

	mutate(&mut value);

	let payload = toml::to_string(&value).expect("Failed to render test config.");
	let path = write_temp_config(payload);
	let result = scout_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn set_path(value: &mut Value, path: &[&str], new: Value) {
	let mut cursor = value;

	for segment in &path[..path.len() - 1] {
		cursor = cursor
			.as_table_mut()
			.and_then(|table| table.get_mut(*segment))
			.expect("Sample config must contain the mutated section.");
	}

	cursor
		.as_table_mut()
		.expect("Mutated section must be a table.")
		.insert(path[path.len() - 1].to_string(), new);
}

#[test]
fn sample_config_is_valid() {
	let cfg = load_mutated(|_| {}).expect("Sample config must load.");

	assert_eq!(cfg.paging.page_size, 10);
	assert_eq!(cfg.search.min_viable_count, 10);
	assert_eq!(cfg.rerank.concurrency, 20);
}

#[test]
fn rejects_zero_pool_conns() {
	let err = load_mutated(|value| {
		set_path(value, &["storage", "postgres", "pool_max_conns"], Value::Integer(0));
	})
	.expect_err("Expected pool_max_conns validation error.");

	assert!(err.to_string().contains("pool_max_conns"), "Unexpected error: {err}");
}

#[test]
fn rejects_unknown_effort() {
	let err = load_mutated(|value| {
		set_path(value, &["engines", "judge", "effort"], Value::String("max".to_string()));
	})
	.expect_err("Expected effort validation error.");

	assert!(err.to_string().contains("engines.judge.effort"), "Unexpected error: {err}");
}

#[test]
fn rejects_fallback_min_above_viable_min() {
	let err = load_mutated(|value| {
		set_path(value, &["search", "fallback_min_count"], Value::Integer(20));
	})
	.expect_err("Expected fallback_min_count validation error.");

	assert!(err.to_string().contains("fallback_min_count"), "Unexpected error: {err}");
}

#[test]
fn rejects_misaligned_boundary_window() {
	let err = load_mutated(|value| {
		set_path(value, &["paging", "boundary_window"], Value::Integer(55));
	})
	.expect_err("Expected boundary_window validation error.");

	assert!(err.to_string().contains("boundary_window"), "Unexpected error: {err}");
}

#[test]
fn rejects_out_of_range_temperature() {
	let err = load_mutated(|value| {
		set_path(value, &["engines", "planner", "temperature"], Value::Float(3.5));
	})
	.expect_err("Expected temperature validation error.");

	assert!(err.to_string().contains("engines.planner.temperature"), "Unexpected error: {err}");
}
