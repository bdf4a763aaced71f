use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Map, Value, json};
use tower::util::ServiceExt;

use scout_api::{routes, state::AppState};
use scout_config::{
	Config, EngineConfig, Engines, Paging, Postgres, Rerank, Search, Service, Storage,
};
use scout_testkit::TestDatabase;

fn dummy_engine(model: &str) -> EngineConfig {
	EngineConfig {
		provider_id: "stub".to_string(),
		api_base: "http://localhost".to_string(),
		api_key: "key".to_string(),
		path: "/".to_string(),
		model: model.to_string(),
		temperature: 0.2,
		effort: "low".to_string(),
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

fn test_config(dsn: String) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			bind_localhost_only: true,
		},
		storage: Storage { postgres: Postgres { dsn, pool_max_conns: 2 } },
		engines: Engines {
			planner: dummy_engine("planner"),
			fallback: dummy_engine("fallback"),
			judge: dummy_engine("judge"),
		},
		search: Search {
			limit: 150,
			min_viable_count: 10,
			fallback_min_count: 5,
			fallback_extra_limit: 50,
			statement_timeout_ms: 15_000,
		},
		rerank: Rerank { review_cap: 100, concurrency: 20, flush_batch: 20 },
		paging: Paging { page_size: 10, boundary_window: 50, tail_score_threshold: 10.0 },
	}
}

async fn response_json(response: axum::response::Response) -> Value {
	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&bytes).expect("Response body must be JSON.")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SCOUT_PG_DSN to run."]
async fn run_lifecycle_over_http() {
	let Some(base_dsn) = scout_testkit::env_dsn() else {
		eprintln!("Skipping run_lifecycle_over_http; set SCOUT_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let state = AppState::new(test_config(test_db.dsn().to_string()))
		.await
		.expect("Failed to build app state.");
	let app = routes::router(state);

	let health = app
		.clone()
		.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
		.await
		.expect("Health request failed.");

	assert_eq!(health.status(), StatusCode::OK);

	let create = app
		.clone()
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/search/runs")
				.header("content-type", "application/json")
				.body(Body::from(
					json!({
						"query_id": uuid::Uuid::new_v4(),
						"query_text": "engineer with 5 YOE at a fintech startup",
						"criteria": ["fintech startup experience", "5+ years of experience"]
					})
					.to_string(),
				))
				.unwrap(),
		)
		.await
		.expect("Create request failed.");

	assert_eq!(create.status(), StatusCode::OK);

	let run_id = response_json(create).await["run_id"].as_str().unwrap().to_string();

	let status = app
		.clone()
		.oneshot(
			Request::builder()
				.uri(format!("/v1/search/status?run_id={run_id}"))
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.expect("Status request failed.");

	assert_eq!(status.status(), StatusCode::OK);
	assert_eq!(response_json(status).await["status"], "queued");

	let page = app
		.clone()
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/search/page")
				.header("content-type", "application/json")
				.body(Body::from(json!({ "run_id": run_id, "page_idx": 0 }).to_string()))
				.unwrap(),
		)
		.await
		.expect("Page request failed.");

	assert_eq!(page.status(), StatusCode::OK);

	let page_body = response_json(page).await;

	assert_eq!(page_body["total"], 0);
	assert!(page_body["candidate_ids"].as_array().unwrap().is_empty());

	let feedback = app
		.clone()
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/search/feedback")
				.header("content-type", "application/json")
				.body(Body::from(json!({ "run_id": run_id, "feedback": "up" }).to_string()))
				.unwrap(),
		)
		.await
		.expect("Feedback request failed.");

	assert_eq!(feedback.status(), StatusCode::NO_CONTENT);

	let stop = app
		.clone()
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/search/stop")
				.header("content-type", "application/json")
				.body(Body::from(json!({ "run_id": run_id }).to_string()))
				.unwrap(),
		)
		.await
		.expect("Stop request failed.");

	assert_eq!(stop.status(), StatusCode::OK);

	let status = app
		.clone()
		.oneshot(
			Request::builder()
				.uri(format!("/v1/search/status?run_id={run_id}"))
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.expect("Status request failed.");

	assert_eq!(response_json(status).await["status"], "stopped");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SCOUT_PG_DSN to run."]
async fn unknown_run_maps_to_not_found() {
	let Some(base_dsn) = scout_testkit::env_dsn() else {
		eprintln!("Skipping unknown_run_maps_to_not_found; set SCOUT_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let state = AppState::new(test_config(test_db.dsn().to_string()))
		.await
		.expect("Failed to build app state.");
	let app = routes::router(state);

	let status = app
		.oneshot(
			Request::builder()
				.uri(format!("/v1/search/status?run_id={}", uuid::Uuid::new_v4()))
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.expect("Status request failed.");

	assert_eq!(status.status(), StatusCode::NOT_FOUND);
	assert_eq!(response_json(status).await["error_code"], "not_found");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
