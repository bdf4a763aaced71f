use scout_domain::{
	candidates::{self, ScoredCandidate},
	judgment,
	score::{self, Verdict},
	status::RunStatus,
};

#[test]
fn judgment_payload_flows_into_score() {
	let raw = r#"[
		{"criterion": "fintech startup experience", "verdict": "satisfied", "evidence": "Led payments at a seed-stage startup"},
		{"criterion": "5+ years of experience", "verdict": "ambiguous"}
	]"#;
	let lines = judgment::parse_judgment(raw);

	assert_eq!(lines.len(), 2);
	assert_eq!(lines[0].verdict, Verdict::Satisfied);

	let total = judgment::points_total(&lines);

	assert_eq!(total, 3);
	assert_eq!(score::score(total, 2), 0.75);
}

#[test]
fn unparseable_judgment_scores_zero_with_criteria() {
	let lines = judgment::parse_judgment("the model apologized instead of answering");

	assert!(lines.is_empty());
	assert_eq!(score::score(judgment::points_total(&lines), 2), 0.0);
	assert_eq!(score::score(judgment::points_total(&lines), 0), 1.0);
}

#[test]
fn merge_then_shuffle_preserves_score_monotonicity() {
	let fresh = vec![
		ScoredCandidate { id: "a".to_string(), score: 1.0 },
		ScoredCandidate { id: "b".to_string(), score: 0.5 },
		ScoredCandidate { id: "c".to_string(), score: 0.5 },
	];
	let cached = vec![ScoredCandidate { id: "d".to_string(), score: 0.75 }];
	let mut merged = candidates::merge_with_cache(fresh, &cached);

	candidates::shuffled_resort(&mut merged, 42);

	assert_eq!(merged.len(), 4);
	assert_eq!(merged[0].id, "a");
	assert_eq!(merged[1].id, "d");

	for window in merged.windows(2) {
		assert!(window[0].score >= window[1].score);
	}
}

#[test]
fn status_labels_match_storage_values() {
	assert_eq!(RunStatus::RerankingStreaming.as_str(), "reranking_streaming");
	assert_eq!(RunStatus::parse("expanding"), Some(RunStatus::Expanding));
}
