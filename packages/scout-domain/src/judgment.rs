use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::score::Verdict;

/// One judged criterion, aligned with the run's criteria order.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct JudgmentLine {
	pub criterion: String,
	pub verdict: Verdict,
	#[serde(default)]
	pub evidence: Option<String>,
}

/// Parses a judge payload into judgment lines. The payload comes from an
/// external model, so the shape is never trusted: anything that is not a
/// JSON array yields an empty judgment, malformed elements are dropped, and
/// an unknown verdict label degrades to `Ambiguous`.
pub fn parse_judgment(raw: &str) -> Vec<JudgmentLine> {
	let Ok(value) = serde_json::from_str::<Value>(raw) else {
		return Vec::new();
	};
	let Some(items) = value.as_array() else {
		return Vec::new();
	};

	items.iter().filter_map(parse_line).collect()
}

pub fn points_total(lines: &[JudgmentLine]) -> u32 {
	lines.iter().map(|line| line.verdict.points()).sum()
}

fn parse_line(item: &Value) -> Option<JudgmentLine> {
	let object = item.as_object()?;
	let criterion = object.get("criterion").and_then(Value::as_str)?.to_string();
	let verdict = object
		.get("verdict")
		.and_then(Value::as_str)
		.and_then(Verdict::parse)
		.unwrap_or(Verdict::Ambiguous);
	let evidence = object.get("evidence").and_then(Value::as_str).map(str::to_string);

	Some(JudgmentLine { criterion, verdict, evidence })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_well_formed_payload() {
		let raw = r#"[
			{"criterion": "5+ years of experience", "verdict": "satisfied", "evidence": "8 years"},
			{"criterion": "fintech background", "verdict": "unsatisfied"}
		]"#;
		let lines = parse_judgment(raw);

		assert_eq!(lines.len(), 2);
		assert_eq!(lines[0].verdict, Verdict::Satisfied);
		assert_eq!(lines[1].evidence, None);
		assert_eq!(points_total(&lines), 2);
	}

	#[test]
	fn non_array_payload_is_empty() {
		assert!(parse_judgment("not json at all").is_empty());
		assert!(parse_judgment(r#"{"criterion": "x"}"#).is_empty());
	}

	#[test]
	fn unknown_verdict_degrades_to_ambiguous() {
		let raw = r#"[{"criterion": "startup experience", "verdict": "kinda"}]"#;
		let lines = parse_judgment(raw);

		assert_eq!(lines[0].verdict, Verdict::Ambiguous);
	}

	#[test]
	fn malformed_elements_are_dropped() {
		let raw = r#"[{"criterion": "a", "verdict": "satisfied"}, 42, {"verdict": "satisfied"}]"#;

		assert_eq!(parse_judgment(raw).len(), 1);
	}
}
