use serde_json::Value;

/// Strips a Markdown code fence from completion text, with or without a
/// language tag. Engines wrap SQL and JSON in fences often enough that
/// every caller wants this first.
pub fn strip_code_fence(raw: &str) -> &str {
	let trimmed = raw.trim();
	let Some(rest) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let rest = match rest.find('\n') {
		Some(idx) => &rest[idx + 1..],
		None => rest,
	};

	rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Best-effort JSON extraction from completion text: the whole text, or
/// the fenced block inside it, or the first `{...}` span. Returns `None`
/// rather than guessing when nothing parses.
pub fn extract_json(raw: &str) -> Option<Value> {
	let unfenced = strip_code_fence(raw);

	if let Ok(value) = serde_json::from_str(unfenced) {
		return Some(value);
	}

	let start = unfenced.find('{')?;
	let end = unfenced.rfind('}')?;

	if end <= start {
		return None;
	}

	serde_json::from_str(&unfenced[start..=end]).ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_fence_with_language_tag() {
		let raw = "```sql\nWHERE name = 'Kim'\n```";

		assert_eq!(strip_code_fence(raw), "WHERE name = 'Kim'");
	}

	#[test]
	fn leaves_plain_text_alone() {
		assert_eq!(strip_code_fence("  WHERE x = 1  "), "WHERE x = 1");
	}

	#[test]
	fn extracts_embedded_json_object() {
		let raw = "Sure, here you go: {\"sql\": \"SELECT 1\"} hope that helps";
		let value = extract_json(raw).expect("extraction failed");

		assert_eq!(value["sql"], "SELECT 1");
	}

	#[test]
	fn extracts_fenced_json() {
		let raw = "```json\n{\"sql\": \"SELECT 1\"}\n```";

		assert!(extract_json(raw).is_some());
	}

	#[test]
	fn returns_none_for_garbage() {
		assert!(extract_json("no structure here").is_none());
	}
}
