use serde::{Deserialize, Serialize};

/// Per-criterion verdict produced by the judge model. Each verdict is worth
/// 0, 1, or 2 points; a candidate's score is the earned fraction of
/// `2 × criteria_count`, rounded to two decimals.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
	Satisfied,
	Ambiguous,
	Unsatisfied,
}

impl Verdict {
	pub fn points(self) -> u32 {
		match self {
			Self::Satisfied => 2,
			Self::Ambiguous => 1,
			Self::Unsatisfied => 0,
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"satisfied" => Some(Self::Satisfied),
			"ambiguous" => Some(Self::Ambiguous),
			"unsatisfied" => Some(Self::Unsatisfied),
			_ => None,
		}
	}
}

/// With no criteria there is nothing to filter on, so every candidate
/// scores a flat 1.0.
pub fn score(points_total: u32, criteria_count: usize) -> f64 {
	if criteria_count == 0 {
		return 1.0;
	}

	let full = (criteria_count as f64) * 2.0;

	((f64::from(points_total) / full) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_criteria_scores_one() {
		assert_eq!(score(0, 0), 1.0);
		assert_eq!(score(7, 0), 1.0);
	}

	#[test]
	fn all_satisfied_scores_one() {
		assert_eq!(score(6, 3), 1.0);
	}

	#[test]
	fn all_unsatisfied_scores_zero() {
		assert_eq!(score(0, 3), 0.0);
	}

	#[test]
	fn all_ambiguous_scores_half() {
		assert_eq!(score(3, 3), 0.5);
	}

	#[test]
	fn rounds_to_two_decimals() {
		// 1 point out of 6 is 0.1666...; the stored score is 0.17.
		assert_eq!(score(1, 3), 0.17);
	}

	#[test]
	fn verdict_parse_is_case_insensitive() {
		assert_eq!(Verdict::parse("Satisfied"), Some(Verdict::Satisfied));
		assert_eq!(Verdict::parse(" ambiguous "), Some(Verdict::Ambiguous));
		assert_eq!(Verdict::parse("maybe"), None);
	}
}
