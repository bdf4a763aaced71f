use std::{
	collections::{HashMap, HashSet, hash_map::DefaultHasher},
	hash::{Hash, Hasher},
};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A retrieved candidate row. `fts_rank` is only populated by the broad
/// keyword fallback tier, where relevance ordering comes from the store.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CandidateRecord {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub headline: Option<String>,
	#[serde(default)]
	pub location: Option<String>,
	#[serde(default)]
	pub fts_rank: Option<f32>,
}

/// A `(identity, score)` pair as cached in run pages.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScoredCandidate {
	pub id: String,
	pub score: f64,
}

/// Keeps the first occurrence of each identity, preserving retrieval order.
pub fn dedupe(records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
	let mut seen = HashSet::new();

	records.into_iter().filter(|record| seen.insert(record.id.clone())).collect()
}

/// Sorts score-descending with identity as a deterministic tie-break, so
/// streamed partial pages are stable across flushes.
pub fn sort_by_score(list: &mut [ScoredCandidate]) {
	list.sort_by(|a, b| {
		b.score
			.partial_cmp(&a.score)
			.unwrap_or(std::cmp::Ordering::Equal)
			.then_with(|| a.id.cmp(&b.id))
	});
}

/// Merges freshly scored candidates with a cached tail, keeping the
/// better-known score for identities present in both, then re-sorts.
pub fn merge_with_cache(
	fresh: Vec<ScoredCandidate>,
	cached: &[ScoredCandidate],
) -> Vec<ScoredCandidate> {
	let mut best: HashMap<String, f64> = HashMap::new();
	let mut order = Vec::new();

	for candidate in fresh.into_iter().chain(cached.iter().cloned()) {
		match best.get_mut(&candidate.id) {
			Some(score) => {
				if candidate.score > *score {
					*score = candidate.score;
				}
			},
			None => {
				order.push(candidate.id.clone());
				best.insert(candidate.id, candidate.score);
			},
		}
	}

	let mut merged: Vec<ScoredCandidate> = order
		.into_iter()
		.map(|id| {
			let score = best[&id];

			ScoredCandidate { id, score }
		})
		.collect();

	sort_by_score(&mut merged);

	merged
}

/// Final fairness pass: shuffle with a per-run seed, then stable-sort by
/// score alone. Equal-score candidates end up in a pseudo-random order that
/// is fixed for the run instead of always favoring the same identities.
pub fn shuffled_resort(list: &mut Vec<ScoredCandidate>, seed: u64) {
	let mut rng = StdRng::seed_from_u64(seed);

	list.shuffle(&mut rng);
	list.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

pub fn run_seed(run_id: Uuid) -> u64 {
	let mut hasher = DefaultHasher::new();

	run_id.hash(&mut hasher);

	hasher.finish()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(id: &str) -> CandidateRecord {
		CandidateRecord {
			id: id.to_string(),
			name: format!("Candidate {id}"),
			headline: None,
			location: None,
			fts_rank: None,
		}
	}

	fn scored(id: &str, score: f64) -> ScoredCandidate {
		ScoredCandidate { id: id.to_string(), score }
	}

	#[test]
	fn dedupe_keeps_first_occurrence() {
		let records = vec![record("a"), record("b"), record("a"), record("c"), record("b")];
		let deduped = dedupe(records);

		assert_eq!(
			deduped.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
			vec!["a", "b", "c"]
		);
	}

	#[test]
	fn dedupe_is_idempotent() {
		let records = vec![record("a"), record("b")];
		let mut doubled = records.clone();

		doubled.extend(records.clone());

		assert_eq!(dedupe(doubled), records);
	}

	#[test]
	fn merge_keeps_better_known_score() {
		let fresh = vec![scored("a", 0.5), scored("b", 1.0)];
		let cached = vec![scored("a", 0.8), scored("c", 0.3)];
		let merged = merge_with_cache(fresh, &cached);

		assert_eq!(merged, vec![scored("b", 1.0), scored("a", 0.8), scored("c", 0.3)]);
	}

	#[test]
	fn shuffled_resort_is_deterministic_per_seed_and_score_ordered() {
		let base =
			vec![scored("a", 0.5), scored("b", 1.0), scored("c", 0.5), scored("d", 0.5)];
		let mut first = base.clone();
		let mut second = base.clone();

		shuffled_resort(&mut first, 7);
		shuffled_resort(&mut second, 7);

		assert_eq!(first, second);
		assert_eq!(first[0].id, "b");

		let scores: Vec<f64> = first.iter().map(|c| c.score).collect();
		let mut sorted = scores.clone();

		sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());

		assert_eq!(scores, sorted);
	}
}
