use serde::{Deserialize, Serialize};

/// Lifecycle of one search run. Progress flows
/// `Queued → Parsing → Refine → Running → {Error | Expanding} → Reranking →
/// RerankingStreaming → Finished`; `Error` and `Expanding` are re-entrant
/// while the execution controller escalates tiers. `Stopped` is reachable
/// from any non-terminal state through user cancellation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
	Queued,
	Parsing,
	Refine,
	Running,
	Error,
	Expanding,
	Reranking,
	RerankingStreaming,
	Finished,
	Stopped,
}

impl RunStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Queued => "queued",
			Self::Parsing => "parsing",
			Self::Refine => "refine",
			Self::Running => "running",
			Self::Error => "error",
			Self::Expanding => "expanding",
			Self::Reranking => "reranking",
			Self::RerankingStreaming => "reranking_streaming",
			Self::Finished => "finished",
			Self::Stopped => "stopped",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"queued" => Some(Self::Queued),
			"parsing" => Some(Self::Parsing),
			"refine" => Some(Self::Refine),
			"running" => Some(Self::Running),
			"error" => Some(Self::Error),
			"expanding" => Some(Self::Expanding),
			"reranking" => Some(Self::Reranking),
			"reranking_streaming" => Some(Self::RerankingStreaming),
			"finished" => Some(Self::Finished),
			"stopped" => Some(Self::Stopped),
			_ => None,
		}
	}

	/// Terminal statuses freeze the run: no compiled-query or scoring
	/// writes may happen afterwards.
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Finished | Self::Stopped)
	}

	pub fn is_stopped(self) -> bool {
		matches!(self, Self::Stopped)
	}

	/// A run can be (re)started only when it is idle: fresh, finished, or
	/// parked in the error state after exhausted retries.
	pub fn accepts_start(self) -> bool {
		matches!(self, Self::Queued | Self::Finished | Self::Error)
	}
}

impl std::fmt::Display for RunStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Recruiter feedback on a run's results, stored as a signed tri-state.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
	Up,
	Neutral,
	Down,
}

impl Feedback {
	pub fn as_i16(self) -> i16 {
		match self {
			Self::Up => 1,
			Self::Neutral => 0,
			Self::Down => -1,
		}
	}

	pub fn from_i16(raw: i16) -> Self {
		match raw {
			raw if raw > 0 => Self::Up,
			0 => Self::Neutral,
			_ => Self::Down,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_labels() {
		for status in [
			RunStatus::Queued,
			RunStatus::Parsing,
			RunStatus::Refine,
			RunStatus::Running,
			RunStatus::Error,
			RunStatus::Expanding,
			RunStatus::Reranking,
			RunStatus::RerankingStreaming,
			RunStatus::Finished,
			RunStatus::Stopped,
		] {
			assert_eq!(RunStatus::parse(status.as_str()), Some(status));
		}
		assert_eq!(RunStatus::parse("partially_finished"), None);
	}

	#[test]
	fn only_finished_and_stopped_are_terminal() {
		assert!(RunStatus::Finished.is_terminal());
		assert!(RunStatus::Stopped.is_terminal());
		assert!(!RunStatus::Error.is_terminal());
		assert!(!RunStatus::RerankingStreaming.is_terminal());
	}

	#[test]
	fn error_state_accepts_restart() {
		assert!(RunStatus::Error.accepts_start());
		assert!(RunStatus::Finished.accepts_start());
		assert!(!RunStatus::Running.accepts_start());
		assert!(!RunStatus::Stopped.accepts_start());
	}
}
