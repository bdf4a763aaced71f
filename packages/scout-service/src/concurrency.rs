use std::{future::Future, sync::Arc};

use tokio::sync::Semaphore;

use crate::{Error, Result};

/// Runs `work` over every item with at most `limit` units in flight and
/// returns the outputs in input order regardless of completion order. The
/// first unit failure (in input order) fails the whole call and aborts the
/// units still queued; callers that want a fail-open batch wrap their unit
/// in its own error boundary.
pub async fn map_bounded<I, T, F, Fut>(items: Vec<I>, limit: usize, work: F) -> Result<Vec<T>>
where
	I: Send + 'static,
	T: Send + 'static,
	F: Fn(I) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<T>> + Send + 'static,
{
	let semaphore = Arc::new(Semaphore::new(limit.max(1)));
	let work = Arc::new(work);
	let mut handles = Vec::with_capacity(items.len());

	for item in items {
		let semaphore = semaphore.clone();
		let work = work.clone();

		handles.push(tokio::spawn(async move {
			let _permit = semaphore
				.acquire_owned()
				.await
				.map_err(|err| Error::Internal { message: format!("Semaphore closed: {err}") })?;

			work(item).await
		}));
	}

	let mut out = Vec::with_capacity(handles.len());
	let mut failure = None;

	for handle in handles {
		if failure.is_some() {
			handle.abort();

			continue;
		}

		match handle.await {
			Ok(Ok(value)) => out.push(value),
			Ok(Err(err)) => failure = Some(err),
			Err(err) => {
				failure = Some(Error::Internal { message: format!("Worker task failed: {err}") });
			},
		}
	}

	match failure {
		Some(err) => Err(err),
		None => Ok(out),
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use tokio::time::{Duration, sleep};

	use super::*;

	#[tokio::test]
	async fn preserves_input_order() {
		let items: Vec<u64> = (0..16).collect();
		let out = map_bounded(items, 4, |n| async move {
			// Later items finish first.
			sleep(Duration::from_millis(40u64.saturating_sub(n * 2))).await;

			Ok(n)
		})
		.await
		.expect("map failed");

		assert_eq!(out, (0..16).collect::<Vec<u64>>());
	}

	#[tokio::test]
	async fn never_exceeds_the_limit() {
		static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
		static PEAK: AtomicUsize = AtomicUsize::new(0);

		let items: Vec<u32> = (0..32).collect();
		let out = map_bounded(items, 5, |n| async move {
			let now = IN_FLIGHT.fetch_add(1, Ordering::SeqCst) + 1;

			PEAK.fetch_max(now, Ordering::SeqCst);
			sleep(Duration::from_millis(5)).await;
			IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);

			Ok(n)
		})
		.await
		.expect("map failed");

		assert_eq!(out.len(), 32);
		assert!(PEAK.load(Ordering::SeqCst) <= 5, "peak {} exceeded limit", PEAK.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn propagates_the_first_failure() {
		let items: Vec<u32> = (0..8).collect();
		let result = map_bounded(items, 2, |n| async move {
			if n == 3 {
				return Err(Error::Internal { message: "boom".to_string() });
			}

			Ok(n)
		})
		.await;

		assert!(matches!(result, Err(Error::Internal { .. })));
	}

	#[tokio::test]
	async fn handles_empty_input() {
		let out: Vec<u32> =
			map_bounded(Vec::<u32>::new(), 3, |n| async move { Ok(n) }).await.expect("map failed");

		assert!(out.is_empty());
	}
}
