use std::{
	collections::HashMap,
	time::{Duration, Instant},
};

use tokio::sync::Mutex;

use larq_domain::{TickRange, tick_ranges};

use crate::{BoxFuture, Result};

struct EpochRanges {
	ranges: Vec<TickRange>,
	refreshed_at: Instant,
}

/// Per-epoch ranges of ticks the archiver recorded as deliberately empty.
/// Each epoch carries its own refresh timestamp and is refetched on read once
/// stale; fresh ranges are merged into the known set rather than replacing
/// it, so a tick once known empty stays known empty even if a later fetch
/// returns a partial document. The mutex is held across the refresh, which
/// also collapses concurrent refreshes into one.
pub struct EmptyTickCache {
	state: Mutex<HashMap<u32, EpochRanges>>,
	ttl: Duration,
}
impl EmptyTickCache {
	pub fn new(ttl: Duration) -> Self {
		Self { state: Mutex::new(HashMap::new()), ttl }
	}

	pub async fn is_empty_tick<F>(&self, epoch: u32, tick: u64, fetch: F) -> Result<bool>
	where
		F: FnOnce() -> BoxFuture<'static, Result<Vec<TickRange>>>,
	{
		let mut state = self.state.lock().await;
		let stale = state
			.get(&epoch)
			.map(|entry| entry.refreshed_at.elapsed() >= self.ttl)
			.unwrap_or(true);

		if stale {
			let fetched = fetch().await?;
			let entry = state
				.entry(epoch)
				.or_insert_with(|| EpochRanges { ranges: Vec::new(), refreshed_at: Instant::now() });

			entry.ranges = tick_ranges::merge_ranges(&entry.ranges, &fetched);
			entry.refreshed_at = Instant::now();
		}

		Ok(state
			.get(&epoch)
			.map(|entry| tick_ranges::ranges_contain(&entry.ranges, tick))
			.unwrap_or(false))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ranges(pairs: &[(u64, u64)]) -> Vec<TickRange> {
		pairs
			.iter()
			.map(|&(first_tick, last_tick)| TickRange { first_tick, last_tick })
			.collect()
	}

	#[tokio::test]
	async fn membership_follows_the_fetched_ranges() {
		let cache = EmptyTickCache::new(Duration::from_secs(60));
		let fetched = ranges(&[(10, 20)]);

		let hit = cache
			.is_empty_tick(1, 15, move || Box::pin(async move { Ok(fetched) }))
			.await
			.expect("lookup failed");

		assert!(hit);

		let miss = cache
			.is_empty_tick(1, 25, || Box::pin(async { panic!("cached epoch refetched") }))
			.await
			.expect("lookup failed");

		assert!(!miss);
	}

	#[tokio::test]
	async fn refresh_merges_instead_of_replacing() {
		let cache = EmptyTickCache::new(Duration::from_millis(0));
		let first = ranges(&[(10, 20)]);
		let second = ranges(&[(30, 40)]);

		assert!(
			cache
				.is_empty_tick(1, 15, move || Box::pin(async move { Ok(first) }))
				.await
				.expect("lookup failed")
		);

		// The zero TTL forces a refresh; the partial second fetch must not
		// evict the first range.
		assert!(
			cache
				.is_empty_tick(1, 15, move || Box::pin(async move { Ok(second) }))
				.await
				.expect("lookup failed")
		);
	}

	#[tokio::test]
	async fn staleness_is_tracked_per_epoch() {
		let cache = EmptyTickCache::new(Duration::from_millis(80));
		let first = ranges(&[(10, 20)]);

		assert!(
			cache
				.is_empty_tick(1, 15, move || Box::pin(async move { Ok(first) }))
				.await
				.expect("lookup failed")
		);

		tokio::time::sleep(Duration::from_millis(50)).await;

		// A fetch for another epoch must not reset epoch 1's staleness.
		let other = ranges(&[(1, 9)]);

		assert!(
			cache
				.is_empty_tick(2, 5, move || Box::pin(async move { Ok(other) }))
				.await
				.expect("lookup failed")
		);

		tokio::time::sleep(Duration::from_millis(50)).await;

		// Epoch 1 is now past its TTL and refetches; the new range is only
		// visible if the refresh actually ran.
		let refreshed = ranges(&[(30, 40)]);

		assert!(
			cache
				.is_empty_tick(1, 35, move || Box::pin(async move { Ok(refreshed) }))
				.await
				.expect("lookup failed")
		);

		// Epoch 2 is still fresh and must be served from the cache.
		assert!(
			cache
				.is_empty_tick(2, 5, || Box::pin(async { panic!("fresh epoch refetched") }))
				.await
				.expect("lookup failed")
		);
	}

	#[tokio::test]
	async fn fetch_failure_propagates_without_poisoning_the_cache() {
		let cache = EmptyTickCache::new(Duration::from_secs(60));

		let result = cache
			.is_empty_tick(1, 15, || {
				Box::pin(async {
					Err(crate::Error::Backend { message: "down".to_string() })
				})
			})
			.await;

		assert!(result.is_err());

		let fetched = ranges(&[(10, 20)]);

		assert!(
			cache
				.is_empty_tick(1, 15, move || Box::pin(async move { Ok(fetched) }))
				.await
				.expect("lookup failed")
		);
	}
}
