use std::sync::Arc;

use larq_domain::intervals::skipped_by_archive;

use crate::{Error, Result, StatusCache};

/// Rejects tick-number requests outside the archive's processed intervals.
/// Runs as a pipeline step for every tick-bearing request; purely
/// synchronous apart from the cached status reads, never retried.
pub struct TickBoundsValidator {
	cache: Arc<StatusCache>,
}
impl TickBoundsValidator {
	pub fn new(cache: Arc<StatusCache>) -> Self {
		Self { cache }
	}

	pub async fn check(&self, tick: u64) -> Result<()> {
		let status = self.cache.status().await?;

		if tick > status.last_processed_tick {
			return Err(Error::TickNotProcessed {
				tick,
				last_processed_tick: status.last_processed_tick,
			});
		}

		let intervals = self.cache.tick_intervals().await?;

		if let Some(next_available_tick) = skipped_by_archive(tick, &intervals) {
			return Err(Error::TickSkipped { tick, next_available_tick });
		}

		Ok(())
	}
}
