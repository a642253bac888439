use serde::{Deserialize, Serialize};

/// A contiguous archived tick range for one epoch. Within an epoch's interval
/// list, intervals are ordered by ascending `first_tick` and never overlap;
/// gaps between consecutive intervals are ticks that were never archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInterval {
	pub epoch: u32,
	pub first_tick: u64,
	pub last_tick: u64,
}
impl TickInterval {
	pub fn contains(&self, tick: u64) -> bool {
		self.first_tick <= tick && tick <= self.last_tick
	}
}

/// Snapshot of archive progress, owned by the external status collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveStatus {
	pub last_processed_tick: u64,
	pub processing_epoch: u32,
	pub interval_initial_tick: u64,
}

/// Scans `intervals` in ascending order and decides whether `tick` fell into
/// an archiving gap. The first interval whose `last_tick >= tick` determines
/// the outcome: if `tick` is below that interval's `first_tick` the tick was
/// skipped and the interval's `first_tick` is the next available tick. A tick
/// beyond every interval passes, as does an empty list.
pub fn skipped_by_archive(tick: u64, intervals: &[TickInterval]) -> Option<u64> {
	for interval in intervals {
		if interval.last_tick >= tick {
			if tick < interval.first_tick {
				return Some(interval.first_tick);
			}

			return None;
		}
	}

	None
}
