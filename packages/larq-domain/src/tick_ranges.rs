use serde::{Deserialize, Serialize};

/// A contiguous run of tick numbers, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRange {
	pub first_tick: u64,
	pub last_tick: u64,
}
impl TickRange {
	pub fn contains(&self, tick: u64) -> bool {
		self.first_tick <= tick && tick <= self.last_tick
	}
}

/// Merges freshly fetched ranges into a previously cached list. Every tick
/// covered by either input stays covered by the output; adjacent and
/// overlapping runs coalesce. The output is sorted by `first_tick`.
pub fn merge_ranges(existing: &[TickRange], fetched: &[TickRange]) -> Vec<TickRange> {
	let mut all: Vec<TickRange> = existing.iter().chain(fetched.iter()).copied().collect();

	all.sort_by_key(|range| range.first_tick);

	let mut merged: Vec<TickRange> = Vec::with_capacity(all.len());

	for range in all {
		match merged.last_mut() {
			Some(last) if range.first_tick <= last.last_tick.saturating_add(1) => {
				last.last_tick = last.last_tick.max(range.last_tick);
			},
			_ => merged.push(range),
		}
	}

	merged
}

/// True when any range in a sorted or unsorted list covers `tick`.
pub fn ranges_contain(ranges: &[TickRange], tick: u64) -> bool {
	ranges.iter().any(|range| range.contains(tick))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn range(first_tick: u64, last_tick: u64) -> TickRange {
		TickRange { first_tick, last_tick }
	}

	#[test]
	fn merge_keeps_previously_known_ticks() {
		let existing = vec![range(10, 20)];
		let fetched = vec![range(30, 40)];
		let merged = merge_ranges(&existing, &fetched);

		assert!(ranges_contain(&merged, 15));
		assert!(ranges_contain(&merged, 35));
		assert!(!ranges_contain(&merged, 25));
	}

	#[test]
	fn merge_coalesces_overlapping_and_adjacent_runs() {
		let existing = vec![range(10, 20), range(21, 25)];
		let fetched = vec![range(18, 30)];
		let merged = merge_ranges(&existing, &fetched);

		assert_eq!(merged, vec![range(10, 30)]);
	}

	#[test]
	fn merge_of_empty_inputs_is_empty() {
		assert!(merge_ranges(&[], &[]).is_empty());
	}
}
