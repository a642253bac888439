use std::{
	collections::HashMap,
	sync::{Mutex, PoisonError},
	time::{Duration, Instant},
};

#[derive(Debug, Clone)]
pub(crate) struct TtlEntry<T> {
	pub(crate) value: T,
	pub(crate) expires_at: Instant,
}
impl<T> TtlEntry<T> {
	pub(crate) fn new(value: T, ttl: Duration) -> Self {
		Self { value, expires_at: Instant::now() + ttl }
	}

	pub(crate) fn is_expired(&self) -> bool {
		self.expires_at <= Instant::now()
	}
}

/// A TTL map with internal locking. Entries are overwritten freely and
/// expire by TTL only; there is no invalidation API.
pub struct TtlMap<T> {
	entries: Mutex<HashMap<String, TtlEntry<T>>>,
}
impl<T> TtlMap<T>
where
	T: Clone,
{
	pub fn new() -> Self {
		Self { entries: Mutex::new(HashMap::new()) }
	}

	pub fn get(&self, key: &str) -> Option<T> {
		let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

		entries.get(key).filter(|entry| !entry.is_expired()).map(|entry| entry.value.clone())
	}

	pub fn insert(&self, key: String, value: T, ttl: Duration) {
		let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

		entries.insert(key, TtlEntry::new(value, ttl));
	}

	/// Drops every expired entry. Reads already ignore expired entries; the
	/// sweep only reclaims their memory.
	pub fn sweep(&self) {
		let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

		entries.retain(|_, entry| !entry.is_expired());
	}

	pub fn len(&self) -> usize {
		self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<T> Default for TtlMap<T>
where
	T: Clone,
{
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expired_entries_are_invisible_and_swept() {
		let map = TtlMap::new();

		map.insert("live".to_string(), 1_u32, Duration::from_secs(60));
		map.insert("dead".to_string(), 2_u32, Duration::from_millis(0));

		assert_eq!(map.get("live"), Some(1));
		assert_eq!(map.get("dead"), None);
		assert_eq!(map.len(), 2);

		map.sweep();

		assert_eq!(map.len(), 1);
	}

	#[test]
	fn insert_overwrites_freely() {
		let map = TtlMap::new();

		map.insert("k".to_string(), 1_u32, Duration::from_secs(60));
		map.insert("k".to_string(), 2_u32, Duration::from_secs(60));

		assert_eq!(map.get("k"), Some(2));
	}
}
