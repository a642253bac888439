use std::{
	collections::{BTreeMap, HashMap},
	sync::Arc,
	time::Duration,
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{BoxFuture, Page, RangeBound, ResponseStore, Result, ttl::TtlMap};

/// Hashes a canonical request payload into a cache key. The payload must be
/// built from sorted maps; `serde_json::Map` keeps object keys ordered, so
/// logically identical requests hash identically.
pub fn hash_cache_key(payload: &Value) -> String {
	blake3::hash(payload.to_string().as_bytes()).to_string()
}

/// Reorders a query request into a canonical payload for keying. The maps
/// are re-collected into sorted form, so insertion order never reaches the
/// hash.
pub(crate) fn canonical_query_payload(
	identity: Option<&str>,
	filters: &HashMap<String, Vec<String>>,
	ranges: &HashMap<String, Vec<RangeBound>>,
	page: Page,
) -> Value {
	let filters: BTreeMap<&str, &Vec<String>> =
		filters.iter().map(|(name, values)| (name.as_str(), values)).collect();
	let ranges: BTreeMap<&str, &Vec<RangeBound>> =
		ranges.iter().map(|(name, bounds)| (name.as_str(), bounds)).collect();

	serde_json::json!({
		"filters": filters,
		"identity": identity,
		"page": page,
		"ranges": ranges,
	})
}

/// A cache instruction attached to a request by its entry point: where the
/// response would live and for how long.
#[derive(Debug, Clone)]
pub struct CacheDirective {
	pub key: String,
	pub ttl: Duration,
}
impl CacheDirective {
	pub fn new(op: &str, payload: &Value, ttl: Duration) -> Self {
		Self { key: format!("{op}:{}", hash_cache_key(payload)), ttl }
	}
}

/// Read-through/write-through response caching. The store is a collaborator
/// behind a trait; every store failure degrades to a miss or a skipped write,
/// logged at warn, never surfaced to the caller.
pub struct ResponseCache {
	store: Arc<dyn ResponseStore>,
	enabled: bool,
}
impl ResponseCache {
	pub fn new(store: Arc<dyn ResponseStore>, cfg: &larq_config::ResponseCache) -> Self {
		Self { store, enabled: cfg.enabled }
	}

	pub async fn get<T>(&self, directive: &CacheDirective) -> Option<T>
	where
		T: DeserializeOwned,
	{
		if !self.enabled {
			return None;
		}

		let bytes = match self.store.get(&directive.key).await {
			Ok(bytes) => bytes?,
			Err(err) => {
				tracing::warn!(key = %directive.key, error = %err, "response cache read failed");

				return None;
			},
		};

		match serde_json::from_slice(&bytes) {
			Ok(value) => Some(value),
			Err(err) => {
				// A corrupt entry expires on its own; treat it as a miss.
				tracing::warn!(key = %directive.key, error = %err, "cached response undecodable");

				None
			},
		}
	}

	pub async fn put<T>(&self, directive: &CacheDirective, value: &T)
	where
		T: Serialize,
	{
		if !self.enabled {
			return;
		}

		let bytes = match serde_json::to_vec(value) {
			Ok(bytes) => bytes,
			Err(err) => {
				tracing::warn!(key = %directive.key, error = %err, "response not cacheable");

				return;
			},
		};

		if let Err(err) = self.store.set(&directive.key, bytes, directive.ttl).await {
			tracing::warn!(key = %directive.key, error = %err, "response cache write failed");
		}
	}
}

/// In-process response store over the shared TTL map. The default store when
/// no external cache is wired in.
#[derive(Default)]
pub struct MemoryResponseStore {
	entries: TtlMap<Vec<u8>>,
}
impl MemoryResponseStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn sweep(&self) {
		self.entries.sweep();
	}
}

impl ResponseStore for MemoryResponseStore {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
		Box::pin(async move { Ok(self.entries.get(key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: Duration) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.entries.insert(key.to_string(), value, ttl);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn enabled_cache() -> ResponseCache {
		ResponseCache { store: Arc::new(MemoryResponseStore::new()), enabled: true }
	}

	#[test]
	fn key_is_stable_across_map_insertion_order() {
		let forward = serde_json::json!({ "filters": { "a": 1, "b": 2 }, "offset": 0 });
		let reverse = serde_json::json!({ "offset": 0, "filters": { "b": 2, "a": 1 } });

		assert_eq!(hash_cache_key(&forward), hash_cache_key(&reverse));
	}

	#[test]
	fn distinct_payloads_hash_apart() {
		let first = serde_json::json!({ "offset": 0 });
		let second = serde_json::json!({ "offset": 25 });

		assert_ne!(hash_cache_key(&first), hash_cache_key(&second));
	}

	#[tokio::test]
	async fn round_trips_through_the_memory_store() {
		let cache = enabled_cache();
		let directive = CacheDirective::new(
			"list_transactions",
			&serde_json::json!({ "offset": 0 }),
			Duration::from_secs(60),
		);

		assert_eq!(cache.get::<Vec<u32>>(&directive).await, None);

		cache.put(&directive, &vec![1_u32, 2, 3]).await;

		assert_eq!(cache.get::<Vec<u32>>(&directive).await, Some(vec![1, 2, 3]));
	}

	#[tokio::test]
	async fn disabled_cache_never_hits() {
		let cache = ResponseCache { store: Arc::new(MemoryResponseStore::new()), enabled: false };
		let directive = CacheDirective::new(
			"list_transactions",
			&serde_json::json!({ "offset": 0 }),
			Duration::from_secs(60),
		);

		cache.put(&directive, &vec![1_u32]).await;

		assert_eq!(cache.get::<Vec<u32>>(&directive).await, None);
	}
}
