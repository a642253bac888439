//! Test collaborators for the service layer: scripted stand-ins for the
//! status upstream, the search backend, and the response store, each counting
//! its calls so tests can assert on interaction, not just on results.

use std::{
	collections::{HashMap, VecDeque},
	sync::{
		Mutex, PoisonError,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::Value;

use larq_domain::{ArchiveStatus, TickInterval};
use larq_service::{BoxFuture, Error, ResponseStore, Result, SearchStore, StatusProvider};
use larq_storage::SearchHits;

fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A status upstream with settable values, an optional artificial delay, and
/// a failure switch.
pub struct MockStatusProvider {
	status: Mutex<ArchiveStatus>,
	intervals: Mutex<Vec<TickInterval>>,
	delay: Mutex<Option<Duration>>,
	fail: AtomicBool,
	pub status_calls: AtomicUsize,
	pub intervals_calls: AtomicUsize,
}
impl MockStatusProvider {
	pub fn new(status: ArchiveStatus, intervals: Vec<TickInterval>) -> Self {
		Self {
			status: Mutex::new(status),
			intervals: Mutex::new(intervals),
			delay: Mutex::new(None),
			fail: AtomicBool::new(false),
			status_calls: AtomicUsize::new(0),
			intervals_calls: AtomicUsize::new(0),
		}
	}

	pub fn set_status(&self, status: ArchiveStatus) {
		*lock(&self.status) = status;
	}

	pub fn set_intervals(&self, intervals: Vec<TickInterval>) {
		*lock(&self.intervals) = intervals;
	}

	/// Stretches every fetch, so tests can pile up concurrent waiters on one
	/// in-flight fetch.
	pub fn set_delay(&self, delay: Duration) {
		*lock(&self.delay) = Some(delay);
	}

	pub fn set_fail(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}

	async fn simulate(&self) -> Result<()> {
		let delay = *lock(&self.delay);

		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		if self.fail.load(Ordering::SeqCst) {
			return Err(Error::UpstreamUnavailable { message: "scripted failure".to_string() });
		}

		Ok(())
	}
}

impl StatusProvider for MockStatusProvider {
	fn status<'a>(&'a self) -> BoxFuture<'a, Result<ArchiveStatus>> {
		Box::pin(async move {
			self.status_calls.fetch_add(1, Ordering::SeqCst);
			self.simulate().await?;

			Ok(lock(&self.status).clone())
		})
	}

	fn tick_intervals<'a>(&'a self) -> BoxFuture<'a, Result<Vec<TickInterval>>> {
		Box::pin(async move {
			self.intervals_calls.fetch_add(1, Ordering::SeqCst);
			self.simulate().await?;

			Ok(lock(&self.intervals).clone())
		})
	}
}

/// A search backend with stored documents and scripted search responses.
/// Searches replay the scripted queue front to back; an empty queue answers
/// with zero hits. The last search body is kept for assertions on compiled
/// queries.
#[derive(Default)]
pub struct MemorySearchStore {
	docs: Mutex<HashMap<(String, String), Value>>,
	scripted: Mutex<VecDeque<SearchHits>>,
	pub search_calls: AtomicUsize,
	pub scroll_calls: AtomicUsize,
	pub last_body: Mutex<Option<Value>>,
}
impl MemorySearchStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn put_doc(&self, index: &str, id: &str, source: Value) {
		lock(&self.docs).insert((index.to_string(), id.to_string()), source);
	}

	pub fn script_hits(&self, hits: SearchHits) {
		lock(&self.scripted).push_back(hits);
	}

	pub fn last_body(&self) -> Option<Value> {
		lock(&self.last_body).clone()
	}

	fn next_hits(&self) -> SearchHits {
		lock(&self.scripted)
			.pop_front()
			.unwrap_or(SearchHits { total: 0, hits: Vec::new(), scroll_id: None })
	}
}

impl SearchStore for MemorySearchStore {
	fn get<'a>(&'a self, index: &'a str, id: &'a str) -> BoxFuture<'a, Result<Option<Value>>> {
		Box::pin(async move {
			Ok(lock(&self.docs).get(&(index.to_string(), id.to_string())).cloned())
		})
	}

	fn search<'a>(&'a self, _: &'a str, body: &'a Value) -> BoxFuture<'a, Result<SearchHits>> {
		Box::pin(async move {
			self.search_calls.fetch_add(1, Ordering::SeqCst);
			*lock(&self.last_body) = Some(body.clone());

			Ok(self.next_hits())
		})
	}

	fn search_scrolled<'a>(
		&'a self,
		_: &'a str,
		body: &'a Value,
	) -> BoxFuture<'a, Result<SearchHits>> {
		Box::pin(async move {
			self.search_calls.fetch_add(1, Ordering::SeqCst);
			*lock(&self.last_body) = Some(body.clone());

			Ok(self.next_hits())
		})
	}

	fn scroll<'a>(&'a self, _: &'a str) -> BoxFuture<'a, Result<SearchHits>> {
		Box::pin(async move {
			self.scroll_calls.fetch_add(1, Ordering::SeqCst);

			Ok(self.next_hits())
		})
	}
}

struct StoredResponse {
	value: Vec<u8>,
	ttl: Duration,
}

/// A response store that counts reads and writes. Writes can be switched to
/// fail, for asserting that cache failures stay invisible to callers.
#[derive(Default)]
pub struct CountingResponseStore {
	entries: Mutex<HashMap<String, StoredResponse>>,
	fail_set: AtomicBool,
	pub get_calls: AtomicUsize,
	pub set_calls: AtomicUsize,
}
impl CountingResponseStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_fail_writes(&self, fail: bool) {
		self.fail_set.store(fail, Ordering::SeqCst);
	}

	pub fn ttl_of(&self, key: &str) -> Option<Duration> {
		lock(&self.entries).get(key).map(|entry| entry.ttl)
	}

	pub fn len(&self) -> usize {
		lock(&self.entries).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl ResponseStore for CountingResponseStore {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
		Box::pin(async move {
			self.get_calls.fetch_add(1, Ordering::SeqCst);

			Ok(lock(&self.entries).get(key).map(|entry| entry.value.clone()))
		})
	}

	fn set<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: Duration) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.set_calls.fetch_add(1, Ordering::SeqCst);

			if self.fail_set.load(Ordering::SeqCst) {
				return Err(Error::Backend { message: "scripted write failure".to_string() });
			}

			lock(&self.entries).insert(key.to_string(), StoredResponse { value, ttl });

			Ok(())
		})
	}
}
