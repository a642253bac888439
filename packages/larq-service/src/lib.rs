pub mod empty_ticks;
pub mod events;
pub mod pagination;
pub mod query;
pub mod response_cache;
pub mod status_cache;
pub mod tick_bounds;
pub mod tick_data;
pub mod transactions;
pub mod ttl;

mod pipeline;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use serde_json::Value;

use larq_config::Config;
use larq_domain::{ArchiveStatus, TickInterval};
use larq_storage::{ElasticStore, SearchHits, StatusClient};

pub use events::{
	GetEventsForTickRequest, GetEventsForTickResponse, QueryEventsRequest, QueryEventsResponse,
};
pub use pagination::{Page, PageWindow, PaginationPolicy};
pub use query::{CompileInput, QueryCompiler, RangeBound, RangeOp};
pub use response_cache::{CacheDirective, MemoryResponseStore, ResponseCache};
pub use status_cache::{StatusCache, SweeperHandle};
pub use tick_bounds::TickBoundsValidator;
pub use tick_data::{GetTickDataRequest, GetTickDataResponse};
pub use transactions::{
	GetTransactionRequest, GetTransactionResponse, GetTransactionsForTickRequest,
	GetTransactionsForTickResponse, ListTransactionsRequest, ListTransactionsResponse,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors are cloneable so a singleflight fetch can fan one outcome out to
/// every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {message}")]
	InvalidArgument { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Requested tick {tick} is beyond the last processed tick {last_processed_tick}.")]
	TickNotProcessed { tick: u64, last_processed_tick: u64 },
	#[error("Tick {tick} was skipped by the archiver; the next available tick is {next_available_tick}.")]
	TickSkipped { tick: u64, next_available_tick: u64 },
	#[error("Status upstream unavailable: {message}")]
	UpstreamUnavailable { message: String },
	#[error("Status upstream reported no processed tick intervals.")]
	NoIntervalsFound,
	#[error("Search backend error: {message}")]
	Backend { message: String },
	#[error("Internal processing error.")]
	Internal,
}
impl Error {
	/// Technical errors are logged in full at the pipeline boundary and
	/// reach the caller only in sanitized form.
	pub fn is_technical(&self) -> bool {
		matches!(
			self,
			Self::UpstreamUnavailable { .. } | Self::NoIntervalsFound | Self::Backend { .. }
		)
	}
}

impl From<larq_storage::Error> for Error {
	fn from(err: larq_storage::Error) -> Self {
		Self::Backend { message: err.to_string() }
	}
}

pub trait StatusProvider
where
	Self: Send + Sync,
{
	fn status<'a>(&'a self) -> BoxFuture<'a, Result<ArchiveStatus>>;

	fn tick_intervals<'a>(&'a self) -> BoxFuture<'a, Result<Vec<TickInterval>>>;
}

pub trait SearchStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, index: &'a str, id: &'a str) -> BoxFuture<'a, Result<Option<Value>>>;

	fn search<'a>(&'a self, index: &'a str, body: &'a Value) -> BoxFuture<'a, Result<SearchHits>>;

	fn search_scrolled<'a>(
		&'a self,
		index: &'a str,
		body: &'a Value,
	) -> BoxFuture<'a, Result<SearchHits>>;

	fn scroll<'a>(&'a self, scroll_id: &'a str) -> BoxFuture<'a, Result<SearchHits>>;
}

pub trait ResponseStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>>;

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: Vec<u8>,
		ttl: Duration,
	) -> BoxFuture<'a, Result<()>>;
}

impl SearchStore for ElasticStore {
	fn get<'a>(&'a self, index: &'a str, id: &'a str) -> BoxFuture<'a, Result<Option<Value>>> {
		Box::pin(async move { Ok(ElasticStore::get(self, index, id).await?) })
	}

	fn search<'a>(&'a self, index: &'a str, body: &'a Value) -> BoxFuture<'a, Result<SearchHits>> {
		Box::pin(async move { Ok(ElasticStore::search(self, index, body).await?) })
	}

	fn search_scrolled<'a>(
		&'a self,
		index: &'a str,
		body: &'a Value,
	) -> BoxFuture<'a, Result<SearchHits>> {
		Box::pin(async move { Ok(ElasticStore::search_scrolled(self, index, body).await?) })
	}

	fn scroll<'a>(&'a self, scroll_id: &'a str) -> BoxFuture<'a, Result<SearchHits>> {
		Box::pin(async move { Ok(ElasticStore::scroll(self, scroll_id).await?) })
	}
}

impl StatusProvider for StatusClient {
	fn status<'a>(&'a self) -> BoxFuture<'a, Result<ArchiveStatus>> {
		Box::pin(async move {
			StatusClient::get_status(self)
				.await
				.map_err(|err| Error::UpstreamUnavailable { message: err.to_string() })
		})
	}

	fn tick_intervals<'a>(&'a self) -> BoxFuture<'a, Result<Vec<TickInterval>>> {
		Box::pin(async move {
			StatusClient::get_tick_intervals(self)
				.await
				.map_err(|err| Error::UpstreamUnavailable { message: err.to_string() })
		})
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArchiveStatusResponse {
	pub status: ArchiveStatus,
	pub intervals: Vec<TickInterval>,
}

/// The query service: validation, compilation, and caching between the entry
/// points and the search backend. Safe under arbitrary concurrent
/// invocation; all shared state lives in the caches, behind their own locks.
pub struct ArchiveService {
	pub cfg: Config,
	search: Arc<dyn SearchStore>,
	status_cache: Arc<StatusCache>,
	tick_bounds: TickBoundsValidator,
	compiler: QueryCompiler,
	pagination: PaginationPolicy,
	response_cache: ResponseCache,
	empty_ticks: empty_ticks::EmptyTickCache,
}
impl ArchiveService {
	pub fn new(
		cfg: Config,
		search: Arc<dyn SearchStore>,
		status: Arc<dyn StatusProvider>,
		responses: Arc<dyn ResponseStore>,
	) -> Self {
		let status_cache = Arc::new(StatusCache::new(status, &cfg.status));
		let tick_bounds = TickBoundsValidator::new(status_cache.clone());
		let compiler = QueryCompiler::new(&cfg.query);
		let pagination = PaginationPolicy::new(&cfg.pagination);
		let response_cache = ResponseCache::new(responses, &cfg.cache);
		let empty_ticks = empty_ticks::EmptyTickCache::new(Duration::from_millis(
			cfg.cache.empty_ticks_ttl_ms,
		));

		Self {
			cfg,
			search,
			status_cache,
			tick_bounds,
			compiler,
			pagination,
			response_cache,
			empty_ticks,
		}
	}

	/// The status cache's sweep task is owned by the process, not by the
	/// service; the app spawns and stops it around the server's lifetime.
	pub fn status_cache(&self) -> &Arc<StatusCache> {
		&self.status_cache
	}

	pub async fn archive_status(&self) -> Result<ArchiveStatusResponse> {
		let meta = pipeline::QueryMeta::new("archive_status");

		self.dispatch(meta, || async {
			let status = self.status_cache.status().await?;
			let intervals = self.status_cache.tick_intervals().await?;

			Ok(ArchiveStatusResponse { status, intervals })
		})
		.await
	}

	pub(crate) fn response_ttl(&self) -> Duration {
		Duration::from_millis(self.cfg.cache.response_ttl_ms)
	}

	/// Opens a scrolled search and walks the cursor until every hit of the
	/// result set has been decoded.
	pub(crate) async fn collect_scrolled<T>(
		&self,
		index: &str,
		body: &Value,
		label: &str,
	) -> Result<Vec<T>>
	where
		T: serde::de::DeserializeOwned,
	{
		let mut hits = self.search.search_scrolled(index, body).await?;
		let total = hits.total;
		let mut docs: Vec<T> = Vec::with_capacity(hits.hits.len());

		loop {
			if hits.hits.is_empty() {
				break;
			}

			for hit in hits.hits.drain(..) {
				docs.push(decode_doc(hit, label)?);
			}

			match hits.scroll_id.take() {
				Some(scroll_id) if (docs.len() as u64) < total =>
					hits = self.search.scroll(&scroll_id).await?,
				_ => break,
			}
		}

		Ok(docs)
	}
}

pub(crate) fn decode_doc<T>(value: Value, label: &str) -> Result<T>
where
	T: serde::de::DeserializeOwned,
{
	serde_json::from_value(value)
		.map_err(|err| Error::Backend { message: format!("Invalid {label} document: {err}") })
}
