use std::{
	sync::{Arc, Mutex, PoisonError},
	time::Duration,
};

use tokio::{sync::watch, task::JoinHandle};

use larq_domain::{ArchiveStatus, TickInterval};

use crate::{BoxFuture, Error, Result, StatusProvider, ttl::TtlEntry};

type FlightReceiver<T> = watch::Receiver<Option<Result<T>>>;

struct CellState<T> {
	value: Option<TtlEntry<T>>,
	inflight: Option<FlightReceiver<T>>,
}

/// One TTL-cached value with singleflight refresh. Concurrent callers that
/// miss join the single in-flight fetch and observe an identical result or
/// an identical error. The fetch runs on its own task, so one waiter's
/// cancellation never cancels it for the others.
pub(crate) struct SingleflightCell<T> {
	state: Arc<Mutex<CellState<T>>>,
	ttl: Duration,
}
impl<T> SingleflightCell<T>
where
	T: Clone + Send + Sync + 'static,
{
	pub(crate) fn new(ttl: Duration) -> Self {
		Self { state: Arc::new(Mutex::new(CellState { value: None, inflight: None })), ttl }
	}

	pub(crate) async fn get_or_fetch<F>(&self, fetch: F) -> Result<T>
	where
		F: FnOnce() -> BoxFuture<'static, Result<T>>,
	{
		let mut rx = {
			let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

			if let Some(entry) = &state.value
				&& !entry.is_expired()
			{
				return Ok(entry.value.clone());
			}
			if let Some(rx) = &state.inflight {
				rx.clone()
			} else {
				let (tx, rx) = watch::channel(None);
				let shared = self.state.clone();
				let ttl = self.ttl;
				let future = fetch();

				state.inflight = Some(rx.clone());

				tokio::spawn(async move {
					let result = future.await;

					{
						let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);

						if let Ok(value) = &result {
							state.value = Some(TtlEntry::new(value.clone(), ttl));
						}

						state.inflight = None;
					}

					let _ = tx.send(Some(result));
				});

				rx
			}
		};

		loop {
			{
				let published = rx.borrow_and_update();

				if let Some(result) = published.as_ref() {
					return result.clone();
				}
			}

			if rx.changed().await.is_err() {
				return Err(Error::UpstreamUnavailable {
					message: "Status fetch ended without publishing a result.".to_string(),
				});
			}
		}
	}

	pub(crate) fn sweep(&self) {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

		if state.value.as_ref().map(TtlEntry::is_expired).unwrap_or(false) {
			state.value = None;
		}
	}
}

/// Shields the request path from upstream latency and duplicate concurrent
/// fetches of archive-progress data. Both cached keys are independent and
/// rebuildable; nothing here survives a restart.
pub struct StatusCache {
	provider: Arc<dyn StatusProvider>,
	status: SingleflightCell<ArchiveStatus>,
	intervals: SingleflightCell<Vec<TickInterval>>,
	sweep_interval: Duration,
}
impl StatusCache {
	pub fn new(provider: Arc<dyn StatusProvider>, cfg: &larq_config::StatusUpstream) -> Self {
		Self {
			provider,
			status: SingleflightCell::new(Duration::from_millis(cfg.status_ttl_ms)),
			intervals: SingleflightCell::new(Duration::from_millis(cfg.intervals_ttl_ms)),
			sweep_interval: Duration::from_millis(cfg.sweep_interval_ms),
		}
	}

	pub async fn status(&self) -> Result<ArchiveStatus> {
		let provider = self.provider.clone();

		self.status.get_or_fetch(move || Box::pin(async move { provider.status().await })).await
	}

	/// A zero-interval report from the collaborator is a fatal
	/// misconfiguration, not a transient miss; it is surfaced as an error
	/// and never cached as a value.
	pub async fn tick_intervals(&self) -> Result<Vec<TickInterval>> {
		let provider = self.provider.clone();

		self.intervals
			.get_or_fetch(move || {
				Box::pin(async move {
					let intervals = provider.tick_intervals().await?;

					if intervals.is_empty() {
						return Err(Error::NoIntervalsFound);
					}

					Ok(intervals)
				})
			})
			.await
	}

	/// Starts the TTL-sweep task. The returned handle must be stopped as
	/// part of process shutdown.
	pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperHandle {
		let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
		let cache = self.clone();
		let interval = self.sweep_interval;
		let handle = tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = shutdown_rx.changed() => break,
					_ = tokio::time::sleep(interval) => {
						cache.status.sweep();
						cache.intervals.sweep();
					},
				}
			}
		});

		SweeperHandle { shutdown: shutdown_tx, handle }
	}
}

pub struct SweeperHandle {
	shutdown: watch::Sender<bool>,
	handle: JoinHandle<()>,
}
impl SweeperHandle {
	pub async fn stop(self) {
		let _ = self.shutdown.send(true);
		let _ = self.handle.await;
	}
}
