use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};

use larq_domain::identity::{is_valid_identity, is_valid_tx_id};

use crate::{ArchiveService, CacheDirective, Error, Result};

/// What a request needs checked and cached, declared by its entry point
/// before the handler runs. Dispatch applies the steps in a fixed order:
/// tick bounds, identity format, cache read, handler, cache write.
pub(crate) struct QueryMeta {
	op: &'static str,
	tick: Option<u64>,
	identities: Vec<String>,
	tx_ids: Vec<String>,
	cache: Option<CacheDirective>,
}
impl QueryMeta {
	pub(crate) fn new(op: &'static str) -> Self {
		Self { op, tick: None, identities: Vec::new(), tx_ids: Vec::new(), cache: None }
	}

	pub(crate) fn tick(mut self, tick: u64) -> Self {
		self.tick = Some(tick);

		self
	}

	pub(crate) fn identity(mut self, identity: &str) -> Self {
		self.identities.push(identity.to_string());

		self
	}

	pub(crate) fn tx_id(mut self, tx_id: &str) -> Self {
		self.tx_ids.push(tx_id.to_string());

		self
	}

	pub(crate) fn cache(mut self, directive: CacheDirective) -> Self {
		self.cache = Some(directive);

		self
	}
}

impl ArchiveService {
	/// Runs a request through the shared pipeline. Technical failures are
	/// logged here in full and leave as the sanitized internal error; domain
	/// rejections pass through untouched.
	pub(crate) async fn dispatch<T, F, Fut>(&self, meta: QueryMeta, handler: F) -> Result<T>
	where
		T: Serialize + DeserializeOwned,
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		match self.run(&meta, handler).await {
			Ok(response) => Ok(response),
			Err(err) if err.is_technical() => {
				tracing::error!(op = meta.op, error = %err, "request failed");

				Err(Error::Internal)
			},
			Err(err) => Err(err),
		}
	}

	async fn run<T, F, Fut>(&self, meta: &QueryMeta, handler: F) -> Result<T>
	where
		T: Serialize + DeserializeOwned,
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		if let Some(tick) = meta.tick {
			self.tick_bounds.check(tick).await?;
		}

		for identity in &meta.identities {
			if !is_valid_identity(identity) {
				return Err(Error::InvalidArgument {
					message: format!("Identity '{identity}' is not a valid identity."),
				});
			}
		}
		for tx_id in &meta.tx_ids {
			if !is_valid_tx_id(tx_id) {
				return Err(Error::InvalidArgument {
					message: format!("Transaction id '{tx_id}' is not a valid transaction id."),
				});
			}
		}

		if let Some(directive) = &meta.cache
			&& let Some(cached) = self.response_cache.get::<T>(directive).await
		{
			return Ok(cached);
		}

		let response = handler().await?;

		if let Some(directive) = &meta.cache {
			self.response_cache.put(directive, &response).await;
		}

		Ok(response)
	}
}
