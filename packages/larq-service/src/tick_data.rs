use serde::{Deserialize, Serialize};

use larq_storage::{EmptyTicksDoc, TickData};

use crate::{
	ArchiveService, CacheDirective, Error, Result, decode_doc, pipeline::QueryMeta,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTickDataRequest {
	pub tick_number: u64,
}

/// `tick_data` is absent for ticks the archiver recorded as deliberately
/// empty; such ticks are archived, they just carry no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTickDataResponse {
	pub tick_data: Option<TickData>,
}

impl ArchiveService {
	pub async fn tick_data(&self, req: GetTickDataRequest) -> Result<GetTickDataResponse> {
		let payload = serde_json::json!({ "tickNumber": req.tick_number });
		let meta = QueryMeta::new("tick_data")
			.tick(req.tick_number)
			.cache(CacheDirective::new("tick_data", &payload, self.response_ttl()));

		self.dispatch(meta, || async {
			let index = &self.cfg.elastic.tick_data_index;
			let id = req.tick_number.to_string();

			if let Some(doc) = self.search.get(index, &id).await? {
				let tick_data = decode_doc(doc, "tick data")?;

				return Ok(GetTickDataResponse { tick_data: Some(tick_data) });
			}

			// The document is missing although the tick passed the bounds
			// check. Either the tick is a recorded empty tick, or the
			// archive has a hole.
			let epoch = self.epoch_of(req.tick_number).await?;
			let empty = self
				.empty_ticks
				.is_empty_tick(epoch, req.tick_number, || {
					let search = self.search.clone();
					let index = self.cfg.elastic.empty_ticks_index.clone();
					let id = epoch.to_string();

					Box::pin(async move {
						match search.get(&index, &id).await? {
							Some(doc) => {
								let doc: EmptyTicksDoc = decode_doc(doc, "empty ticks")?;

								Ok(doc.ranges)
							},
							// No document yet for the epoch; nothing known
							// empty.
							None => Ok(Vec::new()),
						}
					})
				})
				.await?;

			if empty {
				Ok(GetTickDataResponse { tick_data: None })
			} else {
				Err(Error::NotFound {
					message: format!("Tick data for tick {} is not archived.", req.tick_number),
				})
			}
		})
		.await
	}

	/// The epoch that covers a tick, from the cached processed intervals.
	/// Ticks past every interval fall into the currently processing epoch.
	async fn epoch_of(&self, tick: u64) -> Result<u32> {
		let intervals = self.status_cache.tick_intervals().await?;

		if let Some(interval) = intervals.iter().find(|interval| interval.contains(tick)) {
			return Ok(interval.epoch);
		}

		let status = self.status_cache.status().await?;

		Ok(status.processing_epoch)
	}
}
