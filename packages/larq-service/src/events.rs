use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use larq_storage::Event;

use crate::{
	ArchiveService, CacheDirective, CompileInput, Page, RangeBound, Result, decode_doc,
	pipeline::QueryMeta, response_cache::canonical_query_payload,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryEventsRequest {
	pub filters: HashMap<String, Vec<String>>,
	pub ranges: HashMap<String, Vec<RangeBound>>,
	pub page: Page,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEventsResponse {
	pub total: u64,
	pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetEventsForTickRequest {
	pub tick_number: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetEventsForTickResponse {
	pub events: Vec<Event>,
}

// Emission order: by tick, event id as the tie breaker.
fn event_sort() -> Value {
	serde_json::json!([
		{ "tickNumber": { "order": "asc" } },
		{ "eventId": { "order": "asc" } },
	])
}

impl ArchiveService {
	pub async fn query_events(&self, req: QueryEventsRequest) -> Result<QueryEventsResponse> {
		let payload = canonical_query_payload(None, &req.filters, &req.ranges, req.page);
		let meta = QueryMeta::new("query_events")
			.cache(CacheDirective::new("query_events", &payload, self.response_ttl()));

		self.dispatch(meta, || async {
			let window = self.pagination.resolve(req.page)?;
			let status = self.status_cache.status().await?;
			let query = self.compiler.compile(CompileInput {
				identity: None,
				filters: &req.filters,
				ranges: &req.ranges,
				max_tick: status.last_processed_tick,
			})?;
			let body = serde_json::json!({
				"from": window.from,
				"query": query,
				"size": window.size,
				"sort": event_sort(),
				"track_total_hits": true,
			});
			let index = &self.cfg.elastic.events_index;
			let hits = self.search.search(index, &body).await?;
			let events =
				hits.hits.into_iter().map(|hit| decode_doc(hit, "event")).collect::<Result<_>>()?;

			Ok(QueryEventsResponse { total: hits.total, events })
		})
		.await
	}

	/// Every archived event of one tick, walked through the scroll cursor so
	/// an unusually busy tick is never truncated at the page ceiling.
	pub async fn events_for_tick(
		&self,
		req: GetEventsForTickRequest,
	) -> Result<GetEventsForTickResponse> {
		let payload = serde_json::json!({ "tickNumber": req.tick_number });
		let meta = QueryMeta::new("events_for_tick")
			.tick(req.tick_number)
			.cache(CacheDirective::new("events_for_tick", &payload, self.response_ttl()));

		self.dispatch(meta, || async {
			let body = serde_json::json!({
				"query": { "term": { "tickNumber": req.tick_number } },
				"size": self.pagination.max_hits(),
				"sort": event_sort(),
				"track_total_hits": true,
			});
			let index = &self.cfg.elastic.events_index;
			let events = self.collect_scrolled(index, &body, "event").await?;

			Ok(GetEventsForTickResponse { events })
		})
		.await
	}
}
