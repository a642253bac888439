use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use larq_storage::Transaction;

use crate::{
	ArchiveService, CacheDirective, CompileInput, Error, Page, RangeBound, Result, decode_doc,
	pipeline::QueryMeta, response_cache::canonical_query_payload,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransactionRequest {
	pub tx_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransactionResponse {
	pub transaction: Transaction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListTransactionsRequest {
	pub identity: Option<String>,
	pub filters: HashMap<String, Vec<String>>,
	pub ranges: HashMap<String, Vec<RangeBound>>,
	pub page: Page,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTransactionsResponse {
	pub total: u64,
	pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransactionsForTickRequest {
	pub tick_number: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransactionsForTickResponse {
	pub transactions: Vec<Transaction>,
}

// Newest first, transaction id as the tie breaker so pages never shuffle
// between requests.
fn transaction_sort() -> Value {
	serde_json::json!([
		{ "timestamp": { "order": "desc" } },
		{ "txId": { "order": "asc" } },
	])
}

impl ArchiveService {
	pub async fn transaction(&self, req: GetTransactionRequest) -> Result<GetTransactionResponse> {
		let meta = QueryMeta::new("get_transaction").tx_id(&req.tx_id);

		self.dispatch(meta, || async {
			let index = &self.cfg.elastic.transactions_index;
			let doc = self.search.get(index, &req.tx_id).await?.ok_or_else(|| {
				Error::NotFound { message: format!("Transaction {} is not archived.", req.tx_id) }
			})?;
			let transaction = decode_doc(doc, "transaction")?;

			Ok(GetTransactionResponse { transaction })
		})
		.await
	}

	pub async fn list_transactions(
		&self,
		req: ListTransactionsRequest,
	) -> Result<ListTransactionsResponse> {
		let payload =
			canonical_query_payload(req.identity.as_deref(), &req.filters, &req.ranges, req.page);
		let mut meta = QueryMeta::new("list_transactions")
			.cache(CacheDirective::new("list_transactions", &payload, self.response_ttl()));

		if let Some(identity) = &req.identity {
			meta = meta.identity(identity);
		}

		self.dispatch(meta, || async {
			let window = self.pagination.resolve(req.page)?;
			let status = self.status_cache.status().await?;
			let query = self.compiler.compile(CompileInput {
				identity: req.identity.as_deref(),
				filters: &req.filters,
				ranges: &req.ranges,
				max_tick: status.last_processed_tick,
			})?;
			let body = serde_json::json!({
				"from": window.from,
				"query": query,
				"size": window.size,
				"sort": transaction_sort(),
				"track_total_hits": true,
			});
			let index = &self.cfg.elastic.transactions_index;
			let hits = self.search.search(index, &body).await?;
			let transactions = hits
				.hits
				.into_iter()
				.map(|hit| decode_doc(hit, "transaction"))
				.collect::<Result<_>>()?;

			Ok(ListTransactionsResponse { total: hits.total, transactions })
		})
		.await
	}

	/// Every archived transaction of one tick, walked through the scroll
	/// cursor. The tick bound check has already capped the tick, so the
	/// result set is finite and needs no pagination.
	pub async fn transactions_for_tick(
		&self,
		req: GetTransactionsForTickRequest,
	) -> Result<GetTransactionsForTickResponse> {
		let payload = serde_json::json!({ "tickNumber": req.tick_number });
		let meta = QueryMeta::new("transactions_for_tick").tick(req.tick_number).cache(
			CacheDirective::new("transactions_for_tick", &payload, self.response_ttl()),
		);

		self.dispatch(meta, || async {
			let body = serde_json::json!({
				"query": { "term": { "tickNumber": req.tick_number } },
				"size": self.pagination.max_hits(),
				"sort": transaction_sort(),
				"track_total_hits": true,
			});
			let index = &self.cfg.elastic.transactions_index;
			let transactions = self.collect_scrolled(index, &body, "transaction").await?;

			Ok(GetTransactionsForTickResponse { transactions })
		})
		.await
	}
}
