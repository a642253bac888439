use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::{Error, Result};

/// Hits returned by one search or scroll round trip.
#[derive(Debug, Clone)]
pub struct SearchHits {
	pub total: u64,
	pub hits: Vec<Value>,
	pub scroll_id: Option<String>,
}

/// Thin client for the search-engine document store. This crate only ships
/// compiled query bodies and decodes hit envelopes; indexing and sharding
/// belong to the backend.
pub struct ElasticStore {
	client: Client,
	api_base: String,
	scroll_ttl: String,
}
impl ElasticStore {
	pub fn new(cfg: &larq_config::Elastic) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self {
			client,
			api_base: cfg.api_base.clone(),
			scroll_ttl: cfg.scroll_ttl.clone(),
		})
	}

	/// Fetches one document's source by id. Absence is `Ok(None)`, not an
	/// error; only transport and backend failures surface as `Err`.
	pub async fn get(&self, index: &str, id: &str) -> Result<Option<Value>> {
		let url = format!("{}/{index}/_doc/{id}", self.api_base);
		let res = self.client.get(url).send().await?;

		if res.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}

		let json: Value = res.error_for_status()?.json().await?;

		if !json.get("found").and_then(Value::as_bool).unwrap_or(false) {
			return Ok(None);
		}

		json.get("_source")
			.cloned()
			.map(Some)
			.ok_or_else(|| Error::Decode("Document response is missing _source.".to_string()))
	}

	pub async fn search(&self, index: &str, body: &Value) -> Result<SearchHits> {
		let url = format!("{}/{index}/_search", self.api_base);
		let res = self.client.post(url).json(body).send().await?;
		let json: Value = check_backend_status(res).await?.json().await?;

		parse_search_response(json)
	}

	/// Opens a scrolled search; follow up with [`Self::scroll`] using the
	/// returned cursor.
	pub async fn search_scrolled(&self, index: &str, body: &Value) -> Result<SearchHits> {
		let url = format!("{}/{index}/_search?scroll={}", self.api_base, self.scroll_ttl);
		let res = self.client.post(url).json(body).send().await?;
		let json: Value = check_backend_status(res).await?.json().await?;

		parse_search_response(json)
	}

	pub async fn scroll(&self, scroll_id: &str) -> Result<SearchHits> {
		let url = format!("{}/_search/scroll", self.api_base);
		let body = serde_json::json!({ "scroll": self.scroll_ttl, "scroll_id": scroll_id });
		let res = self.client.post(url).json(&body).send().await?;
		let json: Value = check_backend_status(res).await?.json().await?;

		parse_search_response(json)
	}
}

async fn check_backend_status(res: reqwest::Response) -> Result<reqwest::Response> {
	if res.status().is_success() {
		return Ok(res);
	}

	let status = res.status();
	let detail = res.text().await.unwrap_or_default();

	Err(Error::Backend(format!("Search request failed with {status}: {detail}")))
}

fn parse_search_response(json: Value) -> Result<SearchHits> {
	let hits_obj = json
		.get("hits")
		.ok_or_else(|| Error::Decode("Search response is missing hits.".to_string()))?;
	let total = hits_obj
		.get("total")
		.and_then(|total| total.get("value"))
		.and_then(Value::as_u64)
		.ok_or_else(|| Error::Decode("Search response is missing hits.total.value.".to_string()))?;
	let raw_hits = hits_obj
		.get("hits")
		.and_then(Value::as_array)
		.ok_or_else(|| Error::Decode("Search response is missing hits.hits.".to_string()))?;

	let mut hits = Vec::with_capacity(raw_hits.len());

	for hit in raw_hits {
		let source = hit
			.get("_source")
			.cloned()
			.ok_or_else(|| Error::Decode("Search hit is missing _source.".to_string()))?;

		hits.push(source);
	}

	let scroll_id = json.get("_scroll_id").and_then(Value::as_str).map(str::to_string);

	Ok(SearchHits { total, hits, scroll_id })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_hits_total_and_sources() {
		let json = serde_json::json!({
			"hits": {
				"total": { "value": 2, "relation": "eq" },
				"hits": [
					{ "_id": "a", "_source": { "tickNumber": 1 } },
					{ "_id": "b", "_source": { "tickNumber": 2 } }
				]
			}
		});
		let parsed = parse_search_response(json).expect("parse failed");

		assert_eq!(parsed.total, 2);
		assert_eq!(parsed.hits.len(), 2);
		assert_eq!(parsed.hits[0]["tickNumber"], 1);
		assert!(parsed.scroll_id.is_none());
	}

	#[test]
	fn parses_scroll_cursor() {
		let json = serde_json::json!({
			"_scroll_id": "cursor-1",
			"hits": { "total": { "value": 0 }, "hits": [] }
		});
		let parsed = parse_search_response(json).expect("parse failed");

		assert_eq!(parsed.scroll_id.as_deref(), Some("cursor-1"));
	}

	#[test]
	fn rejects_envelope_without_hits() {
		let json = serde_json::json!({ "took": 3 });

		assert!(matches!(parse_search_response(json), Err(Error::Decode(_))));
	}
}
