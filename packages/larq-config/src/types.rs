use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub status: StatusUpstream,
	pub elastic: Elastic,
	pub pagination: Pagination,
	pub query: QueryLimits,
	pub cache: ResponseCache,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

/// The archive-status collaborator and the TTLs governing its cached
/// snapshots.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpstream {
	pub api_base: String,
	pub timeout_ms: u64,
	pub status_ttl_ms: u64,
	pub intervals_ttl_ms: u64,
	#[serde(default = "default_sweep_interval_ms")]
	pub sweep_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Elastic {
	pub api_base: String,
	pub timeout_ms: u64,
	pub transactions_index: String,
	pub tick_data_index: String,
	pub events_index: String,
	pub empty_ticks_index: String,
	#[serde(default = "default_scroll_ttl")]
	pub scroll_ttl: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
	pub default_size: u32,
	pub max_size: u32,
	pub max_hits: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryLimits {
	pub max_filters: usize,
	pub max_ranges: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseCache {
	pub enabled: bool,
	pub response_ttl_ms: u64,
	pub empty_ticks_ttl_ms: u64,
}

fn default_sweep_interval_ms() -> u64 {
	5_000
}

fn default_scroll_ttl() -> String {
	"1m".to_string()
}
