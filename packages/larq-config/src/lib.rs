mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Elastic, Pagination, QueryLimits, ResponseCache, Service, StatusUpstream,
};

use std::{fs, path::Path};

use error::invalid;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::Read { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::Parse { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(invalid("service.http_bind", "must be non-empty"));
	}
	if cfg.status.api_base.trim().is_empty() {
		return Err(invalid("status.api_base", "must be non-empty"));
	}
	if cfg.status.timeout_ms == 0 {
		return Err(invalid("status.timeout_ms", "must be greater than zero"));
	}
	if cfg.status.status_ttl_ms == 0 {
		return Err(invalid("status.status_ttl_ms", "must be greater than zero"));
	}
	if cfg.status.intervals_ttl_ms == 0 {
		return Err(invalid("status.intervals_ttl_ms", "must be greater than zero"));
	}
	if cfg.status.sweep_interval_ms == 0 {
		return Err(invalid("status.sweep_interval_ms", "must be greater than zero"));
	}
	if cfg.elastic.api_base.trim().is_empty() {
		return Err(invalid("elastic.api_base", "must be non-empty"));
	}
	if cfg.elastic.timeout_ms == 0 {
		return Err(invalid("elastic.timeout_ms", "must be greater than zero"));
	}

	for (field, index) in [
		("elastic.transactions_index", &cfg.elastic.transactions_index),
		("elastic.tick_data_index", &cfg.elastic.tick_data_index),
		("elastic.events_index", &cfg.elastic.events_index),
		("elastic.empty_ticks_index", &cfg.elastic.empty_ticks_index),
	] {
		if index.trim().is_empty() {
			return Err(invalid(field, "must be non-empty"));
		}
	}

	if cfg.pagination.default_size == 0 {
		return Err(invalid("pagination.default_size", "must be greater than zero"));
	}
	if cfg.pagination.max_size == 0 {
		return Err(invalid("pagination.max_size", "must be greater than zero"));
	}
	if cfg.pagination.default_size > cfg.pagination.max_size {
		return Err(invalid(
			"pagination.default_size",
			format!("must not exceed pagination.max_size [{}]", cfg.pagination.max_size),
		));
	}
	if cfg.pagination.max_hits < cfg.pagination.max_size {
		return Err(invalid(
			"pagination.max_hits",
			format!("must be at least pagination.max_size [{}]", cfg.pagination.max_size),
		));
	}
	if cfg.query.max_filters == 0 {
		return Err(invalid("query.max_filters", "must be greater than zero"));
	}
	if cfg.query.max_ranges == 0 {
		return Err(invalid("query.max_ranges", "must be greater than zero"));
	}
	if cfg.cache.response_ttl_ms == 0 {
		return Err(invalid("cache.response_ttl_ms", "must be greater than zero"));
	}
	if cfg.cache.empty_ticks_ttl_ms == 0 {
		return Err(invalid("cache.empty_ticks_ttl_ms", "must be greater than zero"));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	while cfg.status.api_base.ends_with('/') {
		cfg.status.api_base.pop();
	}
	while cfg.elastic.api_base.ends_with('/') {
		cfg.elastic.api_base.pop();
	}
	if cfg.elastic.scroll_ttl.trim().is_empty() {
		cfg.elastic.scroll_ttl = "1m".to_string();
	}
}
