use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use larq_domain::{ArchiveStatus, TickInterval};

use crate::Result;

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
	#[serde(rename = "lastProcessedTick")]
	last_processed_tick: u64,
	#[serde(rename = "processingEpoch")]
	processing_epoch: u32,
	#[serde(rename = "intervalInitialTick")]
	interval_initial_tick: u64,
}

#[derive(Debug, Deserialize)]
struct IntervalsEnvelope {
	intervals: Vec<IntervalRecord>,
}

#[derive(Debug, Deserialize)]
struct IntervalRecord {
	epoch: u32,
	#[serde(rename = "firstTick")]
	first_tick: u64,
	#[serde(rename = "lastTick")]
	last_tick: u64,
}

/// Client for the remote archive-status collaborator. Possibly slow or
/// unavailable; callers decide how failures propagate, no retries here.
pub struct StatusClient {
	client: Client,
	api_base: String,
}
impl StatusClient {
	pub fn new(cfg: &larq_config::StatusUpstream) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, api_base: cfg.api_base.clone() })
	}

	pub async fn get_status(&self) -> Result<ArchiveStatus> {
		let url = format!("{}/v1/status", self.api_base);
		let envelope: StatusEnvelope =
			self.client.get(url).send().await?.error_for_status()?.json().await?;

		Ok(ArchiveStatus {
			last_processed_tick: envelope.last_processed_tick,
			processing_epoch: envelope.processing_epoch,
			interval_initial_tick: envelope.interval_initial_tick,
		})
	}

	pub async fn get_tick_intervals(&self) -> Result<Vec<TickInterval>> {
		let url = format!("{}/v1/tick-intervals", self.api_base);
		let envelope: IntervalsEnvelope =
			self.client.get(url).send().await?.error_for_status()?.json().await?;

		Ok(envelope
			.intervals
			.into_iter()
			.map(|record| TickInterval {
				epoch: record.epoch,
				first_tick: record.first_tick,
				last_tick: record.last_tick,
			})
			.collect())
	}
}
