use serde::{Deserialize, Serialize};

/// An archived transfer as stored in the transactions index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
	#[serde(rename = "txId")]
	pub tx_id: String,
	pub source: String,
	pub destination: String,
	pub amount: i64,
	#[serde(rename = "tickNumber")]
	pub tick_number: u64,
	#[serde(rename = "inputType")]
	pub input_type: u32,
	pub timestamp: u64,
	#[serde(rename = "moneyFlew", default)]
	pub money_flew: bool,
}

/// Per-tick metadata as stored in the tick-data index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickData {
	#[serde(rename = "tickNumber")]
	pub tick_number: u64,
	pub epoch: u32,
	pub timestamp: u64,
	pub signature: String,
}

/// An archived ledger event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	#[serde(rename = "eventId")]
	pub event_id: String,
	#[serde(rename = "tickNumber")]
	pub tick_number: u64,
	#[serde(rename = "eventType")]
	pub event_type: u32,
	pub emitter: String,
	pub timestamp: u64,
	#[serde(default)]
	pub payload: serde_json::Value,
}

/// One per-epoch document in the empty-ticks index: the tick runs inside the
/// epoch's processed intervals for which no tick-data document exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmptyTicksDoc {
	pub epoch: u32,
	pub ranges: Vec<larq_domain::TickRange>,
}
