use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use larq_domain::identity::is_valid_identity;

use crate::{Error, Result};

/// One bound on a range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeOp {
	Gt,
	Gte,
	Lt,
	Lte,
}
impl RangeOp {
	fn as_str(self) -> &'static str {
		match self {
			Self::Gt => "gt",
			Self::Gte => "gte",
			Self::Lt => "lt",
			Self::Lte => "lte",
		}
	}

	fn is_lower(self) -> bool {
		matches!(self, Self::Gt | Self::Gte)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBound {
	pub op: RangeOp,
	pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
	Identity,
	Numeric,
}

/// The closed set of filterable fields. Unsupported names fail the enum
/// parse instead of leaking into the compiled query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FilterField {
	Amount,
	Destination,
	EventType,
	InputType,
	Source,
	TickNumber,
	Timestamp,
}
impl FilterField {
	fn as_str(self) -> &'static str {
		match self {
			Self::Amount => "amount",
			Self::Destination => "destination",
			Self::EventType => "eventType",
			Self::InputType => "inputType",
			Self::Source => "source",
			Self::TickNumber => "tickNumber",
			Self::Timestamp => "timestamp",
		}
	}

	fn parse(name: &str) -> Result<Self> {
		match name {
			"amount" => Ok(Self::Amount),
			"destination" => Ok(Self::Destination),
			"eventType" => Ok(Self::EventType),
			"inputType" => Ok(Self::InputType),
			"source" => Ok(Self::Source),
			"tickNumber" => Ok(Self::TickNumber),
			"timestamp" => Ok(Self::Timestamp),
			_ => Err(Error::InvalidArgument {
				message: format!(
					"Field '{name}' is not in the filter allowlist: amount, destination, eventType, inputType, source, tickNumber, timestamp."
				),
			}),
		}
	}

	fn kind(self) -> FieldKind {
		match self {
			Self::Source | Self::Destination => FieldKind::Identity,
			Self::Amount | Self::EventType | Self::InputType | Self::TickNumber
			| Self::Timestamp => FieldKind::Numeric,
		}
	}

	fn filter_value(self, raw: &str) -> Result<Value> {
		match self.kind() {
			FieldKind::Identity =>
				if is_valid_identity(raw) {
					Ok(Value::from(raw))
				} else {
					Err(Error::InvalidArgument {
						message: format!(
							"Filter value '{raw}' for field '{}' is not a valid identity.",
							self.as_str()
						),
					})
				},
			FieldKind::Numeric => self.numeric_value(raw).map(number_value),
		}
	}

	fn numeric_value(self, raw: &str) -> Result<i128> {
		let parsed = match self {
			Self::Amount => raw.parse::<i64>().map(i128::from).ok(),
			_ => raw.parse::<u64>().map(i128::from).ok(),
		};

		parsed.ok_or_else(|| Error::InvalidArgument {
			message: format!(
				"Range value '{raw}' for field '{}' is not numeric.",
				self.as_str()
			),
		})
	}
}

const EXCLUDE_SUFFIX: &str = "-exclude";

/// A filter key, parsed from its raw name. The `-exclude` suffix negates the
/// predicate: it compiles into the must-not clause instead of the positive
/// filter clause.
#[derive(Debug, Clone, Copy)]
struct FilterKey {
	field: FilterField,
	exclude: bool,
}
impl FilterKey {
	fn parse(name: &str) -> Result<Self> {
		match name.strip_suffix(EXCLUDE_SUFFIX) {
			Some(base) => Ok(Self { field: FilterField::parse(base)?, exclude: true }),
			None => Ok(Self { field: FilterField::parse(name)?, exclude: false }),
		}
	}
}

pub struct CompileInput<'a> {
	/// Compiles into a `source` OR `destination` clause with
	/// minimum-should-match 1.
	pub identity: Option<&'a str>,
	pub filters: &'a HashMap<String, Vec<String>>,
	pub ranges: &'a HashMap<String, Vec<RangeBound>>,
	/// Cached max processed tick; the implicit `tickNumber` ceiling.
	pub max_tick: u64,
}

/// Turns structured filter/range input into a boolean predicate tree for the
/// search backend. Compilation is deterministic: fields are emitted in
/// sorted order and `serde_json::Map` keeps object keys sorted, so logically
/// identical requests serialize to byte-identical query bodies regardless of
/// map insertion order. Cache keys depend on this.
pub struct QueryCompiler {
	max_filters: usize,
	max_ranges: usize,
}
impl QueryCompiler {
	pub fn new(cfg: &larq_config::QueryLimits) -> Self {
		Self { max_filters: cfg.max_filters, max_ranges: cfg.max_ranges }
	}

	pub fn compile(&self, input: CompileInput<'_>) -> Result<Value> {
		if input.filters.len() > self.max_filters {
			return Err(Error::InvalidArgument {
				message: format!(
					"Too many filters: {} exceeds the maximum of {}.",
					input.filters.len(),
					self.max_filters
				),
			});
		}
		if input.ranges.len() > self.max_ranges {
			return Err(Error::InvalidArgument {
				message: format!(
					"Too many ranges: {} exceeds the maximum of {}.",
					input.ranges.len(),
					self.max_ranges
				),
			});
		}

		let mut must: Vec<Value> = Vec::new();
		let mut must_not: Vec<Value> = Vec::new();

		if let Some(identity) = input.identity {
			if !is_valid_identity(identity) {
				return Err(Error::InvalidArgument {
					message: format!("Identity '{identity}' is not a valid identity."),
				});
			}

			must.push(serde_json::json!({
				"bool": {
					"minimum_should_match": 1,
					"should": [
						{ "term": { "source": identity } },
						{ "term": { "destination": identity } },
					],
				}
			}));
		}

		let filters: BTreeMap<&str, &Vec<String>> =
			input.filters.iter().map(|(name, values)| (name.as_str(), values)).collect();
		let ranges: BTreeMap<&str, &Vec<RangeBound>> =
			input.ranges.iter().map(|(name, bounds)| (name.as_str(), bounds)).collect();

		let mut filtered_fields: Vec<FilterField> = Vec::with_capacity(filters.len());

		for (name, values) in &filters {
			let key = FilterKey::parse(name)?;

			filtered_fields.push(key.field);

			let clause = compile_filter(key.field, values)?;

			if key.exclude {
				must_not.push(clause);
			} else {
				must.push(clause);
			}
		}

		let mut tick_upper_declared = false;

		for (name, bounds) in &ranges {
			let field = FilterField::parse(name)?;

			if filtered_fields.contains(&field) {
				return Err(Error::InvalidArgument {
					message: format!("Field '{name}' is already declared as a filter."),
				});
			}

			let (clause, has_upper) = compile_range(field, bounds, input.max_tick)?;

			if field == FilterField::TickNumber && has_upper {
				tick_upper_declared = true;
			}

			must.push(clause);
		}

		// The implicit ceiling: results never reach past the archive's
		// progress, whether or not the client declared a tick range.
		if !tick_upper_declared {
			must.push(serde_json::json!({
				"range": { "tickNumber": { "lte": input.max_tick } }
			}));
		}

		let mut body = serde_json::Map::new();

		body.insert("must".to_string(), Value::Array(must));

		if !must_not.is_empty() {
			body.insert("must_not".to_string(), Value::Array(must_not));
		}

		Ok(serde_json::json!({ "bool": body }))
	}
}

fn compile_filter(field: FilterField, values: &[String]) -> Result<Value> {
	let parsed: Vec<Value> =
		values.iter().map(|raw| field.filter_value(raw)).collect::<Result<_>>()?;

	match parsed.as_slice() {
		[] => Err(Error::InvalidArgument {
			message: format!("Filter for field '{}' declares no values.", field.as_str()),
		}),
		[single] => Ok(serde_json::json!({ "term": { field.as_str(): single } })),
		_ => Ok(serde_json::json!({ "terms": { field.as_str(): parsed } })),
	}
}

/// Compiles one field's ordered bound list into a composite range predicate,
/// clamping `tickNumber` upper bounds against the archive ceiling. Returns
/// the clause and whether an upper bound was declared.
fn compile_range(field: FilterField, bounds: &[RangeBound], max_tick: u64) -> Result<(Value, bool)> {
	if field.kind() == FieldKind::Identity {
		return Err(Error::InvalidArgument {
			message: format!("Field '{}' does not support range filters.", field.as_str()),
		});
	}

	let mut lower: Option<(RangeOp, i128)> = None;
	let mut upper: Option<(RangeOp, i128)> = None;

	for bound in bounds {
		let value = field.numeric_value(&bound.value)?;
		let slot = if bound.op.is_lower() { &mut lower } else { &mut upper };

		if slot.is_some() {
			let direction = if bound.op.is_lower() { "lower" } else { "upper" };

			return Err(Error::InvalidArgument {
				message: format!(
					"Range for field '{}' declares two {direction} bounds.",
					field.as_str()
				),
			});
		}

		*slot = Some((bound.op, value));
	}

	if lower.is_none() && upper.is_none() {
		return Err(Error::InvalidArgument {
			message: format!("Range for field '{}' declares no bounds.", field.as_str()),
		});
	}

	if let (Some((_, low)), Some((_, high))) = (lower, upper)
		&& low >= high
	{
		return Err(Error::InvalidArgument {
			message: format!(
				"Range lower bound [{low}] must be strictly below the upper bound [{high}] for field '{}'.",
				field.as_str()
			),
		});
	}

	let has_upper = upper.is_some();

	if field == FilterField::TickNumber {
		upper = upper.map(|(op, value)| {
			let ceiling = match op {
				// `lt` excludes its bound, so it may sit one past the last
				// processed tick.
				RangeOp::Lt => i128::from(max_tick) + 1,
				_ => i128::from(max_tick),
			};

			(op, value.min(ceiling))
		});
	}

	let mut spec = serde_json::Map::new();

	for (op, value) in [lower, upper].into_iter().flatten() {
		spec.insert(op.as_str().to_string(), number_value(value));
	}

	Ok((serde_json::json!({ "range": { field.as_str(): spec } }), has_upper))
}

fn number_value(value: i128) -> Value {
	if let Ok(unsigned) = u64::try_from(value) {
		Value::from(unsigned)
	} else {
		Value::from(value as i64)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn compiler() -> QueryCompiler {
		QueryCompiler { max_filters: 8, max_ranges: 4 }
	}

	fn identity(fill: char) -> String {
		fill.to_string().repeat(larq_domain::identity::IDENTITY_LEN)
	}

	fn compile(
		identity: Option<&str>,
		filters: &HashMap<String, Vec<String>>,
		ranges: &HashMap<String, Vec<RangeBound>>,
	) -> Result<Value> {
		compiler().compile(CompileInput { identity, filters, ranges, max_tick: 1_000 })
	}

	fn expect_invalid(result: Result<Value>, needle: &str) {
		match result {
			Err(Error::InvalidArgument { message }) => {
				assert!(message.contains(needle), "unexpected message: {message}")
			},
			other => panic!("expected invalid-argument error, got {other:?}"),
		}
	}

	#[test]
	fn identical_inputs_in_any_insertion_order_compile_identically() {
		let mut forward = HashMap::new();

		forward.insert("source".to_string(), vec![identity('A')]);
		forward.insert("destination".to_string(), vec![identity('B')]);
		forward.insert("inputType".to_string(), vec!["3".to_string()]);

		let mut reverse = HashMap::new();

		reverse.insert("inputType".to_string(), vec!["3".to_string()]);
		reverse.insert("destination".to_string(), vec![identity('B')]);
		reverse.insert("source".to_string(), vec![identity('A')]);

		let ranges = HashMap::new();
		let first = compile(None, &forward, &ranges).expect("compile failed");
		let second = compile(None, &reverse, &ranges).expect("compile failed");

		assert_eq!(
			serde_json::to_vec(&first).expect("encode failed"),
			serde_json::to_vec(&second).expect("encode failed"),
		);
	}

	#[test]
	fn field_in_both_filters_and_ranges_is_rejected() {
		let mut filters = HashMap::new();

		filters.insert("amount".to_string(), vec!["5".to_string()]);

		let mut ranges = HashMap::new();

		ranges.insert(
			"amount".to_string(),
			vec![RangeBound { op: RangeOp::Gte, value: "1".to_string() }],
		);

		expect_invalid(
			compile(None, &filters, &ranges),
			"Field 'amount' is already declared as a filter.",
		);
	}

	#[test]
	fn declared_tick_upper_bound_is_clamped_in_place() {
		let filters = HashMap::new();
		let mut ranges = HashMap::new();

		ranges.insert(
			"tickNumber".to_string(),
			vec![RangeBound { op: RangeOp::Lt, value: "5000".to_string() }],
		);

		let body = compile(None, &filters, &ranges).expect("compile failed");
		let must = body["bool"]["must"].as_array().expect("must clause missing");
		let clamped = must
			.iter()
			.find(|clause| clause["range"]["tickNumber"].is_object())
			.expect("tick range missing");

		assert_eq!(clamped["range"]["tickNumber"]["lt"], 1_001);
	}

	#[test]
	fn missing_tick_upper_bound_synthesizes_the_ceiling() {
		let filters = HashMap::new();
		let mut ranges = HashMap::new();

		ranges.insert(
			"tickNumber".to_string(),
			vec![RangeBound { op: RangeOp::Gte, value: "10".to_string() }],
		);

		let body = compile(None, &filters, &ranges).expect("compile failed");
		let must = body["bool"]["must"].as_array().expect("must clause missing");
		let ceiling = must
			.iter()
			.filter(|clause| clause["range"]["tickNumber"].is_object())
			.find(|clause| clause["range"]["tickNumber"]["lte"] == 1_000);

		assert!(ceiling.is_some(), "synthesized ceiling missing: {body}");
	}

	#[test]
	fn lower_bound_must_be_strictly_below_upper() {
		let filters = HashMap::new();
		let mut ranges = HashMap::new();

		ranges.insert(
			"amount".to_string(),
			vec![
				RangeBound { op: RangeOp::Gte, value: "7".to_string() },
				RangeBound { op: RangeOp::Lte, value: "7".to_string() },
			],
		);

		expect_invalid(compile(None, &filters, &ranges), "strictly below");
	}

	#[test]
	fn single_sided_ranges_are_accepted() {
		let filters = HashMap::new();

		for op in [RangeOp::Gte, RangeOp::Lte] {
			let mut ranges = HashMap::new();

			ranges.insert(
				"amount".to_string(),
				vec![RangeBound { op, value: "7".to_string() }],
			);

			assert!(compile(None, &filters, &ranges).is_ok());
		}
	}

	#[test]
	fn empty_and_same_direction_bounds_are_rejected() {
		let filters = HashMap::new();
		let mut ranges = HashMap::new();

		ranges.insert("amount".to_string(), Vec::new());

		expect_invalid(compile(None, &filters, &ranges), "declares no bounds");

		let mut ranges = HashMap::new();

		ranges.insert(
			"amount".to_string(),
			vec![
				RangeBound { op: RangeOp::Gt, value: "1".to_string() },
				RangeBound { op: RangeOp::Gte, value: "2".to_string() },
			],
		);

		expect_invalid(compile(None, &filters, &ranges), "two lower bounds");
	}

	#[test]
	fn non_numeric_range_value_names_field_and_value() {
		let filters = HashMap::new();
		let mut ranges = HashMap::new();

		ranges.insert(
			"amount".to_string(),
			vec![RangeBound { op: RangeOp::Gte, value: "ten".to_string() }],
		);

		expect_invalid(compile(None, &filters, &ranges), "Range value 'ten' for field 'amount'");
	}

	#[test]
	fn exclude_suffix_compiles_into_must_not() {
		let mut filters = HashMap::new();

		filters.insert("inputType-exclude".to_string(), vec!["0".to_string()]);

		let ranges = HashMap::new();
		let body = compile(None, &filters, &ranges).expect("compile failed");

		assert_eq!(body["bool"]["must_not"][0]["term"]["inputType"], 0);
	}

	#[test]
	fn multiple_values_compile_to_an_any_of_predicate() {
		let mut filters = HashMap::new();

		filters.insert("inputType".to_string(), vec!["1".to_string(), "2".to_string()]);

		let ranges = HashMap::new();
		let body = compile(None, &filters, &ranges).expect("compile failed");
		let must = body["bool"]["must"].as_array().expect("must clause missing");
		let terms = must
			.iter()
			.find(|clause| clause["terms"]["inputType"].is_array())
			.expect("terms clause missing");

		assert_eq!(terms["terms"]["inputType"], serde_json::json!([1, 2]));
	}

	#[test]
	fn identity_clause_matches_source_or_destination() {
		let id = identity('C');
		let filters = HashMap::new();
		let ranges = HashMap::new();
		let body = compile(Some(&id), &filters, &ranges).expect("compile failed");
		let clause = &body["bool"]["must"][0]["bool"];

		assert_eq!(clause["minimum_should_match"], 1);
		assert_eq!(clause["should"][0]["term"]["source"], id);
		assert_eq!(clause["should"][1]["term"]["destination"], id);
	}

	#[test]
	fn invalid_identity_filter_value_is_rejected() {
		let mut filters = HashMap::new();

		filters.insert("source".to_string(), vec!["short".to_string()]);

		let ranges = HashMap::new();

		expect_invalid(compile(None, &filters, &ranges), "not a valid identity");
	}

	#[test]
	fn unsupported_field_is_rejected() {
		let mut filters = HashMap::new();

		filters.insert("memo".to_string(), vec!["x".to_string()]);

		let ranges = HashMap::new();

		expect_invalid(compile(None, &filters, &ranges), "not in the filter allowlist");
	}

	#[test]
	fn filter_and_range_counts_are_bounded() {
		let mut filters = HashMap::new();

		for index in 0..9 {
			filters.insert(format!("field{index}"), vec!["1".to_string()]);
		}

		let ranges = HashMap::new();

		expect_invalid(compile(None, &filters, &ranges), "Too many filters");
	}
}
