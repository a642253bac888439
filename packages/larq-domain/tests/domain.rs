use larq_domain::{
	ArchiveStatus, TickInterval, TickRange,
	identity::{IDENTITY_LEN, is_valid_identity},
	intervals::skipped_by_archive,
	tick_ranges::{merge_ranges, ranges_contain},
};

#[test]
fn interval_list_scan_reports_first_gap() {
	let intervals = vec![
		TickInterval { epoch: 100, first_tick: 1, last_tick: 1_000 },
		TickInterval { epoch: 101, first_tick: 1_500, last_tick: 2_000 },
		TickInterval { epoch: 102, first_tick: 2_500, last_tick: 3_000 },
	];

	assert_eq!(skipped_by_archive(1_200, &intervals), Some(1_500));
	assert_eq!(skipped_by_archive(2_100, &intervals), Some(2_500));
	assert_eq!(skipped_by_archive(1_700, &intervals), None);
	assert_eq!(skipped_by_archive(3_500, &intervals), None);
}

#[test]
fn status_round_trips_through_json() {
	let status =
		ArchiveStatus { last_processed_tick: 42, processing_epoch: 7, interval_initial_tick: 1 };
	let json = serde_json::to_string(&status).expect("encode failed");
	let decoded: ArchiveStatus = serde_json::from_str(&json).expect("decode failed");

	assert_eq!(decoded, status);
}

#[test]
fn identity_format_is_fixed_length() {
	let ok: String = "ABCDEFGHIJ".repeat(6);

	assert_eq!(ok.len(), IDENTITY_LEN);
	assert!(is_valid_identity(&ok));
	assert!(!is_valid_identity(&ok[..IDENTITY_LEN - 1]));
}

#[test]
fn range_merge_extends_without_dropping() {
	let cached = vec![TickRange { first_tick: 100, last_tick: 200 }];
	let refetched = vec![TickRange { first_tick: 150, last_tick: 400 }];
	let merged = merge_ranges(&cached, &refetched);

	for tick in [100, 200, 300, 400] {
		assert!(ranges_contain(&merged, tick), "tick {tick} dropped by merge");
	}
}
