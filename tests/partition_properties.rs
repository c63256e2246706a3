//! Property-based tests for the partitioner.
//!
//! For arbitrary record sets and limits:
//! - Batches concatenate back to the input, in order
//! - No batch is empty or holds more than `max_records`
//! - Only a single-record batch may exceed `max_bytes`

use batchwire_client::batch::{partition, Batch, BatchLimits, Record};
use proptest::prelude::*;

// Strategy for generating delimiter-free records of 1-4 fields
fn record_strategy() -> impl Strategy<Value = Record> {
    prop::collection::vec("[A-Za-z0-9 .-]{1,16}", 1..=4)
        .prop_map(|fields| Record::new(fields).unwrap())
}

fn limits_strategy() -> impl Strategy<Value = BatchLimits> {
    (1usize..=12, 1usize..=160).prop_map(|(records, bytes)| BatchLimits::new(records, bytes).unwrap())
}

fn run(records: &[Record], limits: BatchLimits) -> Vec<Batch> {
    partition(records.iter().cloned(), limits).collect()
}

#[test]
fn prop_batches_concatenate_to_input() {
    proptest!(|(records in prop::collection::vec(record_strategy(), 0..80), limits in limits_strategy())| {
        let batches = run(&records, limits);

        let rebuilt: Vec<Record> = batches
            .iter()
            .flat_map(|batch| batch.records().unwrap())
            .collect();
        prop_assert_eq!(rebuilt, records);
    });
}

#[test]
fn prop_record_limit_holds() {
    proptest!(|(records in prop::collection::vec(record_strategy(), 0..80), limits in limits_strategy())| {
        for batch in run(&records, limits) {
            prop_assert!(batch.record_count() >= 1);
            prop_assert!(batch.record_count() as usize <= limits.max_records());
            prop_assert_eq!(batch.records().unwrap().len(), batch.record_count() as usize);
        }
    });
}

#[test]
fn prop_byte_limit_holds_except_for_oversized_singletons() {
    proptest!(|(records in prop::collection::vec(record_strategy(), 0..80), limits in limits_strategy())| {
        for batch in run(&records, limits) {
            // Every record is accounted with its trailing delimiter.
            let accounted = batch.byte_len() + 1;
            prop_assert!(accounted <= limits.max_bytes() || batch.record_count() == 1);
        }
    });
}

#[test]
fn prop_batch_count_is_minimal_for_record_limit() {
    proptest!(|(records in prop::collection::vec(record_strategy(), 1..80), max in 1usize..=12)| {
        let limits = BatchLimits::new(max, u32::MAX as usize).unwrap();
        let batches = run(&records, limits);
        prop_assert_eq!(batches.len(), records.len().div_ceil(max));
    });
}
