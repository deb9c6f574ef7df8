#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float64Array, Int64Array, StringArray, TimestampMillisecondArray,
    TimestampNanosecondArray,
};
use tsrecord_core::{CodecConfig, Table};

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub const BASE_MILLIS: i64 = 1_700_000_000_000;

pub fn small_config() -> CodecConfig {
    CodecConfig::default().with_ceiling(256 * 1024)
}

/// Same LCG as the CLI fixtures, one value per call.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }
}

/// Two random float columns over a sorted per-second millisecond index.
pub fn noise_table(rows: usize, seed: u64) -> Table {
    let mut rng = Lcg::new(seed);
    let index = TimestampMillisecondArray::from_iter_values(
        (0..rows as i64).map(|i| BASE_MILLIS + i * 1_000),
    );
    let a = Float64Array::from_iter_values((0..rows).map(|_| rng.next_f64()));
    let b = Float64Array::from_iter_values((0..rows).map(|_| rng.next_f64()));
    Table::try_new(
        Arc::new(index),
        vec![
            ("a".to_string(), Arc::new(a) as ArrayRef),
            ("b".to_string(), Arc::new(b) as ArrayRef),
        ],
    )
    .expect("valid noise table")
}

/// Unsorted, duplicate-heavy nanosecond index with a UTC timezone, plus an
/// integer column recording the original row position and a nullable label.
pub fn shuffled_table(rows: usize, seed: u64) -> Table {
    let mut rng = Lcg::new(seed);
    let ts: Vec<i64> = (0..rows)
        .map(|_| 1_000_000_000 * (rng.next_u64() % (rows as u64 / 4 + 1)) as i64)
        .collect();
    let labels: Vec<Option<String>> = (0..rows)
        .map(|i| (i % 7 != 0).then(|| format!("L{}", i % 13)))
        .collect();

    Table::try_new(
        Arc::new(TimestampNanosecondArray::from(ts).with_timezone("UTC")),
        vec![
            (
                "pos".to_string(),
                Arc::new(Int64Array::from_iter_values(0..rows as i64)) as ArrayRef,
            ),
            (
                "label".to_string(),
                Arc::new(StringArray::from(labels)) as ArrayRef,
            ),
        ],
    )
    .expect("valid shuffled table")
}
