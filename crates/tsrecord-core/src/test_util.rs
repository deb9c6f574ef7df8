use std::sync::{Arc, Mutex};

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::DataType;

use crate::builder::DocumentStats;
use crate::config::CodecConfig;
use crate::observe::CodecObserver;
use crate::table::Table;

pub(crate) type TestResult = Result<(), Box<dyn std::error::Error>>;

const BASE_MILLIS: i64 = 1_735_689_600_000; // 2025-01-01T00:00:00Z

/// 256 KiB ceiling so splitting kicks in with small tables.
pub(crate) fn small_config() -> CodecConfig {
    CodecConfig::default().with_ceiling(256 * 1024)
}

/// Deterministic 64-bit LCG (Knuth MMIX constants).
pub(crate) struct Lcg(u64);

impl Lcg {
    pub(crate) fn new(seed: u64) -> Self {
        Lcg(seed ^ 0x9E37_79B9_7F4A_7C15)
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    /// Uniform in `[0, 1)`.
    pub(crate) fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64
    }
}

fn second_index(rows: usize) -> ArrayRef {
    Arc::new(TimestampMillisecondArray::from_iter_values(
        (0..rows as i64).map(|i| BASE_MILLIS + i * 1_000),
    ))
}

/// Sorted per-second index plus two columns of random floats.
pub(crate) fn noise_table(rows: usize, seed: u64) -> Table {
    let mut rng = Lcg::new(seed);
    let a = Float64Array::from_iter_values((0..rows).map(|_| rng.next_f64()));
    let b = Float64Array::from_iter_values((0..rows).map(|_| rng.next_f64()));
    Table::try_new(
        second_index(rows),
        vec![
            ("a".to_string(), Arc::new(a) as ArrayRef),
            ("b".to_string(), Arc::new(b) as ArrayRef),
        ],
    )
    .expect("valid noise table")
}

/// Sorted per-second trade ticks: `price`, `size`, `venue`.
pub(crate) fn tick_table(rows: usize, seed: u64) -> Table {
    const VENUES: [&str; 3] = ["XNAS", "XNYS", "ARCX"];

    let mut rng = Lcg::new(seed);
    let mut price = 100.0;
    let mut prices = Vec::with_capacity(rows);
    let mut sizes = Vec::with_capacity(rows);
    let mut venues = Vec::with_capacity(rows);
    for _ in 0..rows {
        price += rng.next_f64() - 0.5;
        prices.push(price);
        sizes.push((rng.next_u64() % 1_000) as i64 + 1);
        venues.push(VENUES[(rng.next_u64() % 3) as usize]);
    }

    Table::try_new(
        second_index(rows),
        vec![
            ("price".to_string(), Arc::new(Float64Array::from(prices)) as ArrayRef),
            ("size".to_string(), Arc::new(Int64Array::from(sizes)) as ArrayRef),
            ("venue".to_string(), Arc::new(StringArray::from(venues)) as ArrayRef),
        ],
    )
    .expect("valid tick table")
}

/// One row, `columns` float columns named `c0..`.
pub(crate) fn wide_tiny_table(columns: usize) -> Table {
    let cols = (0..columns)
        .map(|i| {
            (
                format!("c{i}"),
                Arc::new(Float64Array::from(vec![i as f64])) as ArrayRef,
            )
        })
        .collect();
    Table::try_new(second_index(1), cols).expect("valid wide table")
}

/// Observer that keeps every event for later assertions.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    opaque: Mutex<Vec<String>>,
    built: Mutex<Vec<DocumentStats>>,
    oversized: Mutex<Vec<(String, u64, f64)>>,
    shrinks: Mutex<Vec<(f64, f64)>>,
    missing: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub(crate) fn opaque_columns(&self) -> Vec<String> {
        self.opaque.lock().unwrap().clone()
    }

    pub(crate) fn built_count(&self) -> usize {
        self.built.lock().unwrap().len()
    }

    pub(crate) fn oversized_count(&self) -> usize {
        self.oversized.lock().unwrap().len()
    }

    pub(crate) fn shrinks(&self) -> Vec<(f64, f64)> {
        self.shrinks.lock().unwrap().clone()
    }

    pub(crate) fn missing_columns(&self) -> Vec<String> {
        self.missing.lock().unwrap().clone()
    }
}

impl CodecObserver for RecordingObserver {
    fn opaque_column(&self, column: &str, _datatype: &DataType) {
        self.opaque.lock().unwrap().push(column.to_string());
    }

    fn document_built(&self, stats: &DocumentStats) {
        self.built.lock().unwrap().push(stats.clone());
    }

    fn document_oversized(&self, uid: &str, binary_size: u64, compression_ratio: f64) {
        self.oversized
            .lock()
            .unwrap()
            .push((uid.to_string(), binary_size, compression_ratio));
    }

    fn split_shrunk(&self, _uid: &str, previous_target: f64, next_target: f64) {
        self.shrinks.lock().unwrap().push((previous_target, next_target));
    }

    fn columns_not_found(&self, _uid: &str, missing: &[String]) {
        self.missing.lock().unwrap().extend_from_slice(missing);
    }
}
