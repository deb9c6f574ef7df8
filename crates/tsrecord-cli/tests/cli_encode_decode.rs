//! Integration tests for the `tsrecord` binary.

use arrow::array::{Array, AsArray};
use arrow::datatypes::TimestampMillisecondType;
use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

mod common;

use common::{TestResult, read_parquet, write_parquet_rows};

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("tsrecord"))
}

fn encode(parquet: &str, out: &str, uid: &str, extra: &[&str]) -> Command {
    let mut cmd = cli();
    cmd.args(["encode", "--parquet", parquet, "--out", out, "--uid", uid])
        .args(extra);
    cmd
}

#[test]
fn encode_then_decode_restores_sorted_rows() -> TestResult {
    let tmp = TempDir::new()?;
    let parquet = tmp.path().join("in.parquet");
    let records = tmp.path().join("records");
    let decoded = tmp.path().join("out.parquet");
    write_parquet_rows(&parquet, 500)?;

    encode(
        parquet.to_string_lossy().as_ref(),
        records.to_string_lossy().as_ref(),
        "AAPL",
        &["--meta", "source=test"],
    )
    .assert()
    .success()
    .stdout(contains("Encoded 500 rows of AAPL into 1 record(s)"));

    cli()
        .args([
            "decode",
            "--records",
            records.to_string_lossy().as_ref(),
            "--uid",
            "AAPL",
            "--out",
            decoded.to_string_lossy().as_ref(),
        ])
        .assert()
        .success()
        .stdout(contains("Decoded 500 rows of AAPL"));

    let batch = read_parquet(&decoded)?;
    let names: Vec<_> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(names, vec!["ts", "price", "volume", "venue", "bidpx"]);
    assert_eq!(batch.num_rows(), 500);

    let ts = batch.column(0).as_primitive::<TimestampMillisecondType>();
    assert!(ts.values().windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(batch.column(3).null_count(), 100);
    Ok(())
}

#[test]
fn small_ceiling_produces_several_records() -> TestResult {
    let tmp = TempDir::new()?;
    let parquet = tmp.path().join("in.parquet");
    let records = tmp.path().join("records");
    write_parquet_rows(&parquet, 20_000)?;

    encode(
        parquet.to_string_lossy().as_ref(),
        records.to_string_lossy().as_ref(),
        "MSFT",
        &["--ceiling", "65536"],
    )
    .assert()
    .success();

    let files = std::fs::read_dir(&records)?.count();
    assert!(files > 1, "expected several record files, found {files}");

    cli()
        .args(["inspect", "--records", records.to_string_lossy().as_ref()])
        .assert()
        .success()
        .stdout(contains(format!("MSFT: {files} record(s), 20000 rows")));

    cli()
        .args(["inspect", "--json", "--records", records.to_string_lossy().as_ref()])
        .assert()
        .success()
        .stdout(contains("\"total_rows\":20000"));
    Ok(())
}

#[test]
fn decode_to_csv_with_projection() -> TestResult {
    let tmp = TempDir::new()?;
    let parquet = tmp.path().join("in.parquet");
    let records = tmp.path().join("records");
    let csv = tmp.path().join("out.csv");
    write_parquet_rows(&parquet, 10)?;

    encode(
        parquet.to_string_lossy().as_ref(),
        records.to_string_lossy().as_ref(),
        "IBM",
        &[],
    )
    .assert()
    .success();

    cli()
        .args([
            "decode",
            "--records",
            records.to_string_lossy().as_ref(),
            "--uid",
            "IBM",
            "--out",
            csv.to_string_lossy().as_ref(),
            "--format",
            "csv",
            "--column",
            "price",
            "--column",
            "missing",
        ])
        .assert()
        .success();

    let text = std::fs::read_to_string(&csv)?;
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("ts,price"));
    assert_eq!(lines.count(), 10);
    Ok(())
}

#[test]
fn encode_refuses_to_overwrite_records() -> TestResult {
    let tmp = TempDir::new()?;
    let parquet = tmp.path().join("in.parquet");
    let records = tmp.path().join("records");
    write_parquet_rows(&parquet, 5)?;

    let p = parquet.to_string_lossy().to_string();
    let r = records.to_string_lossy().to_string();
    encode(&p, &r, "X", &[]).assert().success();
    encode(&p, &r, "X", &[])
        .assert()
        .failure()
        .stderr(contains("Refusing to overwrite"));
    Ok(())
}

#[test]
fn errors_are_reported_with_context() -> TestResult {
    let tmp = TempDir::new()?;
    let parquet = tmp.path().join("in.parquet");
    let records = tmp.path().join("records");
    write_parquet_rows(&parquet, 5)?;
    let p = parquet.to_string_lossy().to_string();
    let r = records.to_string_lossy().to_string();

    // `volume` is not a timestamp column.
    encode(&p, &r, "X", &["--time-column", "volume"])
        .assert()
        .failure()
        .stderr(contains("Invalid time index for series X"));

    encode(&p, &r, "X", &["--time-column", "nope"])
        .assert()
        .failure()
        .stderr(contains("Time column nope not found"));

    encode(&p, &r, "X", &["--compression-level", "20"])
        .assert()
        .failure()
        .stderr(contains("Invalid codec configuration"));

    encode(&p, &r, "X", &[]).assert().success();
    cli()
        .args(["decode", "--records", &r, "--uid", "Y", "--out"])
        .arg(tmp.path().join("y.parquet"))
        .assert()
        .failure()
        .stderr(contains("No records for series Y"));
    Ok(())
}
