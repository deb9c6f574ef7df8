//! CLI for encoding Parquet tables into size-bounded record files and back.

mod error;
mod records_dir;
mod tables;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use snafu::{OptionExt, ResultExt};
use tsrecord_core::config::{
    DEFAULT_CEILING, DEFAULT_COMPRESSION_LEVEL, DEFAULT_INITIAL_COMPRESSIBILITY,
};
use tsrecord_core::{
    ChunkSplitter, CodecConfig, DocumentReader, LogObserver, MetaValue, Metadata, Record,
    TableAssembler, summarize_records,
};

use crate::error::{
    CliResult, DecodeSnafu, EncodeSnafu, InvalidMetaSnafu, RenderJsonSnafu, SeriesNotFoundSnafu,
};
use crate::records_dir::{load_records, write_records};
use crate::tables::{read_parquet_table, write_csv_table, write_parquet_table};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Parquet,
    Csv,
}

/// Sizing flags shared by commands that build records.
#[derive(Debug, clap::Args)]
struct CodecArgs {
    /// Hard per-record ceiling in bytes
    #[arg(long, default_value_t = DEFAULT_CEILING)]
    ceiling: usize,

    /// LZ4 high-compression level (1-12)
    #[arg(long = "compression-level", default_value_t = DEFAULT_COMPRESSION_LEVEL)]
    compression_level: i32,

    /// Compressibility assumed by the first split attempt
    #[arg(long = "initial-compressibility", default_value_t = DEFAULT_INITIAL_COMPRESSIBILITY)]
    initial_compressibility: f64,
}

impl CodecArgs {
    fn config(&self) -> CodecConfig {
        CodecConfig::default()
            .with_ceiling(self.ceiling)
            .with_compression_level(self.compression_level)
            .with_initial_compressibility(self.initial_compressibility)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encode a Parquet file into record files
    Encode {
        #[arg(long)]
        parquet: PathBuf,

        /// Directory receiving one file per record
        #[arg(long)]
        out: PathBuf,

        /// Series identifier stored in every record
        #[arg(long)]
        uid: String,

        #[arg(long = "time-column", default_value = "ts")]
        time_column: String,

        /// Repeatable key=value metadata (ints, floats and true/false are typed)
        #[arg(long = "meta")]
        meta: Vec<String>,

        #[command(flatten)]
        codec: CodecArgs,

        /// Print elapsed time
        #[arg(long, default_value_t = false)]
        timing: bool,
    },

    /// Rebuild one series from record files
    Decode {
        /// Directory holding record files
        #[arg(long)]
        records: PathBuf,

        #[arg(long)]
        uid: String,

        #[arg(long)]
        out: PathBuf,

        /// Name given to the index column in the output
        #[arg(long = "time-column", default_value = "ts")]
        time_column: String,

        #[arg(long, value_enum, default_value_t = OutputFormatArg::Parquet)]
        format: OutputFormatArg,

        /// Only decode these columns (repeatable)
        #[arg(long = "column")]
        columns: Vec<String>,
    },

    /// Summarize the series found in a record directory
    Inspect {
        #[arg(long)]
        records: PathBuf,

        /// One JSON object per series instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Debug, Parser)]
#[command(name = "tsrecord", version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

fn parse_meta_value(raw: &str) -> MetaValue {
    if let Ok(v) = raw.parse::<i64>() {
        return MetaValue::Int(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return MetaValue::Float(v);
    }
    match raw {
        "true" => MetaValue::Bool(true),
        "false" => MetaValue::Bool(false),
        _ => MetaValue::Str(raw.to_string()),
    }
}

fn parse_meta(specs: &[String]) -> CliResult<Metadata> {
    let mut meta = Metadata::new();
    for spec in specs {
        let (key, value) = spec
            .split_once('=')
            .filter(|(k, _)| !k.is_empty())
            .context(InvalidMetaSnafu { spec })?;
        meta.insert(key.to_string(), parse_meta_value(value));
    }
    Ok(meta)
}

fn cmd_encode(
    parquet: &Path,
    out: &Path,
    uid: &str,
    time_column: &str,
    meta: &[String],
    config: CodecConfig,
    timing: bool,
) -> CliResult<()> {
    let start = Instant::now();
    let metadata = parse_meta(meta)?;
    let table = read_parquet_table(parquet, time_column)?;

    let splitter = ChunkSplitter::with_observer(config, Arc::new(LogObserver));
    let report = splitter
        .split_with_report(uid, &table, &metadata, None)
        .context(EncodeSnafu { uid })?;
    info!(
        "Split {uid} into {} partition(s) after {} attempt(s), target {:.0} bytes",
        report.partitions, report.attempts, report.target_size
    );

    let paths = write_records(out, uid, &report.records)?;

    let summary = format!(
        "Encoded {} rows of {uid} into {} record(s) in {}",
        table.num_rows(),
        paths.len(),
        out.display()
    );
    if timing {
        println!("{summary} (elapsed_ms: {})", start.elapsed().as_millis());
    } else {
        println!("{summary}");
    }
    Ok(())
}

fn cmd_decode(
    records_dir: &Path,
    uid: &str,
    out: &Path,
    time_column: &str,
    format: OutputFormatArg,
    columns: &[String],
) -> CliResult<()> {
    let records: Vec<Record> = load_records(records_dir)?
        .into_iter()
        .map(|(_, record)| record)
        .filter(|record| record.uid() == uid)
        .collect();
    snafu::ensure!(
        !records.is_empty(),
        SeriesNotFoundSnafu {
            uid,
            path: records_dir.display().to_string(),
        }
    );

    let names: Vec<&str> = columns.iter().map(String::as_str).collect();
    let assembler = TableAssembler::new(DocumentReader::with_observer(Arc::new(LogObserver)));
    let table = if names.is_empty() {
        assembler.assemble(&records)
    } else {
        assembler.assemble_columns(&records, &names)
    }
    .context(DecodeSnafu { uid })?;

    match format {
        OutputFormatArg::Parquet => write_parquet_table(out, &table, time_column)?,
        OutputFormatArg::Csv => write_csv_table(out, &table, time_column)?,
    }

    println!(
        "Decoded {} rows of {uid} from {} record(s) into {}",
        table.num_rows(),
        records.len(),
        out.display()
    );
    Ok(())
}

fn cmd_inspect(records_dir: &Path, json: bool) -> CliResult<()> {
    let loaded = load_records(records_dir)?;
    let summaries = summarize_records(loaded.iter().map(|(_, record)| record));

    if summaries.is_empty() {
        println!("No records in {}", records_dir.display());
        return Ok(());
    }

    for s in &summaries {
        if json {
            println!("{}", serde_json::to_string(s).context(RenderJsonSnafu)?);
        } else {
            let span = match (s.start, s.end) {
                (Some(start), Some(end)) => {
                    format!("{} .. {}", start.to_rfc3339(), end.to_rfc3339())
                }
                _ => "empty".to_string(),
            };
            println!(
                "{}: {} record(s), {} rows, {} bytes, {}",
                s.uid, s.record_count, s.total_rows, s.binary_size, span
            );
        }
    }
    Ok(())
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Encode {
            parquet,
            out,
            uid,
            time_column,
            meta,
            codec,
            timing,
        } => cmd_encode(
            &parquet,
            &out,
            &uid,
            &time_column,
            &meta,
            codec.config(),
            timing,
        ),

        Command::Decode {
            records,
            uid,
            out,
            time_column,
            format,
            columns,
        } => cmd_decode(&records, &uid, &out, &time_column, format, &columns),

        Command::Inspect { records, json } => cmd_inspect(&records, json),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
