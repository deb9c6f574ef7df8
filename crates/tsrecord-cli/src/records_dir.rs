//! A directory of record files standing in for the document store.
//!
//! One record per file, named `<safe-uid>-<uid-hash>-<seq>.tsrec`, where
//! `safe-uid` is the uid with characters outside `[A-Za-z0-9_-]` replaced and
//! `uid-hash` is a BLAKE3 prefix of the raw uid, so distinct uids never share
//! a name. Files are listed in name order; nothing else about the layout is
//! relied on when reading.

use std::fs;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, ensure};
use tsrecord_core::Record;

use crate::error::{
    CliResult, CreateDirAllSnafu, DestAlreadyExistsSnafu, EncodeSnafu, ListRecordsSnafu,
    ParseRecordSnafu, ReadRecordSnafu, WriteRecordSnafu,
};

pub const RECORD_EXTENSION: &str = "tsrec";

/// Hex characters of the uid hash kept in file names.
const UID_HASH_LEN: usize = 16;

fn file_stem_for(uid: &str) -> String {
    let safe: String = uid
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let hash = blake3::hash(uid.as_bytes()).to_hex();
    format!("{safe}-{}", &hash.as_str()[..UID_HASH_LEN])
}

/// Write `records` under `dir`, refusing to replace existing files.
pub fn write_records(dir: &Path, uid: &str, records: &[Record]) -> CliResult<Vec<PathBuf>> {
    fs::create_dir_all(dir).context(CreateDirAllSnafu {
        path: dir.display().to_string(),
    })?;

    let stem = file_stem_for(uid);
    let paths: Vec<PathBuf> = (0..records.len())
        .map(|seq| dir.join(format!("{stem}-{seq:05}.{RECORD_EXTENSION}")))
        .collect();

    // Check every name before writing anything.
    for path in &paths {
        ensure!(
            !path.exists(),
            DestAlreadyExistsSnafu {
                path: path.display().to_string(),
            }
        );
    }

    for (path, record) in paths.iter().zip(records) {
        let bytes = record.to_bytes().context(EncodeSnafu { uid })?;
        fs::write(path, bytes).context(WriteRecordSnafu {
            path: path.display().to_string(),
        })?;
    }
    Ok(paths)
}

/// Read and parse every record file in `dir`, in file-name order.
pub fn load_records(dir: &Path) -> CliResult<Vec<(PathBuf, Record)>> {
    let entries = fs::read_dir(dir).context(ListRecordsSnafu {
        path: dir.display().to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .context(ListRecordsSnafu {
                path: dir.display().to_string(),
            })?
            .path();
        if path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let display = path.display().to_string();
        let bytes = fs::read(&path).context(ReadRecordSnafu { path: &display })?;
        let record = Record::from_bytes(&bytes).context(ParseRecordSnafu { path: display })?;
        out.push((path, record));
    }
    Ok(out)
}
