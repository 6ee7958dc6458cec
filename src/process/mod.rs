// src/process/mod.rs
pub mod utils;

use arrow::array::{Float64Builder, Int64Array};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::{
    collections::{hash_map::Entry, HashMap},
    fs::File,
    io::BufReader,
    path::Path,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    discover::WaveFile,
    error::{Result, WaveError},
    table::WaveTable,
};
use utils::{parse_cell, parse_id, Cell, Delimiter};

/// What to do when an id occurs more than once inside a single file.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Fail the load with `WaveError::DuplicateId`.
    #[default]
    Error,
    /// Keep the first row per id and log how many were dropped.
    KeepFirst,
}

/// How cells are read from an input file.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub delimiter: Delimiter,
    /// Numeric codes that mean "missing" (e.g. `-9` for "missing by error").
    pub missing_codes: Vec<f64>,
    /// Literal tokens that mean "missing", in addition to the empty cell.
    pub missing_tokens: Vec<String>,
    pub on_duplicate: DuplicatePolicy,
}

/// Load one wave: the key column plus `<letter>_<base>` for each base name.
///
/// Columns come out in request order under their wave-prefixed names; every
/// requested column must exist in the file.
#[instrument(level = "info", skip(wave, bases, opts), fields(wave = %wave.label(), path = %wave.path.display()))]
pub fn load_wave(
    wave: &WaveFile,
    key: &str,
    bases: &[String],
    opts: &LoadOptions,
) -> Result<WaveTable> {
    let columns: Vec<String> = bases.iter().map(|b| wave.column(b)).collect();
    let table = read_table(&wave.path, &wave.label(), Some(key), Some(&columns), opts)?;
    info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "loaded wave"
    );
    Ok(table)
}

/// Read a delimited file into a `WaveTable`.
///
/// - `key`: id column name; `None` takes the first column.
/// - `wanted`: value columns to keep, in order; `None` keeps every other column.
///
/// `origin` labels the table in errors and logs.
pub fn read_table(
    path: &Path,
    origin: &str,
    key: Option<&str>,
    wanted: Option<&[String]>,
    opts: &LoadOptions,
) -> Result<WaveTable> {
    let file = File::open(path).map_err(|e| WaveError::io(path, e))?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(opts.delimiter.byte_for(path))
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| WaveError::csv(path, e))?
        .iter()
        .map(|h| utils::clean_str(h).to_string())
        .collect();

    // first occurrence wins if a header is repeated
    let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(headers.len());
    for (i, h) in headers.iter().enumerate() {
        by_name.entry(h.as_str()).or_insert(i);
    }
    let locate = |name: &str| {
        by_name
            .get(name)
            .copied()
            .ok_or_else(|| WaveError::MissingColumn {
                origin: origin.to_string(),
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };

    let key_name = match key {
        Some(k) => k.to_string(),
        None => headers
            .first()
            .cloned()
            .ok_or_else(|| WaveError::MissingKey("<no header>".into()))?,
    };
    let key_idx = locate(&key_name)?;

    let selected: Vec<(String, usize)> = match wanted {
        Some(cols) => cols
            .iter()
            .map(|c| locate(c).map(|i| (c.clone(), i)))
            .collect::<Result<_>>()?,
        None => headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != key_idx)
            .map(|(i, h)| (h.clone(), i))
            .collect(),
    };
    debug!(origin, key = %key_name, columns = selected.len(), "resolved columns");

    let mut ids: Vec<i64> = Vec::new();
    let mut builders: Vec<Float64Builder> =
        selected.iter().map(|_| Float64Builder::new()).collect();
    let mut unparsable = vec![0usize; selected.len()];
    let mut seen: HashMap<i64, usize> = HashMap::new();
    let mut first_dup: Option<i64> = None;
    let mut dropped = 0usize;

    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| WaveError::csv(path, e))?;
        // header is line 1; quoted fields may span lines
        let line = record
            .position()
            .map_or(idx as u64 + 2, |p| p.line()) as usize;

        let raw_id = record.get(key_idx).unwrap_or("");
        let id = parse_id(raw_id).ok_or_else(|| WaveError::InvalidId {
            origin: origin.to_string(),
            path: path.to_path_buf(),
            line,
            value: raw_id.to_string(),
        })?;

        match seen.entry(id) {
            Entry::Occupied(mut e) => {
                *e.get_mut() += 1;
                first_dup.get_or_insert(id);
                dropped += 1;
                continue;
            }
            Entry::Vacant(e) => {
                e.insert(1);
            }
        }

        ids.push(id);
        for (j, (_, col)) in selected.iter().enumerate() {
            let raw = record.get(*col).unwrap_or("");
            match parse_cell(raw, &opts.missing_codes, &opts.missing_tokens) {
                Cell::Value(v) => builders[j].append_value(v),
                Cell::Missing => builders[j].append_null(),
                Cell::Unparsable => {
                    unparsable[j] += 1;
                    builders[j].append_null();
                }
            }
        }
    }

    if let Some(id) = first_dup {
        let count = seen.get(&id).copied().unwrap_or_default();
        match opts.on_duplicate {
            DuplicatePolicy::Error => {
                return Err(WaveError::DuplicateId {
                    origin: origin.to_string(),
                    path: path.to_path_buf(),
                    id,
                    count,
                });
            }
            DuplicatePolicy::KeepFirst => {
                warn!(
                    origin,
                    first_id = id,
                    dropped,
                    "duplicate ids; kept first occurrence of each"
                );
            }
        }
    }

    for ((name, _), n) in selected.iter().zip(&unparsable) {
        if *n > 0 {
            warn!(origin, column = %name, count = n, "non-numeric cells read as missing");
        }
    }

    let values = selected
        .into_iter()
        .zip(builders)
        .map(|((name, _), mut b)| (name, b.finish()))
        .collect();
    WaveTable::from_arrays(&key_name, Int64Array::from(ids), values)
}
