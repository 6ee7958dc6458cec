// src/output/mod.rs
mod manifest;

pub use manifest::{write_manifest, RunManifest};

use arrow::{array::Array, compute::concat_batches, record_batch::RecordBatchReader};
use csv::WriterBuilder;
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

use crate::{
    error::{Result, WaveError},
    process::{read_table as read_delimited, utils::Delimiter, LoadOptions},
    table::WaveTable,
};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Tab-delimited text with a header row.
    #[default]
    Tsv,
    /// Snappy-compressed Parquet.
    Parquet,
}

/// Sibling temp path used for atomic writes: `.name.tmp` in the same dir.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write `tmp` through `fill`, then rename it over `path`.
pub(crate) fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(File) -> Result<()>,
{
    let tmp = temp_path(path);
    let file = File::create(&tmp).map_err(|e| WaveError::io(&tmp, e))?;
    if let Err(e) = fill(file) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(|e| WaveError::io(path, e))
}

/// Render a value cell; integers print without a fractional part.
fn format_value(v: f64) -> String {
    format!("{}", v)
}

/// Serialize `table` to `path`.
///
/// TSV output has a header row naming every column in table order and one
/// line per row; missing cells are written as `null_token`. The parent
/// directory must already exist.
#[instrument(level = "info", skip(table, path, null_token), fields(path = %path.as_ref().display(), rows = table.num_rows()))]
pub fn write_table<P: AsRef<Path>>(
    table: &WaveTable,
    path: P,
    format: OutputFormat,
    null_token: &str,
) -> Result<()> {
    let path = path.as_ref();
    match format {
        OutputFormat::Tsv => {
            write_atomically(path, |file| write_tsv(table, file, path, null_token))
        }
        OutputFormat::Parquet => write_atomically(path, |file| write_parquet(table, file)),
    }?;
    info!("wrote {} rows x {} columns", table.num_rows(), table.num_columns());
    Ok(())
}

fn write_tsv(table: &WaveTable, file: File, path: &Path, null_token: &str) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(BufWriter::new(file));
    let csv_err = |e| WaveError::csv(path, e);

    wtr.write_record(table.column_names()).map_err(csv_err)?;

    let ids = table.ids();
    let values: Vec<_> = table.values().map(|(_, a)| a).collect();
    let mut row: Vec<String> = Vec::with_capacity(values.len() + 1);
    for i in 0..table.num_rows() {
        row.clear();
        row.push(ids.value(i).to_string());
        for col in &values {
            if col.is_null(i) {
                row.push(null_token.to_string());
            } else {
                row.push(format_value(col.value(i)));
            }
        }
        wtr.write_record(&row).map_err(csv_err)?;
    }

    wtr.flush().map_err(|e| WaveError::io(path, e))
}

fn write_parquet(table: &WaveTable, file: File) -> Result<()> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), table.schema(), Some(props))?;
    writer.write(table.batch())?;
    writer.close()?;
    Ok(())
}

/// Whether `path` names a Parquet file, by extension in any case.
pub fn is_parquet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("parquet"))
}

/// Read a previously written table back; `.parquet` files go through the
/// Parquet reader, anything else is read as tab-separated text (whatever its
/// extension) keyed on its first column with `null_token` cells treated as
/// missing.
pub fn read_table<P: AsRef<Path>>(path: P, null_token: &str) -> Result<WaveTable> {
    let path = path.as_ref();
    if is_parquet(path) {
        let file = File::open(path).map_err(|e| WaveError::io(path, e))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let schema = reader.schema();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let batch = concat_batches(&schema, &batches)?;
        return WaveTable::try_new(batch);
    }

    let opts = LoadOptions {
        delimiter: Delimiter::Tab,
        missing_tokens: if null_token.is_empty() {
            Vec::new()
        } else {
            vec![null_token.to_string()]
        },
        ..Default::default()
    };
    read_delimited(path, "output", None, None, &opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> WaveTable {
        WaveTable::from_columns(
            "pidp",
            vec![1, 2, 4],
            vec![
                ("a_sex".into(), vec![Some(1.0), Some(2.0), None]),
                ("b_dvage".into(), vec![None, Some(34.5), Some(60.0)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn tsv_has_header_and_blank_missing_cells() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("joined.tab");
        write_table(&sample(), &out, OutputFormat::Tsv, "").unwrap();

        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["pidp\ta_sex\tb_dvage", "1\t1\t", "2\t2\t34.5", "4\t\t60"]
        );
        assert!(!temp_path(&out).exists());
    }

    #[test]
    fn null_token_is_written_and_read_back() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("joined.tsv");
        write_table(&sample(), &out, OutputFormat::Tsv, "NA").unwrap();
        let text = fs::read_to_string(&out).unwrap();
        assert!(text.contains("4\tNA\t60"));

        let back = read_table(&out, "NA").unwrap();
        assert_eq!(back.column_names(), vec!["pidp", "a_sex", "b_dvage"]);
        assert!(back.column("a_sex").unwrap().is_null(2));
        assert_eq!(back.column("b_dvage").unwrap().value(1), 34.5);
    }

    #[test]
    fn tsv_named_csv_reads_back_as_tabs() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("joined.csv");
        write_table(&sample(), &out, OutputFormat::Tsv, "").unwrap();

        let back = read_table(&out, "").unwrap();
        assert_eq!(back.key(), "pidp");
        assert_eq!(back.column_names(), vec!["pidp", "a_sex", "b_dvage"]);
        assert_eq!(back.num_rows(), 3);
        assert!(back.column("a_sex").unwrap().is_null(2));
    }

    #[test]
    fn parquet_round_trip_keeps_nulls() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("joined.parquet");
        write_table(&sample(), &out, OutputFormat::Parquet, "").unwrap();
        let back = read_table(&out, "").unwrap();
        assert_eq!(back.num_rows(), 3);
        assert!(back.column("b_dvage").unwrap().is_null(0));
    }

    #[test]
    fn parquet_extension_ignores_case() {
        assert!(is_parquet(Path::new("out/joined.parquet")));
        assert!(is_parquet(Path::new("out/joined.PARQUET")));
        assert!(!is_parquet(Path::new("out/joined.tab")));
        assert!(!is_parquet(Path::new("out/parquet")));

        let dir = tempdir().unwrap();
        let out = dir.path().join("joined.PARQUET");
        write_table(&sample(), &out, OutputFormat::Parquet, "").unwrap();
        assert_eq!(read_table(&out, "").unwrap().num_rows(), 3);
    }

    #[test]
    fn missing_output_directory_fails() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("no_such_dir").join("joined.tab");
        let err = write_table(&sample(), &out, OutputFormat::Tsv, "").unwrap_err();
        assert!(matches!(err, WaveError::Io { .. }));
    }

    #[test]
    fn rewriting_is_byte_identical() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("joined.tab");
        write_table(&sample(), &out, OutputFormat::Tsv, "").unwrap();
        let first = fs::read(&out).unwrap();
        write_table(&sample(), &out, OutputFormat::Tsv, "").unwrap();
        assert_eq!(first, fs::read(&out).unwrap());
    }
}
