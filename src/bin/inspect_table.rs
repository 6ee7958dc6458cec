use anyhow::{Context, Result};
use arrow::array::Array;
use clap::Parser;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::{fs::File, path::PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

use wavejoin::output::{is_parquet, read_table};

/// Print schema, row count and per-column missing counts of a joined table.
#[derive(Parser, Debug)]
struct Args {
    /// TSV or Parquet file written by `wavejoin run`
    path: PathBuf,
    /// Token used for missing cells in TSV output
    #[arg(long, default_value = "")]
    null_token: String,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let path = &args.path;

    let table = read_table(path, &args.null_token)
        .with_context(|| format!("reading {}", path.display()))?;
    let file_size_disk = std::fs::metadata(path)?.len();

    println!("=== Table: {} ===", path.display());
    println!("Key column:           {}", table.key());
    println!("Total rows:           {}", table.num_rows());
    println!("Columns:              {}", table.num_columns());
    println!("File size on disk:    {} bytes", file_size_disk);

    // Parquet files also carry row-group metadata worth showing
    if is_parquet(path) {
        let reader = SerializedFileReader::new(File::open(path)?)?;
        let meta = reader.metadata();
        println!(
            "Created by:           {}",
            meta.file_metadata().created_by().unwrap_or("<unknown>")
        );
        println!("Number of row groups: {}", meta.num_row_groups());
    }
    println!();

    println!("=== Columns ===");
    let schema = table.schema();
    for field in schema.fields() {
        println!(
            "- {:<30} | {:<8} | nullable: {}",
            field.name(),
            field.data_type(),
            field.is_nullable()
        );
    }
    println!();

    println!("=== Missing values ===");
    for (name, col) in table.values() {
        let missing = col.null_count();
        let pct = if table.num_rows() == 0 {
            0.0
        } else {
            100.0 * missing as f64 / table.num_rows() as f64
        };
        println!("- {:<30} {:>10} ({:.1}%)", name, missing, pct);
    }

    Ok(())
}
