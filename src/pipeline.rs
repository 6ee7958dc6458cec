// src/pipeline.rs

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::{
    config::StudyConfig,
    discover::{discover_waves, WaveFile},
    merge::{accumulate, MergeStep},
    output::{write_manifest, write_table, RunManifest},
    process::load_wave,
    table::WaveTable,
};

/// What a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub table: WaveTable,
    pub steps: Vec<MergeStep>,
    pub output: PathBuf,
    pub manifest: PathBuf,
}

/// Resolve the wave → file mapping for `cfg`.
pub fn discover(cfg: &StudyConfig) -> Result<Vec<WaveFile>> {
    discover_waves(&cfg.root, &cfg.pattern, &cfg.include, &cfg.waves).with_context(|| {
        format!(
            "discovering `{}` files under {}",
            cfg.pattern,
            cfg.root.display()
        )
    })
}

/// Discover, load and join every wave, then write the table and its manifest.
pub fn run(cfg: &StudyConfig) -> Result<RunReport> {
    cfg.validate()?;
    let start = Instant::now();

    // ─── 1) pin files to waves ───────────────────────────────────────
    let files = discover(cfg)?;
    info!("{} waves: {}", files.len(), cfg.waves);

    // ─── 2) load + join, one wave at a time ──────────────────────────
    let opts = cfg.load_options();
    let (table, steps) = accumulate(&files, cfg.join, |wave| {
        load_wave(wave, &cfg.key, &cfg.variables, &opts)
    })
    .context("accumulating waves")?;

    // ─── 3) write table + manifest ───────────────────────────────────
    write_table(&table, &cfg.output, cfg.format, &cfg.null_token)
        .with_context(|| format!("writing {}", cfg.output.display()))?;

    let manifest = RunManifest {
        key: cfg.key.clone(),
        join: cfg.join,
        format: cfg.format,
        output: cfg.output.clone(),
        rows: table.num_rows(),
        columns: table.column_names(),
        waves: steps.clone(),
    };
    let manifest_path = write_manifest(&manifest).context("writing run manifest")?;

    info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        elapsed = ?start.elapsed(),
        "done"
    );
    Ok(RunReport {
        table,
        steps,
        output: cfg.output.clone(),
        manifest: manifest_path,
    })
}
