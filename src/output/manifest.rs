use serde::Serialize;
use std::{
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use super::{write_atomically, OutputFormat};
use crate::{
    error::{Result, WaveError},
    merge::{JoinKind, MergeStep},
};

/// Sidecar record of a run: which file fed which wave and how the
/// accumulated table grew. Contains no timestamps so reruns on the same
/// inputs produce the same bytes.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub key: String,
    pub join: JoinKind,
    pub format: OutputFormat,
    pub output: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
    pub waves: Vec<MergeStep>,
}

impl RunManifest {
    /// `<output>.manifest.json`
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = output
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".manifest.json");
        output.with_file_name(name)
    }
}

/// Write `manifest` next to its output file, returning the path written.
pub fn write_manifest(manifest: &RunManifest) -> Result<PathBuf> {
    let path = RunManifest::path_for(&manifest.output);
    write_atomically(&path, |file| {
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, manifest)
            .map_err(|e| WaveError::Config(format!("serializing manifest: {}", e)))?;
        w.write_all(b"\n").map_err(|e| WaveError::io(&path, e))?;
        w.flush().map_err(|e| WaveError::io(&path, e))
    })?;
    Ok(path)
}
