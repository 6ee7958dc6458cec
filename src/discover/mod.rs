// src/discover/mod.rs

mod waves;

pub use waves::Waves;

use glob::glob;
use regex::Regex;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

use crate::error::{Result, WaveError};

/// One input file, pinned to the wave its name declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaveFile {
    /// 1-based position in the wave sequence.
    pub index: usize,
    pub letter: char,
    pub path: PathBuf,
}

impl WaveFile {
    /// Wave-prefixed column name, e.g. `sex` → `b_sex` for wave b.
    pub fn column(&self, base: &str) -> String {
        format!("{}_{}", self.letter, base)
    }

    /// Short label used in logs and error messages.
    pub fn label(&self) -> String {
        format!("wave {} ({})", self.index, self.letter)
    }
}

/// Extensions accepted as delimited text.
const EXTENSIONS: &[&str] = &["tab", "tsv", "csv", "txt"];

/// Build the file name matcher `^<letter>_<pattern>.<ext>$`.
fn name_matcher(pattern: &str) -> Result<Regex> {
    let re = format!(
        r"^([a-z])_{}\.(?i:{})$",
        regex::escape(pattern),
        EXTENSIONS.join("|")
    );
    Regex::new(&re).map_err(|e| WaveError::Config(format!("bad file pattern `{}`: {}", pattern, e)))
}

/// Find one file per expected wave under `root`.
///
/// Candidates must contain `include` somewhere in their path relative to
/// `root` and have a file name of the form `<letter>_<pattern>.<ext>`. The
/// wave is taken from that letter, so the result is ordered by wave
/// regardless of directory order.
///
/// Path components above `root` are not searched, so a root that is itself
/// the `us` directory needs an empty `include`.
#[instrument(level = "info", skip(root, waves), fields(root = %root.as_ref().display()))]
pub fn discover_waves<P: AsRef<Path>>(
    root: P,
    pattern: &str,
    include: &str,
    waves: &Waves,
) -> Result<Vec<WaveFile>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(WaveError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "root is not a directory"),
        ));
    }

    let matcher = name_matcher(pattern)?;
    let glob_pattern = format!(
        "{}/**/*{}*",
        glob::Pattern::escape(&root.to_string_lossy()),
        glob::Pattern::escape(pattern)
    );

    let mut found: BTreeMap<usize, WaveFile> = BTreeMap::new();
    let mut candidates = 0usize;
    for entry in glob(&glob_pattern)? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path.as_path());
        if !rel.to_string_lossy().contains(include) {
            debug!(path = %path.display(), include, "excluded by include filter");
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(caps) = matcher.captures(name) else {
            debug!(path = %path.display(), "name does not match wave pattern");
            continue;
        };
        candidates += 1;

        let letter = caps[1].chars().next().unwrap_or_default();
        let Some(index) = waves.index_of(letter) else {
            debug!(path = %path.display(), %letter, "wave letter not expected; ignoring");
            continue;
        };

        let file = WaveFile {
            index,
            letter,
            path: path.clone(),
        };
        if let Some(prev) = found.insert(index, file) {
            let (first, second) = if prev.path <= path {
                (prev.path, path)
            } else {
                (path, prev.path)
            };
            return Err(WaveError::AmbiguousWave {
                letter,
                first,
                second,
            });
        }
    }

    if candidates == 0 {
        return Err(WaveError::NoFiles {
            root: root.to_path_buf(),
            pattern: pattern.to_string(),
        });
    }

    for (index, letter) in waves.iter() {
        if !found.contains_key(&index) {
            return Err(WaveError::MissingWave { index, letter });
        }
    }

    let files: Vec<WaveFile> = found.into_values().collect();
    for f in &files {
        info!(wave = %f.label(), path = %f.path.display(), "discovered");
    }
    Ok(files)
}
