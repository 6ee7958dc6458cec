// src/config.rs

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    discover::Waves,
    error::{Result, WaveError},
    merge::JoinKind,
    output::OutputFormat,
    process::{utils::Delimiter, DuplicatePolicy, LoadOptions},
};

fn default_pattern() -> String {
    "indresp".into()
}

fn default_include() -> String {
    "us".into()
}

fn default_key() -> String {
    "pidp".into()
}

/// The survey's negative non-response codes.
fn default_missing_codes() -> Vec<f64> {
    vec![-9.0, -8.0, -7.0, -2.0, -1.0]
}

/// One study: where the wave files live, what to take from each, and where
/// the joined table goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudyConfig {
    pub root: PathBuf,
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default = "default_include")]
    pub include: String,
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default)]
    pub waves: Waves,
    pub variables: Vec<String>,
    #[serde(default = "default_missing_codes")]
    pub missing_codes: Vec<f64>,
    #[serde(default)]
    pub join: JoinKind,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
    #[serde(default)]
    pub delimiter: Delimiter,
    pub output: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub null_token: String,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            pattern: default_pattern(),
            include: default_include(),
            key: default_key(),
            waves: Waves::default(),
            variables: Vec::new(),
            missing_codes: default_missing_codes(),
            join: JoinKind::default(),
            on_duplicate: DuplicatePolicy::default(),
            delimiter: Delimiter::default(),
            output: PathBuf::new(),
            format: OutputFormat::default(),
            null_token: String::new(),
        }
    }
}

impl StudyConfig {
    /// Parse a YAML study file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| WaveError::io(path, e))?;
        Self::from_yaml(&text)
            .map_err(|e| WaveError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| WaveError::Config(e.to_string()))
    }

    /// Check the fields that have no sensible default.
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(WaveError::Config("`root` is required".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(WaveError::Config("`output` is required".into()));
        }
        if self.variables.is_empty() {
            return Err(WaveError::Config("`variables` must list at least one name".into()));
        }
        if self.key.trim().is_empty() {
            return Err(WaveError::Config("`key` must not be empty".into()));
        }
        if self.pattern.trim().is_empty() {
            return Err(WaveError::Config("`pattern` must not be empty".into()));
        }
        for (i, v) in self.variables.iter().enumerate() {
            if v.trim().is_empty() {
                return Err(WaveError::Config("empty variable name".into()));
            }
            if self.variables[..i].contains(v) {
                return Err(WaveError::Config(format!("variable `{}` listed twice", v)));
            }
        }
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter,
            missing_codes: self.missing_codes.clone(),
            missing_tokens: Vec::new(),
            on_duplicate: self.on_duplicate,
        }
    }
}
