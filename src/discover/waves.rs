use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Result, WaveError};

/// The ordered set of wave letters a study expects, e.g. `abcdefg`.
/// Position in the set is the wave index (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waves(Vec<char>);

impl Waves {
    pub fn parse(s: &str) -> Result<Self> {
        let letters: Vec<char> = s.trim().chars().collect();
        if letters.is_empty() {
            return Err(WaveError::Config("wave list is empty".into()));
        }
        for (i, c) in letters.iter().enumerate() {
            if !c.is_ascii_lowercase() {
                return Err(WaveError::Config(format!(
                    "wave letter `{}` must be a lowercase ascii letter",
                    c
                )));
            }
            if letters[..i].contains(c) {
                return Err(WaveError::Config(format!("wave letter `{}` listed twice", c)));
            }
        }
        Ok(Self(letters))
    }

    /// The first `n` letters of the alphabet.
    pub fn first(n: usize) -> Self {
        Self((b'a'..=b'z').take(n).map(char::from).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 1-based index of `letter`, if expected.
    pub fn index_of(&self, letter: char) -> Option<usize> {
        self.0.iter().position(|c| *c == letter).map(|i| i + 1)
    }

    pub fn letters(&self) -> &[char] {
        &self.0
    }

    /// `(index, letter)` pairs, wave 1 first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, char)> + '_ {
        self.0.iter().enumerate().map(|(i, c)| (i + 1, *c))
    }
}

impl Default for Waves {
    fn default() -> Self {
        Self::first(7)
    }
}

impl fmt::Display for Waves {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.0 {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Waves {
    type Err = WaveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Waves {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Waves {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
