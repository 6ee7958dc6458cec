// src/report.rs

use arrow::{
    array::{Array, BooleanArray, Float64Array},
    compute::{self, kernels::boolean},
};
use serde::Serialize;
use std::fmt::Write as _;

use crate::{discover::Waves, error::Result, table::WaveTable};

/// Non-missing/missing counts and range of one value column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub present: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// How many respondents appear in one wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaveCoverage {
    pub letter: char,
    pub columns: usize,
    /// Rows with at least one non-missing value in this wave's columns.
    pub respondents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub waves: Vec<WaveCoverage>,
    pub columns: Vec<ColumnStats>,
    /// Respondents seen in every wave.
    pub in_all_waves: usize,
    /// Respondents seen in exactly one wave.
    pub in_one_wave: usize,
}

/// Wave letter of a `<letter>_<base>` column name.
fn wave_letter(name: &str) -> Option<char> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), Some('_')) if c.is_ascii_lowercase() => Some(c),
        _ => None,
    }
}

/// Wave letters in order of their first column, for tables read back from disk.
pub fn waves_in(table: &WaveTable) -> Option<Waves> {
    let mut letters = String::new();
    for (name, _) in table.values() {
        if let Some(c) = wave_letter(name) {
            if !letters.contains(c) {
                letters.push(c);
            }
        }
    }
    Waves::parse(&letters).ok()
}

fn column_stats(name: &str, col: &Float64Array) -> ColumnStats {
    let present = col.len() - col.null_count();
    let mean = compute::sum(col).filter(|_| present > 0).map(|s| s / present as f64);
    ColumnStats {
        name: name.to_string(),
        present,
        missing: col.null_count(),
        min: compute::min(col),
        max: compute::max(col),
        mean,
    }
}

/// Describe the accumulated table: per-column stats, per-wave coverage and
/// the attrition counts.
pub fn summarize(table: &WaveTable, waves: &Waves) -> Result<Summary> {
    let rows = table.num_rows();
    let columns: Vec<ColumnStats> = table.values().map(|(n, c)| column_stats(n, c)).collect();

    let mut seen_in = vec![0usize; rows];
    let mut coverage = Vec::with_capacity(waves.len());
    for (_, letter) in waves.iter() {
        // row present in this wave if any of its columns is non-null
        let mut present: Option<BooleanArray> = None;
        let mut ncols = 0;
        for (name, col) in table.values() {
            if wave_letter(name) != Some(letter) {
                continue;
            }
            ncols += 1;
            let valid = boolean::is_not_null(col)?;
            present = Some(match present {
                None => valid,
                Some(p) => boolean::or(&p, &valid)?,
            });
        }
        let respondents = match &present {
            Some(p) => {
                for (i, hit) in p.iter().enumerate() {
                    if hit == Some(true) {
                        seen_in[i] += 1;
                    }
                }
                p.true_count()
            }
            None => 0,
        };
        coverage.push(WaveCoverage {
            letter,
            columns: ncols,
            respondents,
        });
    }

    let active = coverage.iter().filter(|c| c.columns > 0).count();
    Ok(Summary {
        rows,
        in_all_waves: seen_in.iter().filter(|n| active > 0 && **n == active).count(),
        in_one_wave: seen_in.iter().filter(|n| **n == 1).count(),
        waves: coverage,
        columns,
    })
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".into())
}

impl Summary {
    /// Plain-text rendering for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "respondents: {}", self.rows);
        let _ = writeln!(
            out,
            "in every wave: {}   in one wave only: {}",
            self.in_all_waves, self.in_one_wave
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<6} {:>8} {:>12}", "wave", "columns", "respondents");
        for w in &self.waves {
            let _ = writeln!(out, "{:<6} {:>8} {:>12}", w.letter, w.columns, w.respondents);
        }
        let _ = writeln!(out);

        let width = self
            .columns
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(6)
            .max(6);
        let _ = writeln!(
            out,
            "{:<width$} {:>9} {:>9} {:>10} {:>10} {:>10}",
            "column", "present", "missing", "min", "max", "mean"
        );
        for c in &self.columns {
            let _ = writeln!(
                out,
                "{:<width$} {:>9} {:>9} {:>10} {:>10} {:>10}",
                c.name,
                c.present,
                c.missing,
                fmt_opt(c.min),
                fmt_opt(c.max),
                fmt_opt(c.mean)
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined() -> WaveTable {
        // wave a: ids 1,2,3; wave b: ids 2,3,4
        WaveTable::from_columns(
            "pidp",
            vec![1, 2, 3, 4],
            vec![
                ("a_sex".into(), vec![Some(1.0), Some(2.0), Some(1.0), None]),
                ("a_dvage".into(), vec![Some(30.0), None, Some(50.0), None]),
                ("b_sex".into(), vec![None, Some(2.0), Some(1.0), Some(2.0)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn counts_coverage_and_attrition() {
        let t = joined();
        let s = summarize(&t, &Waves::parse("ab").unwrap()).unwrap();
        assert_eq!(s.rows, 4);
        assert_eq!(s.waves[0].respondents, 3);
        assert_eq!(s.waves[0].columns, 2);
        assert_eq!(s.waves[1].respondents, 3);
        assert_eq!(s.in_all_waves, 2);
        assert_eq!(s.in_one_wave, 2);

        let age = s.columns.iter().find(|c| c.name == "a_dvage").unwrap();
        assert_eq!(age.present, 2);
        assert_eq!(age.missing, 2);
        assert_eq!(age.min, Some(30.0));
        assert_eq!(age.max, Some(50.0));
        assert_eq!(age.mean, Some(40.0));
    }

    #[test]
    fn waves_are_read_from_column_prefixes() {
        assert_eq!(waves_in(&joined()).unwrap().to_string(), "ab");
    }

    #[test]
    fn wave_without_columns_has_no_respondents() {
        let s = summarize(&joined(), &Waves::parse("abc").unwrap()).unwrap();
        assert_eq!(s.waves[2].columns, 0);
        assert_eq!(s.waves[2].respondents, 0);
        // waves without columns do not count against "every wave"
        assert_eq!(s.in_all_waves, 2);
    }

    #[test]
    fn render_lists_every_column() {
        let text = summarize(&joined(), &Waves::parse("ab").unwrap())
            .unwrap()
            .render();
        assert!(text.contains("respondents: 4"));
        for name in ["a_sex", "a_dvage", "b_sex"] {
            assert!(text.contains(name));
        }
        assert!(text.contains("40.00"));
    }
}
