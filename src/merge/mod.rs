// src/merge/mod.rs

use arrow::{
    array::{Array, Float64Array, Int64Array, UInt64Array},
    compute::take,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::PathBuf,
};
use tracing::{info, instrument};

use crate::{
    discover::WaveFile,
    error::{Result, WaveError},
    table::WaveTable,
};

/// Which ids survive a join.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    /// Every id from either side.
    #[default]
    Full,
}

impl JoinKind {
    fn keeps_left_only(self) -> bool {
        matches!(self, JoinKind::Left | JoinKind::Full)
    }

    fn keeps_right_only(self) -> bool {
        matches!(self, JoinKind::Right | JoinKind::Full)
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Full => "full",
        };
        f.write_str(s)
    }
}

/// Join two keyed tables on their id column.
///
/// Rows come out as: left rows in left order (matched or kept), then
/// right-only rows in right order. Columns are the left key, the left value
/// columns, then the right value columns. Both sides must have unique ids.
pub fn join(left: &WaveTable, right: &WaveTable, kind: JoinKind) -> Result<WaveTable> {
    let left_names: HashSet<&str> = left.values().map(|(n, _)| n).collect();
    if let Some((name, _)) = right.values().find(|(n, _)| left_names.contains(n)) {
        return Err(WaveError::ColumnCollision {
            column: name.to_string(),
        });
    }

    let right_ids = right.ids();
    let right_pos: HashMap<i64, u64> = right_ids
        .values()
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i as u64))
        .collect();
    let mut right_matched = vec![false; right.num_rows()];

    let mut ids: Vec<i64> = Vec::with_capacity(left.num_rows().max(right.num_rows()));
    let mut left_take: Vec<Option<u64>> = Vec::with_capacity(ids.capacity());
    let mut right_take: Vec<Option<u64>> = Vec::with_capacity(ids.capacity());

    for (i, id) in left.ids().values().iter().enumerate() {
        match right_pos.get(id) {
            Some(&j) => {
                right_matched[j as usize] = true;
                ids.push(*id);
                left_take.push(Some(i as u64));
                right_take.push(Some(j));
            }
            None if kind.keeps_left_only() => {
                ids.push(*id);
                left_take.push(Some(i as u64));
                right_take.push(None);
            }
            None => {}
        }
    }

    if kind.keeps_right_only() {
        for (j, id) in right_ids.values().iter().enumerate() {
            if !right_matched[j] {
                ids.push(*id);
                left_take.push(None);
                right_take.push(Some(j as u64));
            }
        }
    }

    let left_idx = UInt64Array::from(left_take);
    let right_idx = UInt64Array::from(right_take);
    let mut values: Vec<(String, Float64Array)> =
        Vec::with_capacity(left.num_columns() + right.num_columns() - 2);
    for (side, idx) in [(left, &left_idx), (right, &right_idx)] {
        for (name, col) in side.values() {
            // null indices produce null values, i.e. "missing"
            let taken = take(col, idx, None)?;
            let taken = taken
                .as_any()
                .downcast_ref::<Float64Array>()
                .cloned()
                .ok_or_else(|| WaveError::Config(format!("column `{}` lost its type", name)))?;
            values.push((name.to_string(), taken));
        }
    }

    WaveTable::from_arrays(left.key(), Int64Array::from(ids), values)
}

/// Full outer join: one row per id present on either side.
pub fn full_join(left: &WaveTable, right: &WaveTable) -> Result<WaveTable> {
    join(left, right, JoinKind::Full)
}

/// Record of one wave's contribution to the accumulated table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeStep {
    pub index: usize,
    pub letter: char,
    pub path: PathBuf,
    pub rows_loaded: usize,
    pub columns: Vec<String>,
    pub accumulated_rows: usize,
}

/// Fold the waves into one table: wave 1 as loaded, every later wave joined
/// onto the running result with `kind`.
///
/// `load` is called once per wave in order and its table is dropped as soon
/// as it has been merged.
#[instrument(level = "info", skip_all, fields(join = %kind))]
pub fn accumulate<'a, I, F>(
    waves: I,
    kind: JoinKind,
    mut load: F,
) -> Result<(WaveTable, Vec<MergeStep>)>
where
    I: IntoIterator<Item = &'a WaveFile>,
    F: FnMut(&WaveFile) -> Result<WaveTable>,
{
    let (acc, steps) = waves.into_iter().try_fold(
        (None::<WaveTable>, Vec::new()),
        |(acc, mut steps), wave| {
            let table = load(wave)?;
            let rows_loaded = table.num_rows();
            let columns: Vec<String> = table.values().map(|(n, _)| n.to_string()).collect();

            let merged = match acc {
                None => table,
                Some(acc) => join(&acc, &table, kind)?,
            };
            info!(
                wave = %wave.label(),
                rows_loaded,
                accumulated = merged.num_rows(),
                "merged"
            );
            steps.push(MergeStep {
                index: wave.index,
                letter: wave.letter,
                path: wave.path.clone(),
                rows_loaded,
                columns,
                accumulated_rows: merged.num_rows(),
            });
            Ok::<_, WaveError>((Some(merged), steps))
        },
    )?;

    let acc = acc.ok_or(WaveError::NoWaves)?;
    Ok((acc, steps))
}
