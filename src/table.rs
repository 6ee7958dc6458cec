// src/table.rs

use arrow::{
    array::{Array, ArrayRef, Float64Array, Int64Array},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::error::{Result, WaveError};

/// A keyed table: column 0 is a non-null Int64 id, every other column is a
/// nullable Float64 where null means "missing".
#[derive(Debug, Clone)]
pub struct WaveTable {
    batch: RecordBatch,
}

impl WaveTable {
    /// Wrap `batch`, checking the key/value layout described on the type.
    pub fn try_new(batch: RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let key = schema
            .fields()
            .first()
            .ok_or_else(|| WaveError::MissingKey("<empty>".into()))?;
        if key.data_type() != &DataType::Int64 || batch.column(0).null_count() > 0 {
            return Err(WaveError::MissingKey(key.name().clone()));
        }
        for field in schema.fields().iter().skip(1) {
            if field.data_type() != &DataType::Float64 {
                return Err(WaveError::Config(format!(
                    "value column `{}` has type {}, expected Float64",
                    field.name(),
                    field.data_type()
                )));
            }
        }
        Ok(Self { batch })
    }

    /// Build from an id vector and named value columns.
    pub fn from_columns(
        key: &str,
        ids: Vec<i64>,
        values: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        let values = values
            .into_iter()
            .map(|(name, col)| (name, Float64Array::from(col)))
            .collect();
        Self::from_arrays(key, Int64Array::from(ids), values)
    }

    /// Build from finished arrow arrays.
    pub fn from_arrays(
        key: &str,
        ids: Int64Array,
        values: Vec<(String, Float64Array)>,
    ) -> Result<Self> {
        let mut fields = Vec::with_capacity(values.len() + 1);
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(values.len() + 1);
        fields.push(Field::new(key, DataType::Int64, false));
        arrays.push(Arc::new(ids));
        for (name, col) in values {
            fields.push(Field::new(&name, DataType::Float64, true));
            arrays.push(Arc::new(col));
        }
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Self::try_new(batch)
    }

    pub fn key(&self) -> &str {
        self.batch.schema_ref().field(0).name()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn ids(&self) -> &Int64Array {
        self.batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("checked in try_new")
    }

    /// All column names, key first.
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Value columns (everything but the key) with their names.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Float64Array)> + '_ {
        let schema = self.batch.schema_ref();
        (1..self.batch.num_columns()).map(move |i| {
            let arr = self
                .batch
                .column(i)
                .as_any()
                .downcast_ref::<Float64Array>()
                .expect("checked in try_new");
            (schema.field(i).name().as_str(), arr)
        })
    }

    /// Look up a value column by name.
    pub fn column(&self, name: &str) -> Option<&Float64Array> {
        self.values().find(|(n, _)| *n == name).map(|(_, a)| a)
    }

    /// Row index of `id`, scanning in order.
    pub fn position(&self, id: i64) -> Option<usize> {
        self.ids().values().iter().position(|v| *v == id)
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }
}
