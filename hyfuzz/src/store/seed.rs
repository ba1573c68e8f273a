//! Seed entities and the datasets built from them.
use enum_map::EnumMap;
use log::debug;

use crate::{
    error::{ConfigError, ConfigResult},
    store::RowKey,
    types::ValueType,
    value::Value,
};

/// Per-type entity tables. Entity `i` of a table has id `i`.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    tables: EnumMap<ValueType, Vec<Value>>,
}

impl SeedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity to the table of its type and return its id.
    ///
    /// Typed nulls go to the table of their type.
    pub fn push(&mut self, value: Value) -> u32 {
        let table = &mut self.tables[value.value_type()];
        table.push(value);
        (table.len() - 1) as u32
    }

    pub fn table(&self, ty: ValueType) -> &[Value] {
        &self.tables[ty]
    }

    /// Two to four entities per type, each table holding a null.
    ///
    /// Integer entities avoid zero so that divide-by-zero faults come from literals only.
    pub fn standard() -> Self {
        let mut seed = Self::new();
        for v in [Value::from(1), Value::from(2), Value::from(-3)] {
            seed.push(v);
        }
        for v in ["A", "B"] {
            seed.push(Value::from(v));
        }
        for v in [true, false] {
            seed.push(Value::from(v));
        }
        for secs in [0i64, 1_000_000_000] {
            if let Some(v) = Value::timestamp(secs) {
                seed.push(v);
            }
        }
        for ty in [
            ValueType::Int,
            ValueType::String,
            ValueType::Bool,
            ValueType::DateTime,
        ] {
            seed.push(Value::Null(ty));
        }
        seed
    }
}

/// One row of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: RowKey,
    pub values: Vec<Value>,
}

/// Typed rows, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    schema: Vec<ValueType>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Cross join of one seed table per column; column `i` draws from the table of
    /// `columns[i]`.
    ///
    /// The row key is the tuple of entity ids, and rows come out in key order.
    pub fn cross_join(seed: &SeedData, columns: &[ValueType]) -> ConfigResult<Self> {
        if let Some(ty) = columns.iter().find(|ty| seed.table(**ty).is_empty()) {
            return Err(ConfigError::EmptySeedTable(*ty));
        }

        let tables: Vec<&[Value]> = columns.iter().map(|ty| seed.table(*ty)).collect();
        let mut ids = vec![0usize; columns.len()];
        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.len()).product());

        'odometer: loop {
            rows.push(Row {
                key: RowKey::new(ids.iter().map(|i| *i as u32)),
                values: ids
                    .iter()
                    .zip(&tables)
                    .map(|(i, table)| table[*i].clone())
                    .collect(),
            });

            // Advance the last column first so keys come out sorted
            for column in (0..ids.len()).rev() {
                ids[column] += 1;
                if ids[column] < tables[column].len() {
                    continue 'odometer;
                }
                ids[column] = 0;
            }
            break;
        }

        debug!(
            "Cross-joined {} row(s) over columns {:?}",
            rows.len(),
            columns
        );
        Ok(Self {
            schema: columns.to_vec(),
            rows,
        })
    }

    /// Explicit rows; row `i` gets key `(i)`.
    pub fn from_rows<I>(schema: &[ValueType], rows: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(row, values)| {
                if values.len() != schema.len() {
                    return Err(ConfigError::DatasetWidthMismatch {
                        row,
                        expected: schema.len(),
                        found: values.len(),
                    });
                }
                for (column, (value, expected)) in values.iter().zip(schema).enumerate() {
                    if value.value_type() != *expected {
                        return Err(ConfigError::DatasetTypeMismatch {
                            row,
                            column,
                            expected: *expected,
                            found: value.value_type(),
                        });
                    }
                }
                Ok(Row {
                    key: RowKey::new([row as u32]),
                    values,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            schema: schema.to_vec(),
            rows,
        })
    }

    #[inline]
    pub fn schema(&self) -> &[ValueType] {
        &self.schema
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.schema.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_join_is_exhaustive_and_sorted() {
        let seed = SeedData::standard();
        let columns = [ValueType::String, ValueType::Bool];
        let data = Dataset::cross_join(&seed, &columns).unwrap();
        assert_eq!(data.len(), 9);
        assert!(data.rows().windows(2).all(|w| w[0].key < w[1].key));
        assert_eq!(data.rows()[0].values, vec![Value::from("A"), Value::from(true)]);
    }

    #[test]
    fn cross_join_of_no_columns_is_one_empty_row() {
        let data = Dataset::cross_join(&SeedData::standard(), &[]).unwrap();
        assert_eq!(data.len(), 1);
        assert!(data.rows()[0].values.is_empty());
    }

    #[test]
    fn empty_tables_are_rejected() {
        let mut seed = SeedData::new();
        seed.push(Value::from(1));
        assert!(matches!(
            Dataset::cross_join(&seed, &[ValueType::Int, ValueType::Bool]),
            Err(ConfigError::EmptySeedTable(ValueType::Bool))
        ));
    }

    #[test]
    fn from_rows_checks_types() {
        let err = Dataset::from_rows(&[ValueType::Int], [vec![Value::from("1")]]).unwrap_err();
        assert!(err.is_dataset_type_mismatch());
        let err = Dataset::from_rows(&[ValueType::Int], [vec![]]).unwrap_err();
        assert!(err.is_dataset_width_mismatch());
    }
}
