//! Translated path: columnar storage queried through compiled programs.
use log::trace;
use parking_lot::{Mutex, MutexGuard};

use crate::{
    error::{ConfigError, ConfigResult, EvalResult},
    store::{
        Query, QueryShape, QuerySource, ResultRow, RowKey,
        accessor::Column,
        compile::compile,
        filter_keeps,
        seed::Dataset,
    },
    types::ValueType,
    value::Value,
};

/// Execution state of the store: columns, row keys and the VM stack.
#[derive(Debug, Default)]
pub struct Session {
    schema: Vec<ValueType>,
    columns: Vec<Column>,
    keys: Vec<RowKey>,
    stack: Vec<Value>,
    queries: u64,
}

impl Session {
    pub fn schema(&self) -> &[ValueType] {
        &self.schema
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.keys.len()
    }

    /// Number of queries run in this session.
    pub fn queries(&self) -> u64 {
        self.queries
    }

    fn run(&mut self, query: &Query) -> EvalResult<Vec<ResultRow>> {
        self.queries += 1;
        let program = compile(&query.tree, &self.schema)?;
        trace!("Compiled query #{}:\n{program}", self.queries);

        let mut out = Vec::with_capacity(self.keys.len());
        for (row, key) in self.keys.iter().enumerate() {
            let value = program.execute(&self.columns, row, &mut self.stack)?;
            if query.shape == QueryShape::Filter && !filter_keeps(&value)? {
                continue;
            }
            out.push(ResultRow {
                key: key.clone(),
                value,
            });
        }
        Ok(out)
    }
}

/// Columnar copy of a dataset. Every query holds the session lock for its whole evaluation.
#[derive(Debug, Default)]
pub struct MaterializedStore {
    session: Mutex<Session>,
}

impl MaterializedStore {
    /// Transpose `data` into typed columns.
    pub fn load(data: &Dataset) -> ConfigResult<Self> {
        let mut columns: Vec<Column> = data.schema().iter().map(|ty| Column::new(*ty)).collect();
        let mut keys = Vec::with_capacity(data.len());

        for (row_index, row) in data.rows().iter().enumerate() {
            for (column, (storage, value)) in columns.iter_mut().zip(&row.values).enumerate() {
                storage.push(value.clone()).map_err(|_| ConfigError::DatasetTypeMismatch {
                    row: row_index,
                    column,
                    expected: storage.value_type(),
                    found: value.value_type(),
                })?;
            }
            keys.push(row.key.clone());
        }

        Ok(Self {
            session: Mutex::new(Session {
                schema: data.schema().to_vec(),
                columns,
                keys,
                ..Default::default()
            }),
        })
    }

    /// Lock the session, e.g. to inspect it between queries.
    pub fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock()
    }
}

impl QuerySource for MaterializedStore {
    fn name(&self) -> &'static str {
        "translated"
    }

    fn query(&self, query: &Query) -> EvalResult<Vec<ResultRow>> {
        self.session.lock().run(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::func::*;

    #[test]
    fn filter_keeps_true_rows_only() {
        let data = Dataset::from_rows(
            &[ValueType::Bool],
            [
                vec![Value::from(true)],
                vec![Value::from(false)],
                vec![Value::Null(ValueType::Bool)],
            ],
        )
        .unwrap();
        let store = MaterializedStore::load(&data).unwrap();
        let rows = store
            .query(&Query::filter(field(0, ValueType::Bool)))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, RowKey::new([0]));
        assert_eq!(store.session().queries(), 1);
    }

    #[test]
    fn filter_requires_booleans() {
        let data = Dataset::from_rows(&[ValueType::Int], [vec![Value::from(1)]]).unwrap();
        let store = MaterializedStore::load(&data).unwrap();
        assert!(
            store
                .query(&Query::filter(field(0, ValueType::Int)))
                .unwrap_err()
                .is_type_mismatch()
        );
    }
}
