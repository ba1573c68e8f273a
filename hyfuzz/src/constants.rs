//! Typed literal banks the generator draws terminals from.
use enum_map::EnumMap;

use crate::{
    catalog::OperatorCatalog,
    error::{ConfigError, ConfigResult},
    types::ValueType,
    value::Value,
};

/// Per-type banks of literals. Banks are append-only; typed nulls are ordinary members.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    banks: EnumMap<ValueType, Vec<Value>>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a literal to the bank of type `ty`.
    pub fn push(&mut self, ty: ValueType, value: Value) -> ConfigResult<()> {
        if value.value_type() != ty {
            return Err(ConfigError::ConstantTypeMismatch {
                expected: ty,
                found: value.value_type(),
            });
        }
        self.banks[ty].push(value);
        Ok(())
    }

    /// Builder-style [`push`](Self::push) of several literals.
    pub fn with<I, V>(mut self, ty: ValueType, values: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for value in values {
            self.push(ty, value.into())?;
        }
        Ok(self)
    }

    /// Literals of type `ty`, in insertion order.
    #[inline]
    pub fn constants_of(&self, ty: ValueType) -> &[Value] {
        &self.banks[ty]
    }

    /// Fail if some type used by `catalog` has an empty bank.
    pub fn validate_for(&self, catalog: &OperatorCatalog) -> ConfigResult<()> {
        match catalog
            .value_types()
            .into_iter()
            .find(|ty| self.banks[*ty].is_empty())
        {
            Some(ty) => Err(ConfigError::MissingConstants(ty)),
            None => Ok(()),
        }
    }

    /// The built-in pool: a few literals of each type, each bank including its typed null.
    pub fn standard() -> ConfigResult<Self> {
        use ValueType::*;

        let mut pool = Self::new()
            .with(Int, [0, 1, -1, 2, 7])?
            .with(String, ["A", "B", "A%", "%B", "AB", ""])?
            .with(Bool, [true, false])?;
        for secs in [0i64, 1_000_000_000] {
            if let Some(v) = Value::timestamp(secs) {
                pool.push(DateTime, v)?;
            }
        }
        for ty in [Int, String, Bool, DateTime] {
            pool.push(ty, Value::Null(ty))?;
        }
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_rejects_foreign_literals() {
        let mut pool = ConstantPool::new();
        assert!(matches!(
            pool.push(ValueType::Int, Value::from("1")),
            Err(ConfigError::ConstantTypeMismatch {
                expected: ValueType::Int,
                found: ValueType::String
            })
        ));
        assert!(pool.constants_of(ValueType::Int).is_empty());
    }

    #[test]
    fn standard_pool_has_nulls() {
        let pool = ConstantPool::standard().unwrap();
        for ty in [
            ValueType::Int,
            ValueType::Bool,
            ValueType::String,
            ValueType::DateTime,
        ] {
            assert!(pool.constants_of(ty).contains(&Value::Null(ty)));
        }
        pool.validate_for(&OperatorCatalog::standard().unwrap())
            .unwrap();
    }
}
