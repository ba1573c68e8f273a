//! Semantic value types of the operator algebra.
use enum_map::Enum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIs, EnumIter, EnumString};

/// Semantic type of a value, a column, or an expression.
///
/// Every type is nullable: a column of any type may hold a typed null, the way
/// nullable entity properties (`int?`, `bool?`, `string`) behave in a store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Enum,
    EnumIs,
    EnumIter,
    EnumString,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Int,
    Bool,
    String,
    DateTime,
}

impl ValueType {
    /// Name of the entity property holding a value of this type.
    ///
    /// Used when printing field accesses (`e0.Number`, `e3.Bool`, ...).
    pub const fn property_name(self) -> &'static str {
        match self {
            ValueType::Int => "Number",
            ValueType::Bool => "Bool",
            ValueType::String => "String",
            ValueType::DateTime => "DateTime",
        }
    }
}
