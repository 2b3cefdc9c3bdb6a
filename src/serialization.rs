use crate::property::{PropertyBag, PropertyValue};
use crate::table::{Cell, Table};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    Null,
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

pub(crate) fn to_value(value: &PropertyValue) -> Value {
    match value {
        // A bare keyword reads as "switched on".
        PropertyValue::Flag => Value::Boolean(true),
        PropertyValue::Float(n) => Value::Number(*n),
        PropertyValue::Int(n) => Value::Integer(*n),
        PropertyValue::Text(s) => Value::String(s.clone()),
        PropertyValue::List(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        PropertyValue::Bag(bag) => bag_to_value(bag),
        PropertyValue::Table(table) => table_to_value(table),
    }
}

pub(crate) fn bag_to_value(bag: &PropertyBag) -> Value {
    Value::Object(bag.iter().map(|(k, v)| (k.to_string(), to_value(v))).collect())
}

/// Tables serialize column-wise.
pub(crate) fn table_to_value(table: &Table) -> Value {
    Value::Object(
        table
            .columns()
            .map(|(name, cells)| {
                let cells = cells.iter().map(cell_to_value).collect();
                (name.to_string(), Value::Array(cells))
            })
            .collect(),
    )
}

fn cell_to_value(cell: &Cell) -> Value {
    match cell {
        Cell::Number(n) => Value::Number(*n),
        Cell::Text(s) => Value::String(s.clone()),
        Cell::Null => Value::Null,
    }
}

impl Serialize for PropertyBag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        bag_to_value(self).serialize(serializer)
    }
}

impl Serialize for PropertyValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        to_value(self).serialize(serializer)
    }
}
