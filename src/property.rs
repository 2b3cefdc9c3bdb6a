use crate::table::Table;
use indexmap::IndexMap;

/// A value recorded against a keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// The keyword was present without a value.
    Flag,
    Float(f64),
    Int(i64),
    Text(String),
    List(Vec<String>),
    Bag(PropertyBag),
    Table(Table),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bag(&self) -> Option<&PropertyBag> {
        match self {
            PropertyValue::Bag(bag) => Some(bag),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            PropertyValue::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn is_flag(&self) -> bool {
        matches!(self, PropertyValue::Flag)
    }
}

/// The parsed keywords of one method or section, in the order they were first seen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyBag {
    entries: IndexMap<String, PropertyValue>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` under `key`. A repeated key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.entries.insert(key.into(), value);
    }

    /// Case-insensitive lookup; keys are stored upper case.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries
            .get(key)
            .or_else(|| self.entries.get(&key.to_ascii_uppercase()))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PropertyValue> {
        let key = if self.entries.contains_key(key) {
            key.to_string()
        } else {
            key.to_ascii_uppercase()
        };
        self.entries.get_mut(&key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PropertyValue::as_f64)
    }

    pub fn get_table(&self, key: &str) -> Option<&Table> {
        self.get(key).and_then(PropertyValue::as_table)
    }

    pub fn get_bag(&self, key: &str) -> Option<&PropertyBag> {
        self.get(key).and_then(PropertyValue::as_bag)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tables held directly or in nested bags.
    pub fn table_count(&self) -> usize {
        self.entries
            .values()
            .map(|value| match value {
                PropertyValue::Table(_) => 1,
                PropertyValue::Bag(bag) => bag.table_count(),
                _ => 0,
            })
            .sum()
    }

    /// Folds `other` into this bag. Nested bags merge key by key; anything else is replaced.
    pub fn merge(&mut self, other: PropertyBag) {
        for (key, value) in other.entries {
            match (self.entries.get_mut(&key), value) {
                (Some(PropertyValue::Bag(existing)), PropertyValue::Bag(incoming)) => {
                    existing.merge(incoming)
                }
                (_, value) => {
                    self.entries.insert(key, value);
                }
            }
        }
    }
}
