//! Parameter bindings for ad-hoc queries.

use super::EntityId;
use rusqlite::types::Value;
use std::collections::{BTreeMap, HashMap};

/// Exactly one binding style for one query execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    /// No substitution is attempted.
    #[default]
    None,
    /// Bound by name; keys are unique.
    Named(BTreeMap<String, Value>),
    /// Bound by zero-based position.
    Positional(Vec<Value>),
}

impl Params {
    /// Builds a named binding from `(key, value)` pairs.
    ///
    /// A repeated key keeps the last value.
    pub fn named<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: IntoParam,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into_param()))
                .collect(),
        )
    }

    /// Builds a positional binding; element `i` binds placeholder `i`.
    pub fn positional<V, I>(values: I) -> Self
    where
        V: IntoParam,
        I: IntoIterator<Item = V>,
    {
        Self::Positional(values.into_iter().map(IntoParam::into_param).collect())
    }

    /// Returns whether this binding substitutes nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Named(map) => map.is_empty(),
            Self::Positional(values) => values.is_empty(),
        }
    }
}

impl<V: IntoParam> From<Vec<V>> for Params {
    fn from(value: Vec<V>) -> Self {
        Self::positional(value)
    }
}

impl<V: IntoParam, const N: usize> From<[V; N]> for Params {
    fn from(value: [V; N]) -> Self {
        Self::positional(value)
    }
}

impl From<&[Value]> for Params {
    fn from(value: &[Value]) -> Self {
        Self::Positional(value.to_vec())
    }
}

impl From<BTreeMap<String, Value>> for Params {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self::Named(value)
    }
}

impl From<HashMap<String, Value>> for Params {
    fn from(value: HashMap<String, Value>) -> Self {
        Self::Named(value.into_iter().collect())
    }
}

/// Conversion into a bindable SQLite value.
pub trait IntoParam {
    fn into_param(self) -> Value;
}

impl IntoParam for Value {
    fn into_param(self) -> Value {
        self
    }
}

impl IntoParam for &str {
    fn into_param(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoParam for String {
    fn into_param(self) -> Value {
        Value::Text(self)
    }
}

impl IntoParam for &String {
    fn into_param(self) -> Value {
        Value::Text(self.clone())
    }
}

impl IntoParam for i64 {
    fn into_param(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoParam for i32 {
    fn into_param(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoParam for u32 {
    fn into_param(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoParam for bool {
    fn into_param(self) -> Value {
        Value::Integer(if self { 1 } else { 0 })
    }
}

impl IntoParam for f64 {
    fn into_param(self) -> Value {
        Value::Real(self)
    }
}

impl IntoParam for EntityId {
    fn into_param(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl<T: IntoParam> IntoParam for Option<T> {
    fn into_param(self) -> Value {
        self.map_or(Value::Null, IntoParam::into_param)
    }
}

#[cfg(test)]
mod tests {
    use super::{IntoParam, Params};
    use rusqlite::types::Value;
    use uuid::Uuid;

    #[test]
    fn named_keeps_last_value_for_repeated_key() {
        let params = Params::named([("role", "a"), ("role", "b")]);
        match params {
            Params::Named(map) => {
                assert_eq!(map.len(), 1);
                assert_eq!(map.get("role"), Some(&Value::Text("b".to_string())));
            }
            other => panic!("unexpected binding: {other:?}"),
        }
    }

    #[test]
    fn empty_bindings_substitute_nothing() {
        assert!(Params::None.is_empty());
        assert!(Params::positional(Vec::<i64>::new()).is_empty());
        assert!(!Params::positional([1_i64]).is_empty());
    }

    #[test]
    fn converts_common_values() {
        let id = Uuid::new_v4();
        assert_eq!(id.into_param(), Value::Text(id.to_string()));
        assert_eq!(true.into_param(), Value::Integer(1));
        assert_eq!(None::<&str>.into_param(), Value::Null);
    }
}
