use std::collections::BTreeMap;

use crate::value::Value;

/// The full set of named bindings carried between invocations.
///
/// Backed by an ordered map so iteration (and therefore the persisted record
/// order) is deterministic. Names are unique; re-binding overwrites.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Environment {
    bindings: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_overwrite() {
        let mut env = Environment::new();
        assert!(env.is_empty());
        env.set("x", Value::Int(5));
        assert_eq!(env.get("x"), Some(&Value::Int(5)));
        env.set("x", Value::Str("five".into()));
        assert_eq!(env.get("x"), Some(&Value::Str("five".into())));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn remove_returns_old_binding() {
        let mut env = Environment::new();
        env.set("x", Value::Bool(true));
        assert_eq!(env.remove("x"), Some(Value::Bool(true)));
        assert_eq!(env.remove("x"), None);
        assert!(!env.contains("x"));
    }

    #[test]
    fn iteration_is_name_ordered() {
        let mut env = Environment::new();
        env.set("b", Value::Int(2));
        env.set("a", Value::Int(1));
        let names: Vec<_> = env.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
