//! Ordered option storage for one section.
//!
//! Keys keep their first-insertion position; replacing a value never moves it.
//! Multiplicity is a `Value::List` under a single key, never duplicate keys.

/// A stored option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Single(String),
    List(Vec<String>),
}

impl Value {
    /// Values as rendered lines, one per list element.
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Value::Single(value) => vec![value.as_str()],
            Value::List(values) => values.iter().map(String::as_str).collect(),
        }
    }

    fn into_list(self) -> Vec<String> {
        match self {
            Value::Single(value) => vec![value],
            Value::List(values) => values,
        }
    }
}

/// Ordered mapping from option key to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionStore {
    entries: Vec<(String, Value)>,
}

impl OptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|pos| &self.entries[pos].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Keys in emission order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Set `key` to `value`, keeping the key's position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.position(&key) {
            Some(pos) => self.entries[pos].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove `key`; absent keys are ignored.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|pos| self.entries.remove(pos).1)
    }

    /// Append `values` to the list under `key`, creating it if absent.
    ///
    /// A single value already stored under `key` becomes the list's first element.
    pub fn extend_list(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        match self.position(&key) {
            Some(pos) => {
                let slot = &mut self.entries[pos].1;
                let current = std::mem::replace(slot, Value::List(Vec::new()));
                let mut list = current.into_list();
                list.extend(values);
                *slot = Value::List(list);
            }
            None => self.entries.push((key, Value::List(values))),
        }
    }

    /// Re-insert `key` at `position` among the other entries.
    ///
    /// The existing entry for `key` is taken out first. When both the existing and
    /// the new value are lists they are concatenated, otherwise the new value wins.
    /// Positions at or past the end append. Other entries keep their relative order.
    pub fn insert_at(&mut self, key: impl Into<String>, value: Value, position: usize) {
        let key = key.into();
        let value = match (self.remove(&key), value) {
            (Some(Value::List(mut existing)), Value::List(new)) => {
                existing.extend(new);
                Value::List(existing)
            }
            (_, value) => value,
        };
        let position = position.min(self.entries.len());
        self.entries.insert(position, (key, value));
    }

    /// Merge `other` into this store, replacing values of shared keys in place.
    pub fn merge(&mut self, other: &OptionStore) {
        for (key, value) in other.iter() {
            self.insert(key, value.clone());
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(existing, _)| existing == key)
    }
}
