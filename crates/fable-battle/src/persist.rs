//! Persistence contract.
//!
//! The battle core never writes files. It hands JSON values to a
//! [`Persistence`] implementation keyed by dotted paths such as
//! `team.members`, `team.hero.ada` or `enemies.enemy.slime.defeated`.

use ahash::AHashMap;
use serde_json::Value;
use tracing::debug;

/// Receiver of state-change intents.
pub trait Persistence {
    /// Merges `value` into whatever is stored at `path`.
    ///
    /// Objects merge key by key; any other value replaces the stored one.
    fn merge_by_ref(&mut self, path: &str, value: Value);

    /// Value currently stored at `path`.
    fn get(&self, path: &str) -> Option<&Value>;
}

/// In-memory store keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: AHashMap<String, Value>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whole store as one JSON object, for dumping.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut sorted: Vec<(&String, &Value)> = self.entries.iter().collect();
        sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));
        Value::Object(
            sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl Persistence for MemoryStore {
    fn merge_by_ref(&mut self, path: &str, value: Value) {
        debug!("Persist {path}");
        match (self.entries.get_mut(path), value) {
            (Some(Value::Object(stored)), Value::Object(incoming)) => {
                stored.extend(incoming);
            },
            (_, value) => {
                self.entries.insert(path.to_owned(), value);
            },
        }
    }

    fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_objects_merge_key_by_key() {
        let mut store = MemoryStore::new();
        store.merge_by_ref("team.hero.ada", json!({"level": 3, "damage": 2}));
        store.merge_by_ref("team.hero.ada", json!({"damage": 0}));
        assert_eq!(
            store.get("team.hero.ada"),
            Some(&json!({"level": 3, "damage": 0}))
        );
    }

    #[test]
    fn test_scalars_replace() {
        let mut store = MemoryStore::new();
        store.merge_by_ref("enemies.enemy.slime.defeated", json!(false));
        store.merge_by_ref("enemies.enemy.slime.defeated", json!(true));
        assert_eq!(store.get("enemies.enemy.slime.defeated"), Some(&json!(true)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_dump_is_sorted() {
        let mut store = MemoryStore::new();
        store.merge_by_ref("b", json!(1));
        store.merge_by_ref("a", json!(2));
        let dumped = store.to_json().to_string();
        assert!(dumped.find("\"a\"") < dumped.find("\"b\""));
        assert_eq!(store.to_json(), json!({"a": 2, "b": 1}));
    }
}
