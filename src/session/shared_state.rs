use std::collections::HashMap;

/// Local mirror of the session-wide key-value cells.
///
/// Upstream broadcasts are authoritative, so every write is last-write-wins
/// and `None` deletes the key.
#[derive(Debug, Default, Clone)]
pub struct SharedStore {
    values: HashMap<String, String>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the stored value changed.
    pub fn set(&mut self, key: impl Into<String>, value: Option<String>) -> bool {
        let key = key.into();
        match value {
            Some(value) => self.values.insert(key, value.clone()).as_ref() != Some(&value),
            None => self.values.remove(&key).is_some(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut store = SharedStore::new();
        assert!(store.set("spotlight", Some("a".into())));
        assert!(store.set("spotlight", Some("b".into())));
        assert!(!store.set("spotlight", Some("b".into())));
        assert_eq!(store.get("spotlight"), Some("b"));
    }

    #[test]
    fn none_deletes() {
        let mut store = SharedStore::new();
        store.set("spotlight", Some("a".into()));
        assert!(store.set("spotlight", None));
        assert!(!store.set("spotlight", None));
        assert!(store.is_empty());
    }
}
