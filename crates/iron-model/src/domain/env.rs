use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Environment variables composed from a configuration snapshot.
///
/// Keys are unique and ordering is irrelevant, so equality is a plain structural comparison.
/// The orchestrator replaces the map wholesale on every applied change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvMap(BTreeMap<String, String>);

impl EnvMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert a variable; a later insert of the same name wins.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<String>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Names present in `self` whose value differs from (or is missing in) `other`.
    pub fn changed_keys<'a>(&'a self, other: &'a EnvMap) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, v)| other.0.get(*k) != Some(*v))
            .map(|(k, _)| k.as_str())
    }
}

impl<K, V> FromIterator<(K, V)> for EnvMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::EnvMap;

    #[test]
    fn equality_ignores_insertion_order() {
        let a: EnvMap = [("A", "1"), ("B", "2")].into_iter().collect();
        let b: EnvMap = [("B", "2"), ("A", "1")].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn insert_overrides_previous_value() {
        let mut env = EnvMap::new();
        env.insert("FOO", "one");
        assert_eq!(env.insert("FOO", "two").as_deref(), Some("one"));
        assert_eq!(env.get("FOO"), Some("two"));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn changed_keys_reports_new_and_modified() {
        let old: EnvMap = [("A", "1"), ("B", "2")].into_iter().collect();
        let new: EnvMap = [("A", "1"), ("B", "3"), ("C", "4")].into_iter().collect();
        let changed: Vec<_> = new.changed_keys(&old).collect();
        assert_eq!(changed, ["B", "C"]);
    }

    #[test]
    fn serializes_as_plain_object() {
        let env: EnvMap = [("FOO", "bar")].into_iter().collect();
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"{"FOO":"bar"}"#);
    }
}
