use serde::{Deserialize, Serialize};

/// Single key/value entry read from the configuration store.
///
/// Values are raw bytes; the store does not guarantee UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvPair {
    key: String,
    value: Vec<u8>,
}

impl KvPair {
    /// Create a new pair.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Full key path, including the namespace prefix.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Raw value bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Value decoded as UTF-8, replacing invalid sequences.
    pub fn value_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }

    /// Returns `true` for folder placeholders (`"a/b/"`).
    pub fn is_folder(&self) -> bool {
        self.key.ends_with('/')
    }
}

impl From<(&str, &str)> for KvPair {
    fn from((key, value): (&str, &str)) -> Self {
        Self::new(key, value.as_bytes())
    }
}

/// State of a namespace as of a store change index.
///
/// Pairs keep the order returned by the store. A snapshot is consumed once and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvSnapshot {
    pairs: Vec<KvPair>,
    index: u64,
}

impl KvSnapshot {
    /// Create a snapshot from ordered pairs and the store index they were read at.
    pub fn new(pairs: Vec<KvPair>, index: u64) -> Self {
        Self { pairs, index }
    }

    /// Change index the snapshot was read at.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Ordered pairs.
    pub fn pairs(&self) -> &[KvPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KvPair> {
        self.pairs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_lossy_replaces_invalid_utf8() {
        let kv = KvPair::new("app/KEY", vec![b'o', b'k', 0xff]);
        assert_eq!(kv.value_lossy(), "ok\u{fffd}");
    }

    #[test]
    fn folder_keys_are_detected() {
        assert!(KvPair::new("app/dir/", Vec::new()).is_folder());
        assert!(!KvPair::new("app/dir/KEY", Vec::new()).is_folder());
    }

    #[test]
    fn snapshot_keeps_store_order_and_index() {
        let snap = KvSnapshot::new(
            vec![("app/B", "2").into(), ("app/A", "1").into()],
            42,
        );
        let keys: Vec<_> = snap.iter().map(|kv| kv.key()).collect();
        assert_eq!(keys, ["app/B", "app/A"]);
        assert_eq!(snap.index(), 42);
        assert_eq!(snap.len(), 2);
    }
}
