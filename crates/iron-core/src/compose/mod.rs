//! Snapshot → environment composition.
//!
//! A key `<prefix>/<rest>` becomes the variable `<rest>` after optional sanitizing
//! (every char outside `[A-Za-z0-9_]` turns into `_`) and upcasing, applied in that order.
//! Folder placeholders, keys outside the prefix and the metadata subtree are skipped.
use iron_model::{EnvMap, KvSnapshot, METADATA_SEGMENT};
use tracing::{debug, trace};

/// Key normalization options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    pub sanitize: bool,
    pub upcase: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            sanitize: true,
            upcase: true,
        }
    }
}

/// Result of a composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composed {
    /// The candidate map differs from the previous one.
    Changed(EnvMap),
    /// Structurally equal to the previous map; nothing to apply.
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct EnvironmentComposer {
    prefix: String,
    options: ComposeOptions,
}

impl EnvironmentComposer {
    pub fn new(prefix: impl AsRef<str>, options: ComposeOptions) -> Self {
        Self {
            prefix: prefix.as_ref().trim_end_matches('/').to_string(),
            options,
        }
    }

    pub fn options(&self) -> ComposeOptions {
        self.options
    }

    /// Build the candidate map and compare it with `previous`.
    ///
    /// With no previous map the result is always [`Composed::Changed`], even when empty.
    pub fn compose(&self, snapshot: &KvSnapshot, previous: Option<&EnvMap>) -> Composed {
        let candidate = self.build(snapshot);
        match previous {
            Some(prev) if *prev == candidate => {
                trace!(index = snapshot.index(), "composed environment unchanged");
                Composed::Unchanged
            }
            Some(prev) => {
                let changed: Vec<&str> = candidate.changed_keys(prev).collect();
                let removed = prev.iter().filter(|(k, _)| candidate.get(k).is_none()).count();
                debug!(index = snapshot.index(), changed = ?changed, removed, "composed environment changed");
                Composed::Changed(candidate)
            }
            None => Composed::Changed(candidate),
        }
    }

    /// Candidate map for a snapshot, without comparing.
    pub fn build(&self, snapshot: &KvSnapshot) -> EnvMap {
        snapshot
            .iter()
            .filter(|kv| !kv.is_folder())
            .filter_map(|kv| {
                let rel = self.relative(kv.key())?;
                Some((self.normalize(rel), kv.value_lossy()))
            })
            .collect()
    }

    /// Key relative to the prefix, or `None` if it must not become a variable.
    fn relative<'k>(&self, key: &'k str) -> Option<&'k str> {
        let rest = key.strip_prefix(self.prefix.as_str())?;
        // `app2/X` must not match prefix `app`.
        if !self.prefix.is_empty() && !rest.starts_with('/') {
            return None;
        }
        let rel = rest.trim_start_matches('/');
        if rel.is_empty() || is_metadata(rel) {
            return None;
        }
        Some(rel)
    }

    /// Apply sanitize then upcase to a relative key.
    pub fn normalize(&self, rel: &str) -> String {
        let name: String = if self.options.sanitize {
            rel.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
                .collect()
        } else {
            rel.to_string()
        };
        if self.options.upcase {
            name.to_uppercase()
        } else {
            name
        }
    }
}

fn is_metadata(rel: &str) -> bool {
    rel.strip_prefix(METADATA_SEGMENT)
        .is_some_and(|rest| rest.starts_with('/'))
}
