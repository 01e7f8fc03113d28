use dashmap::DashMap;
use std::fmt::Display;
use std::hash::Hash;

use crate::versioning::{VectorClock, Versioned};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("obsolete version for key '{key}': {clock}")]
    ObsoleteVersion { key: String, clock: VectorClock },
}

/// In-memory map from key to the list of causally unordered versions
/// (siblings) of its value.
///
/// Mutations of one key run under that key's map entry lock, so two writes to
/// the same key never interleave.
pub struct VersionedStore<K, V> {
    local_data: DashMap<K, Vec<Versioned<V>>>,
}

impl<K, V> VersionedStore<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            local_data: DashMap::new(),
        }
    }

    /// Current siblings of `key`; empty when the key is absent.
    pub fn get(&self, key: &K) -> Vec<Versioned<V>> {
        self.local_data
            .get(key)
            .map(|siblings| siblings.value().clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.local_data
            .get(key)
            .map(|siblings| !siblings.is_empty())
            .unwrap_or(false)
    }

    /// Stores `value` unless a stored sibling is strictly newer.
    ///
    /// Siblings strictly older than `value`, or carrying identical counters,
    /// are replaced; concurrent ones are kept. Returns whether the key held
    /// any version before the write.
    pub fn set(&self, key: K, value: Versioned<V>) -> Result<bool, StoreError> {
        let mut entry = self.local_data.entry(key).or_default();
        let existed = !entry.is_empty();

        if entry.iter().any(|stored| stored.clock.is_after(&value.clock)) {
            return Err(StoreError::ObsoleteVersion {
                key: entry.key().to_string(),
                clock: value.clock,
            });
        }

        entry.retain(|stored| {
            !stored.clock.is_before(&value.clock) && !stored.clock.same_versions(&value.clock)
        });
        entry.push(value);

        Ok(existed)
    }

    /// Without a clock, removes the key. With a clock, removes only the
    /// siblings strictly older than it and drops the key once none remain.
    /// Returns whether anything was removed.
    pub fn delete(&self, key: &K, clock: Option<&VectorClock>) -> bool {
        let Some(clock) = clock else {
            return self.local_data.remove(key).is_some();
        };

        let mut deleted = false;
        if let Some(mut siblings) = self.local_data.get_mut(key) {
            let before = siblings.len();
            siblings.retain(|stored| !stored.clock.is_before(clock));
            deleted = siblings.len() != before;
        }
        self.local_data.remove_if(key, |_, siblings| siblings.is_empty());

        deleted
    }

    /// Undoes a local write: drops the sibling written with `written` and
    /// puts back the siblings the key held before it.
    pub fn revert(&self, key: K, written: &VectorClock, previous: Vec<Versioned<V>>) {
        let mut entry = self.local_data.entry(key.clone()).or_default();
        entry.retain(|stored| !stored.clock.same_versions(written));

        for old in previous {
            let superseded = entry.iter().any(|stored| {
                stored.clock.is_after(&old.clock) || stored.clock.same_versions(&old.clock)
            });
            if superseded {
                continue;
            }
            entry.retain(|stored| !stored.clock.is_before(&old.clock));
            entry.push(old);
        }
        drop(entry);

        self.local_data.remove_if(&key, |_, siblings| siblings.is_empty());
    }

    /// Number of keys holding at least one version.
    pub fn len(&self) -> usize {
        self.local_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local_data.is_empty()
    }

    pub fn keys(&self) -> Vec<K> {
        self.local_data
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl<K, V> Default for VersionedStore<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
