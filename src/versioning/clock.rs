use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::node::NodeId;

/// Result of comparing two vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOrdering {
    /// Every counter is `<=` the other's and at least one is smaller.
    Before,
    /// Every counter is `>=` the other's and at least one is larger.
    After,
    /// Identical counters, or no causal relation at all.
    ConcurrentOrEqual,
}

/// Per-node logical counters plus the wall-clock time of the last update.
///
/// Only the counters take part in ordering, equality and the wire encoding.
/// A slot whose counter is zero is the same as an absent slot and is never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "BTreeMap<NodeId, u64>", into = "BTreeMap<NodeId, u64>")]
pub struct VectorClock {
    versions: BTreeMap<NodeId, u64>,
    timestamp: u64,
}

impl VectorClock {
    pub fn new() -> Self {
        Self::from_versions(BTreeMap::new(), now_ms())
    }

    pub fn from_versions(versions: BTreeMap<NodeId, u64>, timestamp: u64) -> Self {
        let versions = versions.into_iter().filter(|(_, v)| *v > 0).collect();
        Self {
            versions,
            timestamp,
        }
    }

    /// Counter for `node`, 0 when absent.
    pub fn get(&self, node: NodeId) -> u64 {
        self.versions.get(&node).copied().unwrap_or(0)
    }

    pub fn versions(&self) -> &BTreeMap<NodeId, u64> {
        &self.versions
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn increment(&mut self, node: NodeId, now: u64) -> &mut Self {
        *self.versions.entry(node).or_insert(0) += 1;
        self.timestamp = now;
        self
    }

    /// Undoes one provisional [`increment`](Self::increment) on `node`.
    ///
    /// Compensating action only, not a causal event. Never goes below zero.
    pub fn decrement(&mut self, node: NodeId, now: u64) -> &mut Self {
        if let Some(counter) = self.versions.get_mut(&node) {
            if *counter > 1 {
                *counter -= 1;
            } else {
                self.versions.remove(&node);
            }
        }
        self.timestamp = now;
        self
    }

    /// Pointwise maximum of both clocks. Neither input is modified.
    pub fn merge(&self, other: &VectorClock) -> VectorClock {
        let mut merged = self.clone();
        merged.combine(other);
        merged
    }

    /// In-place [`merge`](Self::merge).
    pub fn combine(&mut self, other: &VectorClock) -> &mut Self {
        for (node, &theirs) in &other.versions {
            let mine = self.versions.entry(*node).or_insert(0);
            *mine = (*mine).max(theirs);
        }
        self.timestamp = self.timestamp.max(now_ms());
        self
    }

    pub fn compare(&self, other: &VectorClock) -> ClockOrdering {
        let mut is_greater = false;
        let mut is_smaller = false;

        for (node, &mine) in &self.versions {
            let theirs = other.get(*node);
            if mine > theirs {
                is_greater = true;
            } else if theirs > mine {
                is_smaller = true;
            }
            if is_greater && is_smaller {
                return ClockOrdering::ConcurrentOrEqual;
            }
        }
        if other
            .versions
            .keys()
            .any(|node| !self.versions.contains_key(node))
        {
            is_smaller = true;
        }

        match (is_greater, is_smaller) {
            (true, false) => ClockOrdering::After,
            (false, true) => ClockOrdering::Before,
            _ => ClockOrdering::ConcurrentOrEqual,
        }
    }

    pub fn is_before(&self, other: &VectorClock) -> bool {
        self.compare(other) == ClockOrdering::Before
    }

    pub fn is_after(&self, other: &VectorClock) -> bool {
        self.compare(other) == ClockOrdering::After
    }

    /// True when both clocks hold identical counters, which separates equality
    /// from concurrency inside [`ClockOrdering::ConcurrentOrEqual`].
    pub fn same_versions(&self, other: &VectorClock) -> bool {
        self.versions == other.versions
    }
}

impl Default for VectorClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for VectorClock {
    fn eq(&self, other: &Self) -> bool {
        self.same_versions(other)
    }
}

impl Eq for VectorClock {}

impl From<BTreeMap<NodeId, u64>> for VectorClock {
    fn from(versions: BTreeMap<NodeId, u64>) -> Self {
        Self::from_versions(versions, now_ms())
    }
}

impl From<VectorClock> for BTreeMap<NodeId, u64> {
    fn from(clock: VectorClock) -> Self {
        clock.versions
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (node, counter)) in self.versions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", node, counter)?;
        }
        write!(f, "}}")
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
