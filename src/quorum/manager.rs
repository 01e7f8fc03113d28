use dashmap::DashMap;
use std::collections::HashSet;

use crate::node::PhysicalNode;

pub struct QuorumManager {
    replication_factor: usize,
    read_quorum: usize,
    write_quorum: usize,
    replica_tracker: DashMap<String, HashSet<PhysicalNode>>,
}

impl QuorumManager {
    pub fn new(replication_factor: usize) -> Self {
        let read_quorum = (replication_factor / 2).max(1);
        let write_quorum = replication_factor + 1 - read_quorum;
        Self {
            replication_factor,
            read_quorum,
            write_quorum,
            replica_tracker: DashMap::new(),
        }
    }

    pub fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    pub fn read_quorum(&self) -> usize {
        self.read_quorum
    }

    pub fn write_quorum(&self) -> usize {
        self.write_quorum
    }

    /// Number of peers a coordinator writes to besides itself.
    pub fn replica_set_size(&self) -> usize {
        self.write_quorum.saturating_sub(1).max(1)
    }

    /// Peers that must confirm a write besides the coordinator. A write that
    /// cannot reach this many peers is refused.
    pub fn required_replica_acks(&self) -> usize {
        self.write_quorum.saturating_sub(1)
    }

    /// Replica copies a read must collect when `available` peers can be
    /// polled. With a single replica the coordinator's own copy is the
    /// quorum, so any available peers are polled best effort.
    pub fn required_read_copies(&self, available: usize) -> usize {
        if self.replication_factor <= 1 {
            self.read_quorum.min(available)
        } else {
            self.read_quorum
        }
    }

    pub fn track_replica(&self, key: &str, node: PhysicalNode) {
        self.replica_tracker
            .entry(key.to_string())
            .or_default()
            .insert(node);
    }

    /// Nodes confirmed to hold a copy of `key`.
    pub fn replicas_of(&self, key: &str) -> HashSet<PhysicalNode> {
        self.replica_tracker
            .get(key)
            .map(|nodes| nodes.value().clone())
            .unwrap_or_default()
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.replica_tracker.contains_key(key)
    }

    pub fn untrack(&self, key: &str) {
        self.replica_tracker.remove(key);
    }

    /// Drops `node` from every key's replica set, e.g. after it leaves the
    /// cluster.
    pub fn forget_node(&self, node: &PhysicalNode) {
        self.replica_tracker.retain(|_, nodes| {
            nodes.remove(node);
            !nodes.is_empty()
        });
    }
}
