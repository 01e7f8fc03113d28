use anyhow::anyhow;
use axum::http::StatusCode;
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::client::PeerClient;
use super::error::CoordinatorError;
use super::protocol::{
    DeleteRequest, GetRequest, GetResponse, HealthResponse, Origin, PostRequest, PostResponse,
    Reply,
};
use crate::config::NodeConfig;
use crate::node::{NodeId, PhysicalNode};
use crate::quorum::QuorumManager;
use crate::ring::ConsistentHashRouter;
use crate::storage::VersionedStore;
use crate::versioning::{VectorClock, Versioned, now_ms};

/// Handles GET/POST/DELETE for one node: routes each key to its owner,
/// executes locally or forwards, replicates writes to a quorum of peers and
/// reconciles replica copies on reads.
///
/// The ring, store, replica tracker and node clock are owned here and shared
/// by every in-flight request through `&self`.
pub struct Coordinator<C> {
    local_node: PhysicalNode,
    node_id: NodeId,
    nodes: RwLock<Vec<PhysicalNode>>,
    router: RwLock<ConsistentHashRouter<PhysicalNode>>,
    store: VersionedStore<String, String>,
    quorum: QuorumManager,
    clock: Mutex<VectorClock>,
    client: Arc<C>,
    virtual_nodes: usize,
    peer_timeout: Duration,
}

impl<C: PeerClient> Coordinator<C> {
    pub fn new(config: &NodeConfig, client: Arc<C>) -> Self {
        let router = ConsistentHashRouter::new(config.nodes.iter().cloned(), config.virtual_nodes);
        Self {
            node_id: config.local_node.id(),
            local_node: config.local_node.clone(),
            nodes: RwLock::new(config.nodes.clone()),
            router: RwLock::new(router),
            store: VersionedStore::new(),
            quorum: QuorumManager::new(config.replicas),
            clock: Mutex::new(VectorClock::new()),
            client,
            virtual_nodes: config.virtual_nodes,
            peer_timeout: config.peer_timeout,
        }
    }

    pub fn local_node(&self) -> &PhysicalNode {
        &self.local_node
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn store(&self) -> &VersionedStore<String, String> {
        &self.store
    }

    pub fn quorum(&self) -> &QuorumManager {
        &self.quorum
    }

    /// Snapshot of this node's clock.
    pub fn clock(&self) -> VectorClock {
        self.clock.lock().clone()
    }

    pub fn nodes(&self) -> Vec<PhysicalNode> {
        self.nodes.read().clone()
    }

    /// Owner of `key` on the current ring.
    pub fn route(&self, key: &str) -> Option<PhysicalNode> {
        self.router.read().route_node(key).cloned()
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            node: self.local_node.clone(),
            node_id: self.node_id,
            nodes: self.nodes(),
            keys: self.store.len(),
            virtual_nodes: self.router.read().len(),
            read_quorum: self.quorum.read_quorum(),
            write_quorum: self.quorum.write_quorum(),
        }
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Adds `node` to the node list and places its virtual nodes on the ring.
    /// Returns `false` if it was already a member.
    pub fn add_node(&self, node: PhysicalNode) -> bool {
        {
            let mut nodes = self.nodes.write();
            if nodes.contains(&node) {
                return false;
            }
            nodes.push(node.clone());
        }
        self.router.write().add_node(node.clone(), self.virtual_nodes);
        tracing::info!("Node {} joined the ring", node);
        true
    }

    /// Removes `node` from the node list, the ring and every replica set.
    /// Returns `false` if it was not a member.
    ///
    /// Shrinking the cluster below the replication factor is allowed, but
    /// writes and reads then fail until enough nodes are added back.
    pub fn remove_node(&self, node: &PhysicalNode) -> bool {
        let remaining = {
            let mut nodes = self.nodes.write();
            let before = nodes.len();
            nodes.retain(|n| n != node);
            if nodes.len() == before {
                return false;
            }
            nodes.len()
        };
        self.router.write().remove_node(node);
        self.quorum.forget_node(node);
        tracing::info!("Node {} left the ring", node);

        if remaining < self.quorum.replication_factor() {
            tracing::warn!(
                "{} node(s) left, fewer than the replication factor {}; quorum operations will fail",
                remaining,
                self.quorum.replication_factor()
            );
        }
        true
    }

    // ------------------------------------------------------------------
    // GET
    // ------------------------------------------------------------------

    pub async fn get(&self, request: GetRequest, origin: Origin) -> Reply {
        match self.try_get(&request, origin).await {
            Ok(reply) => reply,
            Err(e) => {
                log_failure("GET", &request.key, &e);
                e.into_reply()
            }
        }
    }

    async fn try_get(&self, request: &GetRequest, origin: Origin) -> Result<Reply, CoordinatorError> {
        let key = &request.key;

        if origin == Origin::Replica {
            let version = self.local_version(key)?.ok_or(CoordinatorError::NotFound)?;
            return Ok(Reply::json(
                StatusCode::OK,
                &GetResponse::from_version(key, &version),
            ));
        }

        if let Some(owner) = self.forward_target(key, origin)? {
            tracing::debug!("GET: forwarding key '{}' to owner {}", key, owner);
            return self
                .relay(&owner, self.client.get(&owner, request, Origin::Forwarded))
                .await;
        }

        let local = self.local_version(key)?.ok_or(CoordinatorError::NotFound)?;

        let candidates = self.read_candidates(key);
        let needed = self.quorum.required_read_copies(candidates.len());
        let mut copies: Vec<(PhysicalNode, Versioned<String>)> = Vec::with_capacity(needed);

        for node in candidates {
            if copies.len() >= needed {
                break;
            }
            match self.call(&node, self.client.get(&node, request, Origin::Replica)).await {
                Ok(reply) if reply.status == StatusCode::OK => {
                    match reply.decode::<GetResponse>() {
                        Some(response) => copies.push((node, response.into_version())),
                        None => tracing::warn!("GET: undecodable replica response from {}", node),
                    }
                }
                Ok(reply) => {
                    tracing::debug!("GET: replica {} answered {} for '{}'", node, reply.status, key)
                }
                Err(e) => tracing::warn!("GET: replica {} failed for '{}': {}", node, key, e),
            }
        }

        if copies.len() < needed {
            return Err(CoordinatorError::QuorumUnreachable {
                needed,
                got: copies.len(),
            });
        }

        let version = self.reconcile(key, local, copies).await?;
        Ok(Reply::json(
            StatusCode::OK,
            &GetResponse::from_version(key, &version),
        ))
    }

    /// Replicas to poll for `key`: tracked replicas first, then every other
    /// peer, each group in address order.
    fn read_candidates(&self, key: &str) -> Vec<PhysicalNode> {
        let peers = self.peers();
        let tracked = self.quorum.replicas_of(key);

        let mut candidates: Vec<PhysicalNode> =
            peers.iter().filter(|n| tracked.contains(*n)).cloned().collect();
        sort_nodes(&mut candidates);

        let mut rest: Vec<PhysicalNode> =
            peers.into_iter().filter(|n| !tracked.contains(n)).collect();
        sort_nodes(&mut rest);

        candidates.extend(rest);
        candidates
    }

    /// Picks the answer to a read from the local copy and the replica copies.
    ///
    /// When every copy agrees, their clocks are folded into the node clock.
    /// Otherwise the copy that causally dominates every differing one wins and
    /// stale holders are repaired; without such a copy the read fails.
    async fn reconcile(
        &self,
        key: &str,
        local: Versioned<String>,
        copies: Vec<(PhysicalNode, Versioned<String>)>,
    ) -> Result<Versioned<String>, CoordinatorError> {
        if copies.iter().all(|(_, copy)| copy.data == local.data) {
            let mut clock = self.clock.lock();
            for (_, copy) in &copies {
                clock.combine(&copy.clock);
            }
            return Ok(local);
        }

        let winner = {
            let versions: Vec<&Versioned<String>> = std::iter::once(&local)
                .chain(copies.iter().map(|(_, copy)| copy))
                .collect();
            versions
                .iter()
                .find(|candidate| {
                    versions.iter().all(|other| {
                        other.data == candidate.data || candidate.clock.is_after(&other.clock)
                    })
                })
                .map(|winner| (*winner).clone())
        };

        let Some(winner) = winner else {
            return Err(CoordinatorError::Inconsistent(key.to_string()));
        };

        tracing::info!("GET: read-repair of '{}' to clock {}", key, winner.clock);
        self.repair(key, &winner, &local, &copies).await;
        Ok(winner)
    }

    async fn repair(
        &self,
        key: &str,
        winner: &Versioned<String>,
        local: &Versioned<String>,
        copies: &[(PhysicalNode, Versioned<String>)],
    ) {
        if local.data != winner.data {
            if let Err(e) = self.store.set(key.to_string(), winner.clone()) {
                tracing::warn!("Read-repair of local copy of '{}' rejected: {}", key, e);
            }
        }
        self.clock.lock().combine(&winner.clock);

        let request = PostRequest {
            key: key.to_string(),
            value: winner.data.clone(),
            primary_node: Some(self.node_id),
            clock: Some(winner.clock.clone()),
        };
        for (node, copy) in copies {
            if copy.data == winner.data {
                continue;
            }
            match self.replicate_to(node, &request).await {
                Ok(_) => self.quorum.track_replica(key, node.clone()),
                Err(e) => tracing::warn!("Read-repair of '{}' on {} failed: {}", key, node, e),
            }
        }
    }

    // ------------------------------------------------------------------
    // POST / PUT
    // ------------------------------------------------------------------

    pub async fn post(&self, request: PostRequest, origin: Origin) -> Reply {
        let result = match origin {
            Origin::Replica => self.apply_replica_write(&request),
            Origin::Client | Origin::Forwarded => self.try_post(&request, origin).await,
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                log_failure("POST", &request.key, &e);
                e.into_reply()
            }
        }
    }

    async fn try_post(
        &self,
        request: &PostRequest,
        origin: Origin,
    ) -> Result<Reply, CoordinatorError> {
        if let Some(owner) = self.forward_target(&request.key, origin)? {
            tracing::debug!("POST: forwarding key '{}' to owner {}", request.key, owner);
            return self
                .relay(&owner, self.client.post(&owner, request, Origin::Forwarded))
                .await;
        }
        self.coordinate_write(request).await
    }

    /// Stores a copy sent by a coordinator. No routing and no fan-out.
    fn apply_replica_write(&self, request: &PostRequest) -> Result<Reply, CoordinatorError> {
        let version_clock = match &request.clock {
            Some(clock) => clock.clone(),
            None => {
                let mut clock = self.clock();
                clock.increment(self.node_id, now_ms());
                clock
            }
        };

        let existed = self.store.set(
            request.key.clone(),
            Versioned::new(request.value.clone(), version_clock.clone()),
        )?;

        let node_clock = {
            let mut clock = self.clock.lock();
            clock.increment(self.node_id, now_ms());
            clock.combine(&version_clock);
            clock.clone()
        };

        tracing::debug!(
            "Stored replica of '{}' for {:?} at {}",
            request.key,
            request.primary_node,
            version_clock
        );

        let response = PostResponse {
            clocks: BTreeMap::from([(self.node_id, node_clock)]),
            write_node: self.node_id,
        };
        Ok(Reply::json(write_status(existed), &response))
    }

    async fn coordinate_write(&self, request: &PostRequest) -> Result<Reply, CoordinatorError> {
        let key = &request.key;

        let replica_set = self.select_replicas(key);
        let needed = self.quorum.required_replica_acks();
        if replica_set.len() < needed {
            return Err(CoordinatorError::InsufficientReplicas {
                needed,
                available: replica_set.len(),
            });
        }

        let previous = self.store.get(key);

        let version_clock = {
            let mut clock = self.clock.lock();
            if let Some(context) = &request.clock {
                clock.combine(context);
            }
            clock.increment(self.node_id, now_ms());
            clock.clone()
        };

        let existed = match self.store.set(
            key.clone(),
            Versioned::new(request.value.clone(), version_clock.clone()),
        ) {
            Ok(existed) => existed,
            Err(e) => {
                self.clock.lock().decrement(self.node_id, now_ms());
                return Err(e.into());
            }
        };

        let replica_request = PostRequest {
            key: key.clone(),
            value: request.value.clone(),
            primary_node: Some(self.node_id),
            clock: Some(version_clock.clone()),
        };

        let mut clocks: BTreeMap<NodeId, VectorClock> = BTreeMap::new();
        let mut accumulated = VectorClock::new();
        let mut confirmed: Vec<PhysicalNode> = Vec::with_capacity(replica_set.len());

        for node in replica_set {
            match self.replicate_to(&node, &replica_request).await {
                Ok(response) => {
                    self.quorum.track_replica(key, node.clone());
                    let replica_clock = response
                        .clocks
                        .get(&response.write_node)
                        .cloned()
                        .unwrap_or_default();
                    accumulated.combine(&replica_clock);
                    clocks.insert(response.write_node, replica_clock);
                    confirmed.push(node);
                }
                Err(e) => {
                    self.roll_back_write(key, &version_clock, previous, &confirmed)
                        .await;
                    return Err(e);
                }
            }
        }

        let node_clock = {
            let mut clock = self.clock.lock();
            clock.combine(&accumulated);
            clock.clone()
        };
        clocks.insert(self.node_id, node_clock);

        tracing::info!(
            "POST: '{}' committed at {} on {} replica(s)",
            key,
            version_clock,
            confirmed.len()
        );

        let response = PostResponse {
            clocks,
            write_node: self.node_id,
        };
        Ok(Reply::json(write_status(existed), &response))
    }

    /// Replica set for a write: the key's tracked replicas, topped up with
    /// randomly chosen peers to the quorum's replica set size.
    fn select_replicas(&self, key: &str) -> Vec<PhysicalNode> {
        let size = self.quorum.replica_set_size();
        let peers = self.peers();
        let tracked = self.quorum.replicas_of(key);

        let mut selected: Vec<PhysicalNode> =
            peers.iter().filter(|n| tracked.contains(*n)).cloned().collect();
        sort_nodes(&mut selected);

        if selected.len() < size {
            let fresh: Vec<PhysicalNode> =
                peers.into_iter().filter(|n| !tracked.contains(n)).collect();
            let mut rng = rand::thread_rng();
            selected.extend(
                fresh
                    .choose_multiple(&mut rng, size - selected.len())
                    .cloned(),
            );
        }

        selected
    }

    async fn replicate_to(
        &self,
        node: &PhysicalNode,
        request: &PostRequest,
    ) -> Result<PostResponse, CoordinatorError> {
        let failure = |reason: String| CoordinatorError::ReplicationFailure {
            node: node.clone(),
            reason,
        };

        let reply = self
            .call(node, self.client.post(node, request, Origin::Replica))
            .await
            .map_err(|e| failure(e.to_string()))?;

        if reply.status != StatusCode::OK && reply.status != StatusCode::CREATED {
            return Err(failure(format!("replica answered {}", reply.status)));
        }

        reply
            .decode::<PostResponse>()
            .ok_or_else(|| failure("undecodable replica response".to_string()))
    }

    /// Compensates a write whose replication failed. Best effort: a replica
    /// that misses its delete keeps the copy until it is overwritten.
    async fn roll_back_write(
        &self,
        key: &str,
        written: &VectorClock,
        previous: Vec<Versioned<String>>,
        confirmed: &[PhysicalNode],
    ) {
        tracing::warn!(
            "POST: rolling back '{}' ({} replica(s) to compensate)",
            key,
            confirmed.len()
        );

        let request = DeleteRequest {
            key: key.to_string(),
            clock: None,
        };
        for node in confirmed {
            match self.call(node, self.client.delete(node, &request, Origin::Replica)).await {
                Ok(reply) if reply.is_success() || reply.status == StatusCode::NOT_FOUND => {}
                Ok(reply) => {
                    tracing::warn!("Compensating delete on {} answered {}", node, reply.status)
                }
                Err(e) => tracing::warn!("Compensating delete on {} failed: {}", node, e),
            }
        }

        self.quorum.untrack(key);
        self.clock.lock().decrement(self.node_id, now_ms());
        self.store.revert(key.to_string(), written, previous);
    }

    // ------------------------------------------------------------------
    // DELETE
    // ------------------------------------------------------------------

    pub async fn delete(&self, request: DeleteRequest, origin: Origin) -> Reply {
        match self.try_delete(&request, origin).await {
            Ok(reply) => reply,
            Err(e) => {
                log_failure("DELETE", &request.key, &e);
                e.into_reply()
            }
        }
    }

    async fn try_delete(
        &self,
        request: &DeleteRequest,
        origin: Origin,
    ) -> Result<Reply, CoordinatorError> {
        let key = &request.key;

        if let Some(owner) = self.forward_target(key, origin)? {
            tracing::debug!("DELETE: forwarding key '{}' to owner {}", key, owner);
            return self
                .relay(&owner, self.client.delete(&owner, request, Origin::Forwarded))
                .await;
        }

        if !self.store.contains(key) {
            return Err(CoordinatorError::NotFound);
        }
        self.store.delete(key, request.clock.as_ref());

        if origin != Origin::Replica {
            self.fan_out_delete(request).await;
        }

        Ok(Reply::empty(StatusCode::NO_CONTENT))
    }

    /// Deletes the key on every tracked replica. Failures are logged, not
    /// retried.
    async fn fan_out_delete(&self, request: &DeleteRequest) {
        let mut replicas: Vec<PhysicalNode> =
            self.quorum.replicas_of(&request.key).into_iter().collect();
        sort_nodes(&mut replicas);

        for node in replicas {
            match self.call(&node, self.client.delete(&node, request, Origin::Replica)).await {
                Ok(reply) if reply.is_success() || reply.status == StatusCode::NOT_FOUND => {}
                Ok(reply) => tracing::warn!(
                    "DELETE: replica {} answered {} for '{}'",
                    node,
                    reply.status,
                    request.key
                ),
                Err(e) => tracing::warn!(
                    "DELETE: replica {} failed for '{}': {}",
                    node,
                    request.key,
                    e
                ),
            }
        }

        self.quorum.untrack(&request.key);
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Owner to forward a client request to, or `None` when this node should
    /// execute it. Forwarded and replica requests are never routed again.
    fn forward_target(
        &self,
        key: &str,
        origin: Origin,
    ) -> Result<Option<PhysicalNode>, CoordinatorError> {
        if origin != Origin::Client {
            return Ok(None);
        }
        let owner = self.route(key).ok_or(CoordinatorError::NoRoute)?;
        Ok((owner != self.local_node).then_some(owner))
    }

    fn peers(&self) -> Vec<PhysicalNode> {
        self.nodes
            .read()
            .iter()
            .filter(|n| **n != self.local_node)
            .cloned()
            .collect()
    }

    /// The key's siblings collapsed into one version. Siblings carrying
    /// different values cannot be collapsed and make the key inconsistent.
    fn local_version(&self, key: &str) -> Result<Option<Versioned<String>>, CoordinatorError> {
        let siblings = self.store.get(&key.to_string());
        let Some(first) = siblings.first() else {
            return Ok(None);
        };

        if siblings.iter().any(|s| s.data != first.data) {
            return Err(CoordinatorError::Inconsistent(key.to_string()));
        }

        let clock = siblings
            .iter()
            .skip(1)
            .fold(first.clock.clone(), |acc, s| acc.merge(&s.clock));
        Ok(Some(Versioned::new(first.data.clone(), clock)))
    }

    /// Bounds one peer call by the configured timeout.
    async fn call<F>(&self, node: &PhysicalNode, request: F) -> anyhow::Result<Reply>
    where
        F: Future<Output = anyhow::Result<Reply>>,
    {
        match tokio::time::timeout(self.peer_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "request to {} timed out after {:?}",
                node,
                self.peer_timeout
            )),
        }
    }

    /// Forwards once to the owner and hands its answer back unchanged.
    async fn relay<F>(&self, owner: &PhysicalNode, request: F) -> Result<Reply, CoordinatorError>
    where
        F: Future<Output = anyhow::Result<Reply>>,
    {
        self.call(owner, request)
            .await
            .map_err(|e| CoordinatorError::PeerUnreachable {
                node: owner.clone(),
                reason: e.to_string(),
            })
    }
}

fn write_status(existed: bool) -> StatusCode {
    if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    }
}

fn sort_nodes(nodes: &mut [PhysicalNode]) {
    nodes.sort_by(|a, b| (&a.host, a.port).cmp(&(&b.host, b.port)));
}

fn log_failure(method: &str, key: &str, error: &CoordinatorError) {
    match error {
        CoordinatorError::NotFound => tracing::debug!("{} '{}': {}", method, key, error),
        _ => tracing::warn!("{} '{}' failed: {}", method, key, error),
    }
}
