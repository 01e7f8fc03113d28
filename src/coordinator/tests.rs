//! Coordinator Module Tests
//!
//! Runs whole clusters in one process: every node is a `Coordinator` wired to
//! the others through `LoopbackClient`, which can take nodes down or make
//! their replica writes fail or hang.

#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow, bail};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use dashmap::DashMap;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::{Arc, Weak};
    use std::time::Duration;

    use crate::config::NodeConfig;
    use crate::coordinator::client::PeerClient;
    use crate::coordinator::protocol::{
        DeleteRequest, ERR_INCONSISTENT, ERR_NO_ROUTE, ERR_NOT_FOUND, ERR_OBSOLETE_VERSION,
        ERR_PEER_UNREACHABLE, ErrorResponse, GetRequest, GetResponse, Origin, PostRequest,
        PostResponse, Reply, ReplyBody,
    };
    use crate::coordinator::service::Coordinator;
    use crate::node::{NodeId, PhysicalNode};
    use crate::versioning::{VectorClock, Versioned};

    type Node = Arc<Coordinator<LoopbackClient>>;

    #[derive(Default)]
    struct LoopbackClient {
        peers: DashMap<PhysicalNode, Weak<Coordinator<LoopbackClient>>>,
        down: Mutex<HashSet<PhysicalNode>>,
        failing_replica_writes: Mutex<HashSet<PhysicalNode>>,
        stalled_replica_writes: Mutex<HashSet<PhysicalNode>>,
    }

    impl LoopbackClient {
        fn peer(&self, node: &PhysicalNode) -> Result<Node> {
            let is_down = self.down.lock().contains(node);
            if is_down {
                bail!("connection refused by {}", node);
            }
            self.peers
                .get(node)
                .and_then(|peer| peer.upgrade())
                .ok_or_else(|| anyhow!("unknown node {}", node))
        }
    }

    #[async_trait]
    impl PeerClient for LoopbackClient {
        async fn get(
            &self,
            node: &PhysicalNode,
            request: &GetRequest,
            origin: Origin,
        ) -> Result<Reply> {
            let peer = self.peer(node)?;
            Ok(peer.get(request.clone(), origin).await)
        }

        async fn post(
            &self,
            node: &PhysicalNode,
            request: &PostRequest,
            origin: Origin,
        ) -> Result<Reply> {
            if origin == Origin::Replica {
                let failing = self.failing_replica_writes.lock().contains(node);
                if failing {
                    bail!("replica write to {} refused", node);
                }
                let stalled = self.stalled_replica_writes.lock().contains(node);
                if stalled {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
            let peer = self.peer(node)?;
            Ok(peer.post(request.clone(), origin).await)
        }

        async fn delete(
            &self,
            node: &PhysicalNode,
            request: &DeleteRequest,
            origin: Origin,
        ) -> Result<Reply> {
            let peer = self.peer(node)?;
            Ok(peer.delete(request.clone(), origin).await)
        }
    }

    // ============================================================
    // HELPERS
    // ============================================================

    fn address(i: usize) -> PhysicalNode {
        PhysicalNode::new("127.0.0.1", 9000 + i as u16)
    }

    fn cluster_with_timeout(
        size: usize,
        replicas: usize,
        peer_timeout: Duration,
    ) -> (Arc<LoopbackClient>, Vec<Node>) {
        let members: Vec<PhysicalNode> = (0..size).map(address).collect();
        let client = Arc::new(LoopbackClient::default());

        let nodes = members
            .iter()
            .map(|local| {
                let config = NodeConfig::new(local.clone(), members.clone(), replicas)
                    .unwrap()
                    .with_peer_timeout(peer_timeout)
                    .unwrap();
                let node = Arc::new(Coordinator::new(&config, client.clone()));
                client.peers.insert(local.clone(), Arc::downgrade(&node));
                node
            })
            .collect();

        (client, nodes)
    }

    fn cluster(size: usize, replicas: usize) -> (Arc<LoopbackClient>, Vec<Node>) {
        cluster_with_timeout(size, replicas, Duration::from_secs(2))
    }

    fn owner_of<'a>(nodes: &'a [Node], key: &str) -> &'a Node {
        let owner = nodes[0].route(key).unwrap();
        nodes.iter().find(|n| *n.local_node() == owner).unwrap()
    }

    fn non_owner_of<'a>(nodes: &'a [Node], key: &str) -> &'a Node {
        let owner = nodes[0].route(key).unwrap();
        nodes.iter().find(|n| *n.local_node() != owner).unwrap()
    }

    fn get_req(key: &str) -> GetRequest {
        GetRequest {
            key: key.to_string(),
        }
    }

    fn post_req(key: &str, value: &str) -> PostRequest {
        PostRequest {
            key: key.to_string(),
            value: value.to_string(),
            primary_node: None,
            clock: None,
        }
    }

    fn delete_req(key: &str) -> DeleteRequest {
        DeleteRequest {
            key: key.to_string(),
            clock: None,
        }
    }

    fn error_of(reply: &Reply) -> String {
        reply.decode::<ErrorResponse>().unwrap().error
    }

    fn value_of(reply: &Reply) -> String {
        reply.decode::<GetResponse>().unwrap().value
    }

    /// Replaces every stored version of `key` on `node`.
    fn overwrite(node: &Node, key: &str, value: &str, clock: VectorClock) {
        node.store().delete(&key.to_string(), None);
        node.store()
            .set(key.to_string(), Versioned::new(value.to_string(), clock))
            .unwrap();
    }

    // ============================================================
    // REPLICATED WRITE AND READ TESTS
    // ============================================================

    #[tokio::test]
    async fn test_write_is_readable_from_every_node() {
        let (_client, nodes) = cluster(3, 3);
        let owner = owner_of(&nodes, "a");

        let reply = owner.post(post_req("a", "1"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::CREATED);

        let response: PostResponse = reply.decode().unwrap();
        assert_eq!(response.write_node, owner.node_id());
        assert_eq!(response.clocks.len(), 3);

        for node in &nodes {
            let reply = node.get(get_req("a"), Origin::Client).await;
            assert_eq!(reply.status, StatusCode::OK);
            assert_eq!(value_of(&reply), "1");
            assert_eq!(node.store().len(), 1);
        }
        assert_eq!(owner.quorum().replicas_of("a").len(), 2);
    }

    #[tokio::test]
    async fn test_overwrite_returns_ok() {
        let (_client, nodes) = cluster(3, 3);
        let owner = owner_of(&nodes, "a");

        assert_eq!(owner.post(post_req("a", "1"), Origin::Client).await.status, StatusCode::CREATED);
        assert_eq!(owner.post(post_req("a", "2"), Origin::Client).await.status, StatusCode::OK);

        let reply = owner.get(get_req("a"), Origin::Client).await;
        assert_eq!(value_of(&reply), "2");
    }

    #[tokio::test]
    async fn test_write_through_non_owner_is_relayed() {
        let (_client, nodes) = cluster(3, 3);
        let owner = owner_of(&nodes, "a");
        let other = non_owner_of(&nodes, "a");

        let reply = other.post(post_req("a", "1"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::CREATED);

        let response: PostResponse = reply.decode().unwrap();
        assert_eq!(response.write_node, owner.node_id());
        assert_eq!(owner.store().get(&"a".to_string())[0].data, "1");
    }

    #[tokio::test]
    async fn test_write_advances_owner_clock() {
        let (_client, nodes) = cluster(3, 3);
        let owner = owner_of(&nodes, "a");

        owner.post(post_req("a", "1"), Origin::Client).await;
        owner.post(post_req("a", "2"), Origin::Client).await;

        assert_eq!(owner.clock().get(owner.node_id()), 2);
        let stored = owner.store().get(&"a".to_string());
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].clock.get(owner.node_id()), 2);
    }

    #[tokio::test]
    async fn test_single_node_cluster() {
        let (_client, nodes) = cluster(1, 1);
        let node = &nodes[0];

        assert_eq!(node.post(post_req("a", "1"), Origin::Client).await.status, StatusCode::CREATED);

        let reply = node.get(get_req("a"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(value_of(&reply), "1");
        assert!(!node.quorum().is_tracked("a"));
    }

    // ============================================================
    // ROLLBACK TESTS
    // ============================================================

    #[tokio::test]
    async fn test_failed_replica_rolls_back_write() {
        let (client, nodes) = cluster(3, 3);
        let owner = owner_of(&nodes, "a");
        let replica = non_owner_of(&nodes, "a");
        let clock_before = owner.clock();

        client
            .failing_replica_writes
            .lock()
            .insert(replica.local_node().clone());

        let reply = owner.post(post_req("a", "1"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&reply), ERR_INCONSISTENT);

        for node in &nodes {
            assert!(!node.store().contains(&"a".to_string()));
        }
        assert_eq!(owner.get(get_req("a"), Origin::Client).await.status, StatusCode::NOT_FOUND);
        assert_eq!(owner.clock(), clock_before);
        assert!(!owner.quorum().is_tracked("a"));

        client.failing_replica_writes.lock().clear();
        let reply = owner.post(post_req("a", "1"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_failed_overwrite_restores_previous_value() {
        let (client, nodes) = cluster(3, 3);
        let owner = owner_of(&nodes, "a");
        let replica = non_owner_of(&nodes, "a");

        owner.post(post_req("a", "1"), Origin::Client).await;
        client
            .failing_replica_writes
            .lock()
            .insert(replica.local_node().clone());

        let reply = owner.post(post_req("a", "2"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);

        let stored = owner.store().get(&"a".to_string());
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].data, "1");
    }

    #[tokio::test]
    async fn test_stalled_replica_times_out() {
        let (client, nodes) = cluster_with_timeout(3, 3, Duration::from_millis(50));
        let owner = owner_of(&nodes, "a");
        let replica = non_owner_of(&nodes, "a");

        client
            .stalled_replica_writes
            .lock()
            .insert(replica.local_node().clone());

        let reply = owner.post(post_req("a", "1"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!owner.store().contains(&"a".to_string()));
    }

    // ============================================================
    // READ RECONCILIATION TESTS
    // ============================================================

    /// First replica the owner polls for `key`.
    fn first_polled_replica<'a>(nodes: &'a [Node], owner: &Node, key: &str) -> &'a Node {
        let mut tracked: Vec<PhysicalNode> = owner.quorum().replicas_of(key).into_iter().collect();
        tracked.sort_by_key(|n| n.port);
        nodes
            .iter()
            .find(|n| *n.local_node() == tracked[0])
            .unwrap()
    }

    #[tokio::test]
    async fn test_stale_replica_is_repaired_on_read() {
        let (_client, nodes) = cluster(5, 5);
        let owner = owner_of(&nodes, "a");

        assert_eq!(owner.post(post_req("a", "1"), Origin::Client).await.status, StatusCode::CREATED);

        let stale = first_polled_replica(&nodes, owner, "a");
        overwrite(stale, "a", "0", VectorClock::new());

        let reply = owner.get(get_req("a"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(value_of(&reply), "1");

        let repaired = stale.store().get(&"a".to_string());
        assert_eq!(repaired.len(), 1);
        assert_eq!(repaired[0].data, "1");
    }

    #[tokio::test]
    async fn test_repeated_reads_converge() {
        let (_client, nodes) = cluster(5, 5);
        let owner = owner_of(&nodes, "a");

        owner.post(post_req("a", "1"), Origin::Client).await;

        let mut tracked: Vec<PhysicalNode> =
            owner.quorum().replicas_of("a").into_iter().collect();
        tracked.sort_by_key(|n| n.port);
        for address in &tracked {
            let replica = nodes.iter().find(|n| n.local_node() == address).unwrap();
            overwrite(replica, "a", "0", VectorClock::new());
        }

        for _ in 0..3 {
            let reply = owner.get(get_req("a"), Origin::Client).await;
            assert_eq!(reply.status, StatusCode::OK);
            assert_eq!(value_of(&reply), "1");
        }

        let polled = &tracked[..owner.quorum().read_quorum()];
        for address in polled {
            let replica = nodes.iter().find(|n| n.local_node() == address).unwrap();
            assert_eq!(replica.store().get(&"a".to_string())[0].data, "1");
        }
    }

    #[tokio::test]
    async fn test_concurrent_replica_makes_read_inconsistent() {
        let (_client, nodes) = cluster(5, 5);
        let owner = owner_of(&nodes, "a");

        owner.post(post_req("a", "1"), Origin::Client).await;

        let diverged = first_polled_replica(&nodes, owner, "a");
        let mut foreign = VectorClock::new();
        foreign.increment(NodeId(u16::MAX), 0);
        overwrite(diverged, "a", "0", foreign);

        let reply = owner.get(get_req("a"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(error_of(&reply), ERR_INCONSISTENT);
    }

    #[tokio::test]
    async fn test_newer_replica_wins_over_owner() {
        let (_client, nodes) = cluster(5, 5);
        let owner = owner_of(&nodes, "a");

        owner.post(post_req("a", "1"), Origin::Client).await;

        let ahead = first_polled_replica(&nodes, owner, "a");
        let mut newer = owner.store().get(&"a".to_string())[0].clock.clone();
        newer.increment(ahead.node_id(), 0);
        overwrite(ahead, "a", "2", newer);

        let reply = owner.get(get_req("a"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(value_of(&reply), "2");
        assert_eq!(owner.store().get(&"a".to_string())[0].data, "2");
    }

    #[tokio::test]
    async fn test_replica_read_does_not_fan_out() {
        let (_client, nodes) = cluster(3, 1);
        let owner = owner_of(&nodes, "a");

        owner.post(post_req("a", "1"), Origin::Client).await;

        let tracked = owner.quorum().replicas_of("a");
        let bystander = nodes
            .iter()
            .find(|n| n.local_node() != owner.local_node() && !tracked.contains(n.local_node()))
            .unwrap();

        let reply = bystander.get(get_req("a"), Origin::Replica).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);

        let reply = owner.get(get_req("a"), Origin::Replica).await;
        assert_eq!(reply.status, StatusCode::OK);
        let response: GetResponse = reply.decode().unwrap();
        assert_eq!(response.clock.unwrap().get(owner.node_id()), 1);
    }

    // ============================================================
    // REPLICA WRITE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_obsolete_replica_write_is_rejected() {
        let (_client, nodes) = cluster(1, 1);
        let node = &nodes[0];
        let writer = NodeId(7);

        let mut newer = VectorClock::new();
        newer.increment(writer, 0).increment(writer, 0);
        let mut older = VectorClock::new();
        older.increment(writer, 0);

        let mut request = post_req("a", "2");
        request.primary_node = Some(writer);
        request.clock = Some(newer);
        assert_eq!(node.post(request, Origin::Replica).await.status, StatusCode::CREATED);

        let mut request = post_req("a", "1");
        request.primary_node = Some(writer);
        request.clock = Some(older);
        let reply = node.post(request, Origin::Replica).await;
        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(error_of(&reply), ERR_OBSOLETE_VERSION);
        assert_eq!(node.store().get(&"a".to_string())[0].data, "2");
    }

    #[tokio::test]
    async fn test_replica_write_merges_supplied_clock() {
        let (_client, nodes) = cluster(1, 1);
        let node = &nodes[0];

        let mut supplied = VectorClock::new();
        supplied.increment(NodeId(7), 0);
        let mut request = post_req("a", "1");
        request.clock = Some(supplied);

        let reply = node.post(request, Origin::Replica).await;
        let response: PostResponse = reply.decode().unwrap();
        let node_clock = &response.clocks[&node.node_id()];

        assert_eq!(node_clock.get(NodeId(7)), 1);
        assert_eq!(node_clock.get(node.node_id()), 1);
    }

    // ============================================================
    // DELETE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_delete_is_not_repeatable() {
        let (_client, nodes) = cluster(3, 3);
        let owner = owner_of(&nodes, "a");
        let other = non_owner_of(&nodes, "a");

        owner.post(post_req("a", "1"), Origin::Client).await;

        assert_eq!(other.delete(delete_req("a"), Origin::Client).await.status, StatusCode::NO_CONTENT);
        for node in &nodes {
            assert!(!node.store().contains(&"a".to_string()));
        }
        assert!(!owner.quorum().is_tracked("a"));

        let reply = other.delete(delete_req("a"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(error_of(&reply), ERR_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_conditional_delete_keeps_newer_version() {
        let (_client, nodes) = cluster(1, 1);
        let node = &nodes[0];

        node.post(post_req("a", "1"), Origin::Client).await;
        let request = DeleteRequest {
            key: "a".to_string(),
            clock: Some(VectorClock::new()),
        };

        assert_eq!(node.delete(request, Origin::Client).await.status, StatusCode::NO_CONTENT);
        assert!(node.store().contains(&"a".to_string()));
    }

    // ============================================================
    // ROUTING TESTS
    // ============================================================

    #[tokio::test]
    async fn test_missing_key_via_non_owner() {
        let (_client, nodes) = cluster(3, 3);
        let other = non_owner_of(&nodes, "missing");

        let reply = other.get(get_req("missing"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(error_of(&reply), ERR_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreachable_owner() {
        let (client, nodes) = cluster(3, 3);
        let owner = owner_of(&nodes, "a");
        let other = non_owner_of(&nodes, "a");

        client.down.lock().insert(owner.local_node().clone());

        let reply = other.get(get_req("a"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
        assert_eq!(error_of(&reply), ERR_PEER_UNREACHABLE);
    }

    #[tokio::test]
    async fn test_empty_ring_has_no_route() {
        let (_client, nodes) = cluster(1, 1);
        let node = &nodes[0];

        assert!(node.remove_node(&node.local_node().clone()));

        for reply in [
            node.get(get_req("a"), Origin::Client).await,
            node.post(post_req("a", "1"), Origin::Client).await,
            node.delete(delete_req("a"), Origin::Client).await,
        ] {
            assert_eq!(reply.status, StatusCode::BAD_REQUEST);
            assert_eq!(error_of(&reply), ERR_NO_ROUTE);
        }
    }

    // ============================================================
    // QUORUM ENFORCEMENT TESTS
    // ============================================================

    fn remove_peers(node: &Node, count: usize) {
        let mut peers: Vec<PhysicalNode> = node
            .nodes()
            .into_iter()
            .filter(|n| n != node.local_node())
            .collect();
        peers.sort_by_key(|n| n.port);
        for peer in peers.into_iter().take(count) {
            assert!(node.remove_node(&peer));
        }
    }

    #[tokio::test]
    async fn test_write_refused_without_enough_peers() {
        let (_client, nodes) = cluster(3, 3);
        let owner = owner_of(&nodes, "a");
        let clock_before = owner.clock();

        remove_peers(owner, 2);

        let reply = owner.post(post_req("a", "1"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_of(&reply), ERR_INCONSISTENT);

        for node in &nodes {
            assert!(!node.store().contains(&"a".to_string()));
        }
        assert_eq!(owner.clock(), clock_before);
        assert!(!owner.quorum().is_tracked("a"));
    }

    #[tokio::test]
    async fn test_write_refused_when_peers_fall_short_of_quorum() {
        let (_client, nodes) = cluster(5, 5);
        let owner = owner_of(&nodes, "a");

        // W = 4 needs three peers; two remain.
        remove_peers(owner, 2);

        let reply = owner.post(post_req("a", "1"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!owner.store().contains(&"a".to_string()));
    }

    #[tokio::test]
    async fn test_read_fails_without_enough_peers() {
        let (_client, nodes) = cluster(3, 3);
        let owner = owner_of(&nodes, "a");

        assert_eq!(owner.post(post_req("a", "1"), Origin::Client).await.status, StatusCode::CREATED);
        remove_peers(owner, 2);

        let reply = owner.get(get_req("a"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert_eq!(error_of(&reply), ERR_INCONSISTENT);
    }

    // ============================================================
    // FORWARDING TESTS
    // ============================================================

    #[tokio::test]
    async fn test_forwarded_request_executes_locally() {
        let (_client, nodes) = cluster(3, 3);
        let other = non_owner_of(&nodes, "a");

        let reply = other.post(post_req("a", "1"), Origin::Forwarded).await;
        assert_eq!(reply.status, StatusCode::CREATED);

        let response: PostResponse = reply.decode().unwrap();
        assert_eq!(response.write_node, other.node_id());
        assert!(other.store().contains(&"a".to_string()));
    }

    #[tokio::test]
    async fn test_forward_makes_one_hop_when_rings_disagree() {
        let (_client, nodes) = cluster(2, 1);
        let owner = owner_of(&nodes, "a");
        let other = non_owner_of(&nodes, "a");

        // The owner's ring no longer contains itself, so it would route the
        // key back to `other` if forwarded requests were routed again.
        assert!(owner.remove_node(&owner.local_node().clone()));
        assert_eq!(owner.route("a").as_ref(), Some(other.local_node()));

        let reply = other.post(post_req("a", "1"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        let response: PostResponse = reply.decode().unwrap();
        assert_eq!(response.write_node, owner.node_id());

        let reply = other.get(get_req("a"), Origin::Client).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(value_of(&reply), "1");
    }

    // ============================================================
    // REPLY BODY TESTS
    // ============================================================

    #[test]
    fn test_reply_body_parsing() {
        assert_eq!(ReplyBody::from_bytes(b""), None);
        assert_eq!(
            ReplyBody::from_bytes(br#"{"error":"key does not exist"}"#),
            Some(ReplyBody::Json(serde_json::json!({"error": "key does not exist"})))
        );
        assert_eq!(
            ReplyBody::from_bytes(b"upstream overloaded"),
            Some(ReplyBody::Text("upstream overloaded".to_string()))
        );
    }

    #[test]
    fn test_text_reply_does_not_decode() {
        let reply = Reply {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: Some(ReplyBody::Text("busy".to_string())),
        };
        assert!(reply.decode::<ErrorResponse>().is_none());
    }

    // ============================================================
    // MEMBERSHIP TESTS
    // ============================================================

    #[tokio::test]
    async fn test_add_and_remove_node() {
        let (_client, nodes) = cluster(1, 1);
        let node = &nodes[0];
        let newcomer = address(1);
        let ring_size = node.health().virtual_nodes;

        assert!(node.add_node(newcomer.clone()));
        assert!(!node.add_node(newcomer.clone()));
        assert_eq!(node.nodes().len(), 2);
        assert_eq!(node.health().virtual_nodes, ring_size * 2);

        node.quorum().track_replica("a", newcomer.clone());
        assert!(node.remove_node(&newcomer));
        assert!(!node.remove_node(&newcomer));
        assert_eq!(node.health().virtual_nodes, ring_size);
        assert!(!node.quorum().is_tracked("a"));
    }
}
