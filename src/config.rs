//! Node Configuration
//!
//! Command-line options and the validated, immutable configuration a node runs
//! with. The node list is static for the process lifetime apart from explicit
//! administrative add/remove calls.

use clap::Parser;
use std::time::Duration;

use crate::node::PhysicalNode;
use crate::ring::DEFAULT_VIRTUAL_NODE_COUNT;

pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Parser, Debug, Clone)]
#[command(name = "quorum-kv", about = "Quorum-replicated key-value store node")]
pub struct Args {
    /// Hostname/IP address this node listens on
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port number
    #[arg(long, default_value_t = 10900)]
    pub port: u16,

    /// Cluster members as host[:port], comma separated (port defaults to 80)
    #[arg(long, value_delimiter = ',')]
    pub nodes: Vec<PhysicalNode>,

    /// Number of nodes, including the coordinator, expected to hold each key
    #[arg(long, default_value_t = 1)]
    pub replicas: usize,

    /// Virtual nodes placed on the ring per physical node
    #[arg(long, default_value_t = DEFAULT_VIRTUAL_NODE_COUNT)]
    pub virtual_nodes: usize,

    /// Timeout for each call to another node, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub peer_timeout_ms: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("replicas must be within 1..={nodes}, got {replicas}")]
    ReplicasOutOfRange { replicas: usize, nodes: usize },
    #[error("virtual node count must be at least 1")]
    NoVirtualNodes,
    #[error("peer timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub local_node: PhysicalNode,
    /// Every cluster member, the local node included.
    pub nodes: Vec<PhysicalNode>,
    pub replicas: usize,
    pub virtual_nodes: usize,
    pub peer_timeout: Duration,
}

impl NodeConfig {
    /// Builds a configuration with default ring and timeout settings. The
    /// local node is added to `nodes` when missing.
    pub fn new(
        local_node: PhysicalNode,
        nodes: Vec<PhysicalNode>,
        replicas: usize,
    ) -> Result<Self, ConfigError> {
        let mut members: Vec<PhysicalNode> = Vec::with_capacity(nodes.len() + 1);
        for node in nodes {
            if !members.contains(&node) {
                members.push(node);
            }
        }
        if !members.contains(&local_node) {
            members.push(local_node.clone());
        }

        if replicas < 1 || replicas > members.len() {
            return Err(ConfigError::ReplicasOutOfRange {
                replicas,
                nodes: members.len(),
            });
        }

        Ok(Self {
            local_node,
            nodes: members,
            replicas,
            virtual_nodes: DEFAULT_VIRTUAL_NODE_COUNT,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
        })
    }

    pub fn with_virtual_nodes(mut self, virtual_nodes: usize) -> Result<Self, ConfigError> {
        if virtual_nodes == 0 {
            return Err(ConfigError::NoVirtualNodes);
        }
        self.virtual_nodes = virtual_nodes;
        Ok(self)
    }

    pub fn with_peer_timeout(mut self, peer_timeout: Duration) -> Result<Self, ConfigError> {
        if peer_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.peer_timeout = peer_timeout;
        Ok(self)
    }

    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let local_node = PhysicalNode::new(args.host, args.port);
        Self::new(local_node, args.nodes, args.replicas)?
            .with_virtual_nodes(args.virtual_nodes)?
            .with_peer_timeout(Duration::from_millis(args.peer_timeout_ms))
    }
}
