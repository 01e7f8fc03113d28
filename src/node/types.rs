use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ring::{HashFunction, RingNode, SipHashFunction};

/// Port assumed when a node address is given without one.
pub const DEFAULT_PORT: u16 = 80;

/// Clock slot owned by a physical node.
///
/// Serialized as a bare integer so it can be used as a JSON object key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct NodeId(pub u16);

impl NodeId {
    /// Derives the clock slot of `node` from the ring hash of its key.
    pub fn of(node: &PhysicalNode) -> Self {
        Self(SipHashFunction.hash(&node.key()) as u16)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A store process reachable at `host:port`.
///
/// Equality and hashing are by address, so two values built from the same
/// configuration entry are the same node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PhysicalNode {
    pub host: String,
    pub port: u16,
}

impl PhysicalNode {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL of the node's HTTP endpoint.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn id(&self) -> NodeId {
        NodeId::of(self)
    }
}

impl RingNode for PhysicalNode {
    fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for PhysicalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseNodeError {
    #[error("empty node address")]
    EmptyHost,
    #[error("invalid port in node address '{0}'")]
    InvalidPort(String),
}

impl FromStr for PhysicalNode {
    type Err = ParseNodeError;

    /// Parses `host[:port]`; the port defaults to [`DEFAULT_PORT`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ParseNodeError::InvalidPort(s.to_string()))?;
                (host, port)
            }
            None => (s, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(ParseNodeError::EmptyHost);
        }

        Ok(Self::new(host, port))
    }
}
