//! Coordinator Network Protocol
//!
//! Defines the API endpoints and Data Transfer Objects (DTOs) exchanged between
//! clients and nodes, and between nodes when forwarding or replicating.
//!
//! All bodies are JSON. Inter-node traffic uses the same endpoints as clients:
//! replica-internal calls carry `isReplica=true`, and requests forwarded to a
//! key's owner carry `forwarded=true`.

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::node::{NodeId, PhysicalNode};
use crate::versioning::{VectorClock, Versioned};

// --- API Endpoints ---

/// Data endpoint for GET, POST/PUT and DELETE of a key.
pub const ENDPOINT_DATA: &str = "/";
/// Liveness and ring summary.
pub const ENDPOINT_HEALTH: &str = "/health";
/// Administrative add/remove of cluster members.
pub const ENDPOINT_NODES: &str = "/nodes";

/// Query parameter marking replica-internal requests.
pub const PARAM_IS_REPLICA: &str = "isReplica";
/// Query parameter marking a request already forwarded to its owner.
pub const PARAM_FORWARDED: &str = "forwarded";

// --- Error reasons ---

pub const ERR_NO_ROUTE: &str = "no physical nodes to route to";
pub const ERR_NOT_FOUND: &str = "key does not exist";
pub const ERR_INCONSISTENT: &str = "data store is inconsistent";
pub const ERR_OBSOLETE_VERSION: &str = "obsolete version";
pub const ERR_PEER_UNREACHABLE: &str = "peer unreachable";

// --- Data Transfer Objects ---

#[derive(Debug, Default, Deserialize)]
pub struct RequestParams {
    #[serde(rename = "isReplica", default)]
    pub is_replica: bool,
    #[serde(default)]
    pub forwarded: bool,
}

/// Who sent a request, which decides how far it may travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// External client; routed and forwarded to the owner when needed.
    Client,
    /// Forwarded by another node that routed the key here. Executed as owner
    /// without routing again, so a request makes at most one hop.
    Forwarded,
    /// Replica-internal call from a coordinator. Served from local state only.
    Replica,
}

impl Origin {
    /// Query string marking this origin on the wire.
    pub fn query(self) -> Option<String> {
        match self {
            Self::Client => None,
            Self::Forwarded => Some(format!("{}=true", PARAM_FORWARDED)),
            Self::Replica => Some(format!("{}=true", PARAM_IS_REPLICA)),
        }
    }
}

impl From<RequestParams> for Origin {
    fn from(params: RequestParams) -> Self {
        if params.is_replica {
            Self::Replica
        } else if params.forwarded {
            Self::Forwarded
        } else {
            Self::Client
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: String,
}

/// Successful read. `clock` lets coordinators compare replica copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<VectorClock>,
}

impl GetResponse {
    pub fn from_version(key: &str, version: &Versioned<String>) -> Self {
        Self {
            key: key.to_string(),
            value: version.data.clone(),
            clock: Some(version.clock.clone()),
        }
    }

    pub fn into_version(self) -> Versioned<String> {
        Versioned::new(self.value, self.clock.unwrap_or_default())
    }
}

/// Write request. Coordinators fill `primary_node` and `clock` when
/// replicating; clients may pass `clock` as causal context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<VectorClock>,
}

/// Acknowledgment of a write: the clocks of every node that took part,
/// keyed by node id, and the id of the node answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub clocks: BTreeMap<NodeId, VectorClock>,
    pub write_node: NodeId,
}

/// Delete request. With a `clock`, only versions older than it are removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<VectorClock>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub node: PhysicalNode,
    pub node_id: NodeId,
    pub nodes: Vec<PhysicalNode>,
    pub keys: usize,
    pub virtual_nodes: usize,
    pub read_quorum: usize,
    pub write_quorum: usize,
}

/// Answer to an administrative membership change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodesResponse {
    pub changed: bool,
    pub nodes: Vec<PhysicalNode>,
}

/// Body of a [`Reply`]. Peers normally answer JSON; anything else is kept as
/// text so it can still be relayed.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(serde_json::Value),
    Text(String),
}

impl ReplyBody {
    /// Parses a raw peer body; `None` when empty.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        Some(match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
        })
    }
}

/// Transport-neutral response: a status plus an optional body.
///
/// Produced by the coordinator for its own callers and returned by
/// [`PeerClient`](super::client::PeerClient) for remote calls, so forwarded
/// responses can be relayed unchanged.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Option<ReplyBody>,
}

impl Reply {
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self {
                status,
                body: Some(ReplyBody::Json(body)),
            },
            Err(e) => {
                tracing::error!("Failed to serialize response body: {}", e);
                Self::error(StatusCode::INTERNAL_SERVER_ERROR, ERR_INCONSISTENT)
            }
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    pub fn error(status: StatusCode, reason: &str) -> Self {
        Self {
            status,
            body: Some(ReplyBody::Json(serde_json::json!({ "error": reason }))),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decodes a JSON body as `T`; `None` when absent, text, or of another
    /// shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        match &self.body {
            Some(ReplyBody::Json(body)) => serde_json::from_value(body.clone()).ok(),
            _ => None,
        }
    }
}
