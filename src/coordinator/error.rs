use axum::http::StatusCode;

use super::protocol::{
    ERR_INCONSISTENT, ERR_NO_ROUTE, ERR_NOT_FOUND, ERR_OBSOLETE_VERSION, ERR_PEER_UNREACHABLE,
    Reply,
};
use crate::node::PhysicalNode;
use crate::storage::StoreError;

/// Outcome of a request that did not succeed.
///
/// Each variant maps to one status code and one wire reason; internal detail
/// stays in the logs.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("no physical nodes to route to")]
    NoRoute,
    #[error("key does not exist")]
    NotFound,
    #[error(transparent)]
    ObsoleteVersion(#[from] StoreError),
    #[error("read quorum not reached: need {needed}, got {got}")]
    QuorumUnreachable { needed: usize, got: usize },
    #[error("write quorum not reachable: need {needed} replica(s), {available} available")]
    InsufficientReplicas { needed: usize, available: usize },
    #[error("replication to {node} failed: {reason}")]
    ReplicationFailure { node: PhysicalNode, reason: String },
    #[error("conflicting versions for key '{0}'")]
    Inconsistent(String),
    #[error("peer {node} unreachable: {reason}")]
    PeerUnreachable { node: PhysicalNode, reason: String },
}

impl CoordinatorError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoRoute => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ObsoleteVersion(_) => StatusCode::CONFLICT,
            Self::QuorumUnreachable { .. } => StatusCode::CONFLICT,
            Self::Inconsistent(_) => StatusCode::CONFLICT,
            Self::InsufficientReplicas { .. } | Self::ReplicationFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoRoute => ERR_NO_ROUTE,
            Self::NotFound => ERR_NOT_FOUND,
            Self::ObsoleteVersion(_) => ERR_OBSOLETE_VERSION,
            Self::QuorumUnreachable { .. }
            | Self::Inconsistent(_)
            | Self::InsufficientReplicas { .. }
            | Self::ReplicationFailure { .. } => ERR_INCONSISTENT,
            Self::PeerUnreachable { .. } => ERR_PEER_UNREACHABLE,
        }
    }

    pub fn into_reply(self) -> Reply {
        Reply::error(self.status(), self.reason())
    }
}
