//! Request Coordination Module
//!
//! Turns the ring, the versioned store and the quorum settings into the
//! node's client-facing GET/POST/DELETE behavior.
//!
//! ## Core Concepts
//! - **Ownership**: every key has exactly one owner, its successor on the
//!   consistent hash ring. Requests for keys owned elsewhere are forwarded
//!   once, flagged `forwarded=true` so the receiver executes them without
//!   routing again, and the owner's answer is relayed unchanged.
//! - **Replicated writes**: the owner stamps the write with its incremented
//!   clock, stores it and replicates it sequentially to a replica set. Any
//!   replica failure rolls the write back everywhere it landed.
//! - **Quorum reads**: the owner polls up to `R` replicas and answers with the
//!   causally newest copy, repairing stale replicas on the way. Copies with
//!   no causal winner make the read fail.
//! - **Replica traffic**: inter-node calls use the client endpoints flagged
//!   with `isReplica=true` and are served from local state only.

pub mod client;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod service;

pub use client::{HttpPeerClient, PeerClient};
pub use error::CoordinatorError;
pub use handlers::router;
pub use protocol::{Origin, Reply};
pub use service::Coordinator;

#[cfg(test)]
mod tests;
