//! Node Identity
//!
//! Address-based identity of the processes taking part in the cluster.
//!
//! ## Core Concepts
//! - **PhysicalNode**: a running store process, identified by `(host, port)`.
//!   It is the unit of routing and replication.
//! - **NodeId**: the small integer slot a node owns inside every vector clock,
//!   derived from hashing the node's key.

pub mod types;

pub use types::{NodeId, ParseNodeError, PhysicalNode};
