//! Consistent Hashing
//!
//! Maps keys onto physical nodes through a hash ring populated with virtual nodes.
//!
//! ## Core Concepts
//! - **Ring**: an ordered map from 64-bit hash positions to virtual nodes.
//! - **Virtual nodes**: each physical node is placed many times on the ring
//!   (`key + "-" + index`) so that load stays even under a uniform hash.
//! - **Routing**: a key belongs to the first virtual node at or after its hash,
//!   wrapping around to the start of the ring.

pub mod router;

pub use router::{
    ConsistentHashRouter, DEFAULT_VIRTUAL_NODE_COUNT, HashFunction, RingNode, SipHashFunction,
    VirtualNode,
};
