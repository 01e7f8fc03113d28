//! Versioned Storage Module
//!
//! Memory-only key-value store where every value carries the vector clock of
//! the write that produced it.
//!
//! ## Core Concepts
//! - **Siblings**: a key may hold several causally unordered versions at once.
//! - **Write guard**: a write older than a stored version is rejected with
//!   `ObsoleteVersion`; older siblings are pruned when a newer write lands.
//! - **Conditional delete**: removes only siblings dominated by a given clock.
//!
//! Nothing is persisted; data is lost on restart.

pub mod memory;

pub use memory::{StoreError, VersionedStore};
