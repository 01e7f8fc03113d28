//! Quorum-Replicated Key-Value Store Library
//!
//! This library crate defines the modules that make up one node of the store.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`config`**: Command-line options and the validated node configuration.
//! - **`coordinator`**: Request routing, forwarding, replicated writes, quorum
//!   reads with read-repair, and the HTTP surface of a node.
//! - **`node`**: Physical node addresses and their compact numeric ids.
//! - **`quorum`**: Read/write quorum sizes and per-key replica tracking.
//! - **`ring`**: Consistent hashing with virtual nodes, mapping keys to owners.
//! - **`storage`**: The in-memory versioned store holding sibling versions.
//! - **`versioning`**: Vector clocks and clock-stamped values.

pub mod config;
pub mod coordinator;
pub mod node;
pub mod quorum;
pub mod ring;
pub mod storage;
pub mod versioning;
