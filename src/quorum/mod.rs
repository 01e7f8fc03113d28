//! Quorum Module
//!
//! Read/write quorum sizing and per-key replica tracking.
//!
//! With replication factor `N`, `R = max(1, N / 2)` and `W = N + 1 - R`, so
//! `R + W > N`: any read quorum overlaps any write quorum.

pub mod manager;

pub use manager::QuorumManager;
