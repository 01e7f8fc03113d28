//! Versioning
//!
//! Causality tracking for stored values.
//!
//! ## Core Concepts
//! - **VectorClock**: one monotonic counter per node slot plus an informational
//!   wall-clock timestamp. Clocks form a partial order: one can happen before the
//!   other, after it, or neither.
//! - **ClockOrdering**: the three-way comparison result. Identical and truly
//!   concurrent clocks both report `ConcurrentOrEqual`; callers that need to
//!   tell them apart check [`VectorClock::same_versions`].
//! - **Versioned**: a value paired with the clock of the write that produced it.

pub mod clock;
pub mod versioned;

pub use clock::{ClockOrdering, VectorClock, now_ms};
pub use versioned::Versioned;
