use serde::{Deserialize, Serialize};

use super::clock::{ClockOrdering, VectorClock};

/// A value together with the clock of the write that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub data: T,
    pub clock: VectorClock,
}

impl<T> Versioned<T> {
    pub fn new(data: T, clock: VectorClock) -> Self {
        Self { data, clock }
    }

    pub fn compare(&self, other: &Versioned<T>) -> ClockOrdering {
        self.clock.compare(&other.clock)
    }
}
