//! Domain-specific identifier types.

use std::fmt;

/// Store identifier.
///
/// Every producer is assigned one store and tags all of its records with it,
/// so store totals double as per-producer totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(pub u32);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Store {}", self.0)
    }
}

/// Consumer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(pub u32);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Consumer {}", self.0)
    }
}

/// Cash register number within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterNum(pub u8);

impl RegisterNum {
    /// Lowest register number.
    pub const MIN: u8 = 1;

    /// Highest register number.
    pub const MAX: u8 = 6;
}

impl fmt::Display for RegisterNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Register {}", self.0)
    }
}

/// Calendar month, the period that sales are bucketed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month(u8);

impl Month {
    /// January.
    pub const FIRST: Month = Month(1);

    /// December.
    pub const LAST: Month = Month(12);

    /// Create a month from its 1-based number.
    ///
    /// Returns `None` outside `1..=12`.
    pub fn new(month: u8) -> Option<Self> {
        (Self::FIRST.0..=Self::LAST.0)
            .contains(&month)
            .then_some(Month(month))
    }

    /// Get the 1-based month number.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Iterate over all twelve months in calendar order.
    pub fn all() -> impl Iterator<Item = Month> {
        (Self::FIRST.0..=Self::LAST.0).map(Month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Month {}", self.0)
    }
}
