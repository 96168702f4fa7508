//! Sales record type.

use crate::{Month, RegisterNum, StoreId};

/// Two-digit year stamped on every synthesized record.
pub const DEFAULT_SALE_YEAR: u16 = 16;

/// Date of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleDate {
    /// Day of month (1..=30; the generator uses a uniform 30-day month).
    pub day: u8,
    /// Month of the sale. This is the period sales are aggregated by.
    pub month: Month,
    /// Year of the sale.
    pub year: u16,
}

/// A single synthesized sales transaction.
///
/// Records are plain values: a producer creates one, moves it into the
/// shared buffer, and exactly one consumer takes it out again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalesRecord {
    /// When the sale happened.
    pub date: SaleDate,
    /// Store (and producer) that generated the sale.
    pub store: StoreId,
    /// Register the sale was rung up on.
    pub register: RegisterNum,
    /// Sale amount in currency units, in `[0.50, 999.99)` when synthesized.
    pub amount: f64,
}

impl SalesRecord {
    /// Period bucket this record contributes to.
    pub fn period(&self) -> Month {
        self.date.month
    }
}
