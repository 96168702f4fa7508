//! Shared sales aggregation.

use crate::error::InvariantViolation;
use parking_lot::Mutex;
use salesim_types::{Month, SalesRecord, StoreId};
use std::collections::BTreeMap;

/// Relative tolerance when comparing totals summed in different orders.
pub const TOTALS_TOLERANCE: f64 = 1e-6;

/// Whether two totals agree within [`TOTALS_TOLERANCE`].
pub fn totals_agree(a: f64, b: f64) -> bool {
    (a - b).abs() <= TOTALS_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Sales totals for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesTotals {
    /// Sum of every consumed record's amount.
    pub grand_total: f64,
    /// Totals keyed by store.
    pub by_store: BTreeMap<StoreId, f64>,
    /// Totals keyed by month.
    pub by_month: BTreeMap<Month, f64>,
    /// Number of records aggregated.
    pub records: u64,
}

impl SalesTotals {
    fn apply(&mut self, record: &SalesRecord) {
        self.grand_total += record.amount;
        *self.by_store.entry(record.store).or_default() += record.amount;
        *self.by_month.entry(record.period()).or_default() += record.amount;
        self.records += 1;
    }

    /// Sum of the per-store totals.
    pub fn store_sum(&self) -> f64 {
        self.by_store.values().sum()
    }

    /// Sum of the per-month totals.
    pub fn month_sum(&self) -> f64 {
        self.by_month.values().sum()
    }

    /// Check that grand, store and month totals describe the same sales.
    pub fn check_conservation(&self) -> Result<(), InvariantViolation> {
        let stores = self.store_sum();
        let months = self.month_sum();
        if totals_agree(self.grand_total, stores) && totals_agree(self.grand_total, months) {
            Ok(())
        } else {
            Err(InvariantViolation::TotalsDiverged {
                grand: self.grand_total,
                stores,
                months,
            })
        }
    }
}

/// Mutex-protected accumulator shared by all consumers of a run.
///
/// The grand total, the store bucket and the month bucket for a record are
/// updated in one critical section, so no reader ever sees a partial update.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    totals: Mutex<SalesTotals>,
}

impl StatsAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one record into the totals.
    pub fn record(&self, record: &SalesRecord) {
        self.totals.lock().apply(record);
    }

    /// Copy of the current totals.
    pub fn snapshot(&self) -> SalesTotals {
        self.totals.lock().clone()
    }

    /// Consume the aggregator and return its totals.
    pub fn into_totals(self) -> SalesTotals {
        self.totals.into_inner()
    }
}
