//! Record generation for simulations.
//!
//! Producers call a [`RecordGenerator`] once per record. Generators are
//! shared by reference across all producer threads, so they hold no mutable
//! state; all randomness comes from the RNG the caller passes in.

mod sales;

pub use sales::SalesWorkload;

use rand::RngCore;
use salesim_types::{SalesRecord, StoreId};

/// Trait for generating synthetic sales records.
pub trait RecordGenerator: Send + Sync {
    /// Generate a single record tagged with `store`.
    fn generate_one(&self, store: StoreId, rng: &mut dyn RngCore) -> SalesRecord;

    /// Generate `count` records tagged with `store`, in generation order.
    fn generate_batch(
        &self,
        store: StoreId,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<SalesRecord> {
        (0..count).map(|_| self.generate_one(store, rng)).collect()
    }
}
