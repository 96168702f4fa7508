//! Uniform sales record generator.

use crate::workload::RecordGenerator;
use rand::{Rng, RngCore};
use salesim_types::{Month, RegisterNum, SaleDate, SalesRecord, StoreId, DEFAULT_SALE_YEAR};

/// Generates sales with uniformly distributed date, register and amount.
#[derive(Clone, Debug)]
pub struct SalesWorkload {
    /// Days are drawn from `1..=days_per_month`.
    days_per_month: u8,

    /// Registers are drawn from `1..=registers`.
    registers: u8,

    /// Lower bound (inclusive) of the sale amount.
    min_amount: f64,

    /// Upper bound (exclusive) of the sale amount.
    max_amount: f64,

    /// Year stamped on every record.
    year: u16,
}

impl Default for SalesWorkload {
    fn default() -> Self {
        Self {
            days_per_month: 30,
            registers: RegisterNum::MAX,
            min_amount: 0.50,
            max_amount: 999.99,
            year: DEFAULT_SALE_YEAR,
        }
    }
}

impl SalesWorkload {
    /// Create a generator with the default distribution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the amount range `[min, max)`.
    pub fn with_amount_range(mut self, min: f64, max: f64) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    fn generate_one_inner<R: Rng + ?Sized>(&self, store: StoreId, rng: &mut R) -> SalesRecord {
        let day = rng.gen_range(1..=self.days_per_month);
        let month = Month::new(rng.gen_range(Month::FIRST.get()..=Month::LAST.get()))
            .unwrap_or(Month::FIRST);
        let register = RegisterNum(rng.gen_range(RegisterNum::MIN..=self.registers));
        let amount = if self.min_amount < self.max_amount {
            rng.gen_range(self.min_amount..self.max_amount)
        } else {
            self.min_amount
        };

        SalesRecord {
            date: SaleDate {
                day,
                month,
                year: self.year,
            },
            store,
            register,
            amount,
        }
    }
}

impl RecordGenerator for SalesWorkload {
    fn generate_one(&self, store: StoreId, rng: &mut dyn RngCore) -> SalesRecord {
        self.generate_one_inner(store, rng)
    }
}
