//! Test fixtures shared across the sales simulator crates.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use salesim_types::{Month, RegisterNum, SaleDate, SalesRecord, StoreId, DEFAULT_SALE_YEAR};

/// Seed used by fixtures that need a fixed RNG.
pub const TEST_SEED: u64 = 42;

/// Deterministic RNG for tests.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Build a record for `store` in `month` with the given amount.
///
/// # Panics
///
/// Panics if `month` is not in `1..=12`.
pub fn make_record(store: u32, month: u8, amount: f64) -> SalesRecord {
    SalesRecord {
        date: SaleDate {
            day: 1,
            month: Month::new(month).expect("test month must be in 1..=12"),
            year: DEFAULT_SALE_YEAR,
        },
        store: StoreId(store),
        register: RegisterNum(RegisterNum::MIN),
        amount,
    }
}

/// Whether two totals agree within the tolerance the simulator uses.
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}
