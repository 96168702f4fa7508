//! Core types for the sales simulator.
//!
//! Plain value types shared by the buffer, the workers and the reporting
//! layer. Nothing in this crate is synchronized; records are moved between
//! threads, never shared.

mod config;
mod identifiers;
mod record;

pub use config::{ConfigError, RunConfig};
pub use identifiers::{ConsumerId, Month, RegisterNum, StoreId};
pub use record::{SaleDate, SalesRecord, DEFAULT_SALE_YEAR};
