//! Shared bounded buffer.
//!
//! The synchronization core of the simulator: a capacity-limited FIFO with
//! blocking `insert`/`remove` and an explicit shutdown signal.
//!
//! ```text
//!  producers ──insert──▶ ┌───────────────────────┐ ──remove──▶ consumers
//!   (wait while full)    │ VecDeque<T>, shutdown │  (wait while empty
//!                        └───────────────────────┘   and not shut down)
//!                                    ▲
//!                     signal_shutdown (runner, once)
//! ```
//!
//! `remove` returns [`Removed::Closed`] instead of a placeholder item, so
//! "no more data" can never be confused with a legitimate zero-valued item.

mod bounded;

pub use bounded::{BoundedBuffer, BufferClosed, BufferMetrics, Removed};
