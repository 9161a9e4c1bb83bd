#![deny(missing_docs)]

//! Chainkit - Complete SDK.
//!
//! Re-exports the primitives, transaction and wallet crates for
//! single-crate usage, plus a tracing subscriber helper.

pub use chainkit_primitives as primitives;
pub use chainkit_transaction as transaction;
pub use chainkit_wallet as wallet;

pub mod telemetry;

pub use telemetry::init_tracing;
