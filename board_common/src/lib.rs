//!
//! Common types shared by the price-board engine and its drivers.
//!
//! This crate aggregates:
//! - `error`: unified error type `BoardError` used across the workspace.
//! - `result`: handy `Result<T, BoardError>` alias.
//! - `quote`: the `Quote` row and the `QuoteField` column vocabulary.
//! - `number`: normalization of feed numbers written with thousands separators.
//! - `filters`: categorical filters and sort configuration chosen by the UI.
//! - `command`: commands and events exchanged with the background workers.
#![warn(missing_docs)]
pub mod command;
pub mod error;
pub mod filters;
pub mod number;
pub mod quote;
pub mod result;

pub use error::BoardError;
pub use quote::{Quote, QuoteField};
pub use result::Result;

/// Monotonic tag minted by the store for every quote batch it dispatches.
pub type BatchTimestamp = u64;
