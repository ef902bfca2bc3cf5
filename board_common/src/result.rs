//! `Result` alias for the board crates.
//!
//! Engine, workers and the feed driver all fail with [`BoardError`], so their
//! signatures read `Result<T>` unless they name another error explicitly.
use crate::error::BoardError;

/// `Result` whose error defaults to [`BoardError`].
pub type Result<T, E = BoardError> = std::result::Result<T, E>;
