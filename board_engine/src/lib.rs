//!
//! Price-board engine: styling, filtering and state of a live quote table.
//!
//! This crate aggregates:
//! - `config`: cache limits and worker tuning, loadable from JSON.
//! - `cache`: bounded LRU/TTL class-name cache and its unbounded fallback.
//! - `classify`: price-color and change-animation classifiers.
//! - `frame_queue`: per-frame rate limiting of cache updates.
//! - `color_worker`: chunked colorization of quote batches on a thread.
//! - `filter` / `filter_worker`: search, filters and sort, on a thread.
//! - `store`: the facade holding state and coordinating both workers.
#![warn(missing_docs)]
pub mod cache;
pub mod classify;
pub mod color_worker;
pub mod config;
pub mod filter;
pub mod filter_worker;
pub mod frame_queue;
pub mod store;

pub use config::{CacheConfig, EngineConfig};
pub use store::{QuoteStore, StoreEvent, StoreUpdate, UiFlags};
