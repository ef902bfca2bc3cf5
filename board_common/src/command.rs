//! Commands and events exchanged between the store and its background workers.
//!
//! Workers never share mutable state with the store: a worker receives a
//! command, computes, and answers with events. Every request and every reply
//! carries the `BatchTimestamp` of the quote batch it belongs to so both sides
//! can drop anything older than the newest batch they have seen. Quote data is
//! handed over behind `Arc` because it is immutable once a batch is minted.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::filters::{FilterConfig, SortConfig};
use crate::quote::{Quote, QuoteField};
use crate::BatchTimestamp;

/// Scheduling hint for the color worker.
#[allow(missing_docs)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    /// Chunks are processed back to back.
    #[default]
    Normal,
    /// A pause is inserted between chunks.
    Low,
}

/// One quote batch to colorize and animate.
#[derive(Debug, Clone)]
pub struct ColorBatchRequest {
    /// Quotes in feed order.
    pub stocks: Arc<Vec<Quote>>,
    /// Snapshot of the previous batch keyed by code.
    pub previous_values: Arc<HashMap<String, Quote>>,
    /// Theme the colors are computed for.
    pub is_dark_mode: bool,
    /// Quotes per chunk; zero is treated as one.
    pub chunk_size: usize,
    /// Scheduling hint.
    pub priority: Priority,
    /// Tag of the batch.
    pub batch_timestamp: BatchTimestamp,
}

/// CSS classes computed for one quote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteStyles {
    /// Color class per price field.
    pub price_colors: HashMap<QuoteField, String>,
    /// Animation class per changed field.
    pub animations: HashMap<QuoteField, String>,
}

/// Results for one chunk of a batch.
#[derive(Debug, Clone)]
pub struct ChunkResults {
    /// Tag of the batch the chunk belongs to.
    pub batch_timestamp: BatchTimestamp,
    /// Zero-based chunk index.
    pub chunk_index: usize,
    /// Number of chunks in the batch.
    pub total_chunks: usize,
    /// Styles keyed by quote code.
    pub results: HashMap<String, QuoteStyles>,
}

/// Which cache an update is meant for.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CacheKind {
    Color,
    Animation,
}

/// A single freshly computed cache entry, mirrored into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheUpdate {
    /// Tag of the batch that computed the entry.
    pub batch_timestamp: BatchTimestamp,
    /// Target cache.
    pub kind: CacheKind,
    /// Cache key.
    pub key: String,
    /// CSS class.
    pub value: String,
}

/// Summary sent once every chunk of a still-current batch has been processed.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Tag of the batch.
    pub batch_timestamp: BatchTimestamp,
    /// Quotes in the batch.
    pub stock_count: usize,
    /// Wall-clock time from the first chunk to the last.
    pub processing_time: Duration,
    /// Chunks processed.
    pub chunk_count: usize,
    /// Pause inserted between chunks.
    pub chunk_delay: Duration,
}

/// Commands accepted by the color worker.
#[derive(Debug, Clone)]
pub enum ColorCommand {
    /// Colorize and animate a batch.
    Process(ColorBatchRequest),
    /// Reset the worker caches and its staleness timestamp.
    ClearCache,
    /// Stop the worker thread.
    Shutdown,
}

/// Events emitted by the color worker.
#[derive(Debug, Clone)]
pub enum ColorEvent {
    /// One chunk of results.
    ChunkResults(ChunkResults),
    /// One cache entry; rate limited per frame.
    CacheUpdate(CacheUpdate),
    /// The batch finished.
    BatchResults(BatchSummary),
    /// `ClearCache` was applied.
    CacheCleared,
}

/// One filter/sort pass over a dataset.
#[derive(Debug, Clone)]
pub struct FilterRequest {
    /// Tag of the batch `data` came from.
    pub batch_timestamp: BatchTimestamp,
    /// Full dataset in feed order.
    pub data: Arc<Vec<Quote>>,
    /// Free text matched against code and name.
    pub search_query: String,
    /// Categorical filters.
    pub filters: FilterConfig,
    /// Sort column and direction.
    pub sort: SortConfig,
    /// Passed through unchanged.
    pub show_watchlist: bool,
}

/// Counters reported with every filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterStats {
    /// Quotes in.
    pub items_in: usize,
    /// Quotes that passed.
    pub items_out: usize,
    /// Wall-clock time of the filter and sort pass.
    pub processing_time: Duration,
}

/// Reply of the filter worker.
#[derive(Debug, Clone)]
pub struct FilterResponse {
    /// Tag copied from the request.
    pub batch_timestamp: BatchTimestamp,
    /// Filtered and sorted quotes.
    pub filtered_data: Vec<Quote>,
    /// Copied from the request.
    pub show_watchlist: bool,
    /// Counters.
    pub stats: FilterStats,
}

/// Commands accepted by the filter worker.
#[derive(Debug, Clone)]
pub enum FilterCommand {
    /// Filter and sort a dataset.
    Run(FilterRequest),
    /// Stop the worker thread.
    Shutdown,
}
