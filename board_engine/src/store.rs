//! The single stateful coordination point between the feed, the UI and the
//! background workers.
//!
//! `QuoteStore` holds the latest quotes, the filtered view, the previous-values
//! snapshot, mirrors of both caches, UI flags and performance metrics. It mints
//! a monotonic timestamp for every dispatch and applies a worker reply only if
//! its timestamp is not older than the newest one dispatched for that worker,
//! so a slow reply for an old batch can never overwrite a newer one.
//!
//! Workers are started by [`QuoteStore::initialize`]. Until then, after
//! [`QuoteStore::terminate`], or when a worker cannot be spawned or dies, the
//! same processing runs inline on the caller's thread (degraded mode).
//!
//! Consumers observe changes through [`QuoteStore::subscribe`]; the store
//! itself is driven by [`QuoteStore::pump`] or [`QuoteStore::wait_idle`].
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use board_common::command::{
    BatchSummary, CacheKind, CacheUpdate, ColorBatchRequest, ColorCommand, ColorEvent,
    FilterRequest, FilterResponse, FilterStats, Priority, QuoteStyles,
};
use board_common::filters::{FilterConfig, SortConfig};
use board_common::{BatchTimestamp, Quote, QuoteField, Result};
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TryRecvError, never, select, unbounded};
use log::{debug, warn};

use crate::cache::{ClassCache, build_cache};
use crate::color_worker::{ColorProcessor, ColorWorker, animation_key, color_key};
use crate::config::EngineConfig;
use crate::filter;
use crate::filter_worker::FilterWorker;

/// Flags the UI toggles and renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiFlags {
    /// Table is loading.
    pub loading: bool,
    /// Watchlist panel visible.
    pub show_watchlist: bool,
    /// Chart is loading.
    pub chart_loading: bool,
    /// Last chart error, if any.
    pub chart_error: Option<String>,
}

/// Timings and counts of the last accepted passes.
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    /// Last accepted filter pass.
    pub filter: FilterStats,
    /// Last accepted color batch.
    pub color: Option<BatchSummary>,
}

/// Change notifications sent to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A new filtered view was accepted.
    FilteredDataChanged {
        /// Tag of the filter pass.
        batch_timestamp: BatchTimestamp,
        /// Quotes in the view.
        items_out: usize,
    },
    /// A chunk of styles was accepted.
    StylesChanged {
        /// Tag of the batch.
        batch_timestamp: BatchTimestamp,
        /// Zero-based chunk index.
        chunk_index: usize,
        /// Chunks in the batch.
        total_chunks: usize,
    },
    /// Every chunk of the latest batch was accepted.
    BatchCompleted {
        /// Tag of the batch.
        batch_timestamp: BatchTimestamp,
        /// Quotes in the batch.
        stock_count: usize,
    },
    /// A UI flag changed.
    FlagsChanged,
    /// Both caches were cleared.
    CachesCleared,
}

/// One change applied through [`QuoteStore::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreUpdate {
    /// Free-text search.
    SearchQuery(String),
    /// Categorical filters.
    Filters(FilterConfig),
    /// Sort column and direction.
    Sort(SortConfig),
    /// Watchlist visibility.
    ShowWatchlist(bool),
    /// Theme; a change clears the caches and recolors the current quotes.
    DarkMode(bool),
    /// Scheduling hint for the color worker.
    Priority(Priority),
    /// Table loading flag.
    Loading(bool),
    /// Chart loading flag.
    ChartLoading(bool),
    /// Chart error message.
    ChartError(Option<String>),
}

enum ColorBackend {
    Worker(ColorWorker),
    Inline(ColorProcessor),
}

enum FilterBackend {
    Worker(FilterWorker),
    Inline,
}

/// Owned state of one price board.
pub struct QuoteStore {
    config: EngineConfig,
    color: ColorBackend,
    filter: FilterBackend,

    quotes: Arc<Vec<Quote>>,
    filtered: Vec<Quote>,
    previous_values: Arc<HashMap<String, Quote>>,
    styles: HashMap<String, QuoteStyles>,
    styles_batch: BatchTimestamp,
    color_cache: Box<dyn ClassCache>,
    animation_cache: Box<dyn ClassCache>,

    search_query: String,
    filters: FilterConfig,
    sort: SortConfig,
    is_dark_mode: bool,
    priority: Priority,
    flags: UiFlags,
    metrics: PerformanceMetrics,

    clock: BatchTimestamp,
    color_batch: BatchTimestamp,
    color_done: BatchTimestamp,
    filter_batch: BatchTimestamp,
    filter_done: BatchTimestamp,
    last_color_request: Option<ColorBatchRequest>,
    last_filter_request: Option<FilterRequest>,

    subscribers: Vec<Sender<StoreEvent>>,
}

impl QuoteStore {
    /// Empty store in degraded (inline) mode; call [`Self::initialize`] to
    /// start the workers.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            color: ColorBackend::Inline(ColorProcessor::new(&config)),
            filter: FilterBackend::Inline,
            quotes: Arc::new(Vec::new()),
            filtered: Vec::new(),
            previous_values: Arc::new(HashMap::new()),
            styles: HashMap::new(),
            styles_batch: 0,
            color_cache: build_cache(config.color_cache, "store color"),
            animation_cache: build_cache(config.animation_cache, "store animation"),
            search_query: String::new(),
            filters: FilterConfig::default(),
            sort: SortConfig::default(),
            is_dark_mode: false,
            priority: Priority::Normal,
            flags: UiFlags::default(),
            metrics: PerformanceMetrics::default(),
            clock: 0,
            color_batch: 0,
            color_done: 0,
            filter_batch: 0,
            filter_done: 0,
            last_color_request: None,
            last_filter_request: None,
            subscribers: Vec::new(),
            config,
        })
    }

    /// Start both workers. A worker that fails to start is logged and its
    /// work keeps running inline.
    pub fn initialize(&mut self) {
        self.initialize_with(ColorWorker::spawn, |_| FilterWorker::spawn());
    }

    /// [`Self::initialize`] with custom worker constructors.
    pub fn initialize_with<C, F>(&mut self, spawn_color: C, spawn_filter: F)
    where
        C: FnOnce(&EngineConfig) -> Result<ColorWorker>,
        F: FnOnce(&EngineConfig) -> Result<FilterWorker>,
    {
        if matches!(self.color, ColorBackend::Inline(_)) {
            match spawn_color(&self.config) {
                Ok(worker) => self.color = ColorBackend::Worker(worker),
                Err(e) => warn!("{}; colorizing inline", e),
            }
        }
        if matches!(self.filter, FilterBackend::Inline) {
            match spawn_filter(&self.config) {
                Ok(worker) => self.filter = FilterBackend::Worker(worker),
                Err(e) => warn!("{}; filtering inline", e),
            }
        }
    }

    /// Stop both workers and return to inline mode.
    pub fn terminate(&mut self) {
        if let ColorBackend::Worker(worker) = &mut self.color {
            worker.terminate();
            self.color = ColorBackend::Inline(ColorProcessor::new(&self.config));
        }
        if let FilterBackend::Worker(worker) = &mut self.filter {
            worker.terminate();
            self.filter = FilterBackend::Inline;
        }
    }

    /// `true` while any processing runs inline instead of on a worker.
    pub fn is_degraded(&self) -> bool {
        matches!(self.color, ColorBackend::Inline(_)) || matches!(self.filter, FilterBackend::Inline)
    }

    /// Receive every future [`StoreEvent`]. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Take a fresh quote batch from the feed and dispatch it to both workers.
    /// Returns the batch timestamp.
    pub fn push_batch(&mut self, quotes: Vec<Quote>) -> BatchTimestamp {
        let batch_timestamp = self.mint();
        self.quotes = Arc::new(quotes);
        let previous_values = Arc::clone(&self.previous_values);
        self.dispatch_color(batch_timestamp, previous_values);
        self.filter_batch = batch_timestamp;
        self.dispatch_filter(batch_timestamp);
        batch_timestamp
    }

    /// Apply several updates at once: at most one refilter, one recolor and
    /// one flag notification.
    pub fn apply(&mut self, updates: Vec<StoreUpdate>) {
        let mut refilter = false;
        let mut restyle = false;
        let mut flags_changed = false;

        for update in updates {
            match update {
                StoreUpdate::SearchQuery(query) => {
                    refilter |= query != self.search_query;
                    self.search_query = query;
                }
                StoreUpdate::Filters(filters) => {
                    refilter |= filters != self.filters;
                    self.filters = filters;
                }
                StoreUpdate::Sort(sort) => {
                    refilter |= sort != self.sort;
                    self.sort = sort;
                }
                StoreUpdate::ShowWatchlist(show) => {
                    if show != self.flags.show_watchlist {
                        self.flags.show_watchlist = show;
                        refilter = true;
                        flags_changed = true;
                    }
                }
                StoreUpdate::DarkMode(dark) => {
                    restyle |= dark != self.is_dark_mode;
                    self.is_dark_mode = dark;
                }
                StoreUpdate::Priority(priority) => self.priority = priority,
                StoreUpdate::Loading(loading) => {
                    flags_changed |= loading != self.flags.loading;
                    self.flags.loading = loading;
                }
                StoreUpdate::ChartLoading(loading) => {
                    flags_changed |= loading != self.flags.chart_loading;
                    self.flags.chart_loading = loading;
                }
                StoreUpdate::ChartError(error) => {
                    flags_changed |= error != self.flags.chart_error;
                    self.flags.chart_error = error;
                }
            }
        }

        if restyle {
            self.clear_caches();
            self.restyle();
        }
        if refilter {
            self.refilter();
        }
        if flags_changed {
            self.notify(StoreEvent::FlagsChanged);
        }
    }

    /// Set the free-text search.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.apply(vec![StoreUpdate::SearchQuery(query.into())]);
    }

    /// Set the categorical filters.
    pub fn set_filters(&mut self, filters: FilterConfig) {
        self.apply(vec![StoreUpdate::Filters(filters)]);
    }

    /// Set the sort column and direction.
    pub fn set_sort(&mut self, sort: SortConfig) {
        self.apply(vec![StoreUpdate::Sort(sort)]);
    }

    /// Switch theme.
    pub fn set_dark_mode(&mut self, dark: bool) {
        self.apply(vec![StoreUpdate::DarkMode(dark)]);
    }

    /// Show or hide the watchlist.
    pub fn set_show_watchlist(&mut self, show: bool) {
        self.apply(vec![StoreUpdate::ShowWatchlist(show)]);
    }

    /// Scheduling hint for future batches.
    pub fn set_priority(&mut self, priority: Priority) {
        self.apply(vec![StoreUpdate::Priority(priority)]);
    }

    /// Table loading flag.
    pub fn set_loading(&mut self, loading: bool) {
        self.apply(vec![StoreUpdate::Loading(loading)]);
    }

    /// Chart loading flag.
    pub fn set_chart_loading(&mut self, loading: bool) {
        self.apply(vec![StoreUpdate::ChartLoading(loading)]);
    }

    /// Chart error; `None` clears it.
    pub fn set_chart_error(&mut self, error: Option<String>) {
        self.apply(vec![StoreUpdate::ChartError(error)]);
    }

    /// Drop both caches here and in the color worker.
    pub fn clear_caches(&mut self) {
        self.color_cache.clear();
        self.animation_cache.clear();
        match &mut self.color {
            ColorBackend::Worker(worker) => {
                if let Err(e) = worker.send(ColorCommand::ClearCache) {
                    warn!("{}", e);
                }
            }
            ColorBackend::Inline(processor) => processor.clear(),
        }
        self.notify(StoreEvent::CachesCleared);
    }

    /// Apply every worker reply already received. Returns how many replies
    /// were read, stale ones included.
    pub fn pump(&mut self) -> usize {
        let mut read = 0;

        if let ColorBackend::Worker(worker) = &self.color {
            let rx = worker.events().clone();
            loop {
                match rx.try_recv() {
                    Ok(event) => {
                        read += 1;
                        self.on_color_event(event);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.color_worker_lost();
                        break;
                    }
                }
            }
        }

        if let FilterBackend::Worker(worker) = &self.filter {
            let rx = worker.results().clone();
            loop {
                match rx.try_recv() {
                    Ok(response) => {
                        read += 1;
                        self.on_filter_response(response);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.filter_worker_lost();
                        break;
                    }
                }
            }
        }

        read
    }

    /// Block until the latest batch summary and filter pass are accepted, or
    /// until `timeout`. Returns `true` when idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.is_idle() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            let color_rx = match &self.color {
                ColorBackend::Worker(worker) => worker.events().clone(),
                ColorBackend::Inline(_) => never(),
            };
            let filter_rx = match &self.filter {
                FilterBackend::Worker(worker) => worker.results().clone(),
                FilterBackend::Inline => never(),
            };
            select! {
                recv(color_rx) -> msg => match msg {
                    Ok(event) => self.on_color_event(event),
                    Err(_) => self.color_worker_lost(),
                },
                recv(filter_rx) -> msg => match msg {
                    Ok(response) => self.on_filter_response(response),
                    Err(_) => self.filter_worker_lost(),
                },
                default(remaining) => return self.is_idle(),
            }
        }
    }

    /// `true` when no dispatched work is outstanding.
    pub fn is_idle(&self) -> bool {
        self.color_done >= self.color_batch && self.filter_done >= self.filter_batch
    }

    /// Latest quotes in feed order.
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    /// Latest accepted filtered and sorted view.
    pub fn filtered(&self) -> &[Quote] {
        &self.filtered
    }

    /// Styles of `code` from the latest accepted batch.
    pub fn styles(&self, code: &str) -> Option<&QuoteStyles> {
        self.styles.get(code)
    }

    /// Snapshot the next batch is compared against for animations.
    pub fn previous_values(&self) -> &HashMap<String, Quote> {
        &self.previous_values
    }

    /// Color class of `field` from the cache mirror.
    pub fn price_color(&mut self, quote: &Quote, field: QuoteField) -> Option<String> {
        let key = color_key(quote, field, self.is_dark_mode);
        self.color_cache.get(&key)
    }

    /// Animation class of `field` from the cache mirror.
    pub fn animation(&mut self, quote: &Quote, previous: &Quote, field: QuoteField) -> Option<String> {
        let key = animation_key(&quote.code, field, previous.field(field), quote.field(field));
        self.animation_cache.get(&key)
    }

    /// UI flags.
    pub fn flags(&self) -> &UiFlags {
        &self.flags
    }

    /// Performance metrics of the last accepted passes.
    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    /// Current search text.
    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Current categorical filters.
    pub fn filters(&self) -> &FilterConfig {
        &self.filters
    }

    /// Current sort.
    pub fn sort(&self) -> &SortConfig {
        &self.sort
    }

    /// Current theme.
    pub fn is_dark_mode(&self) -> bool {
        self.is_dark_mode
    }

    /// Current scheduling hint.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Timestamp of the newest batch dispatched to the color worker.
    pub fn latest_batch_timestamp(&self) -> BatchTimestamp {
        self.color_batch
    }

    /// Wall-clock milliseconds, forced strictly above the previous value.
    fn mint(&mut self) -> BatchTimestamp {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.clock = now.max(self.clock + 1);
        self.clock
    }

    fn restyle(&mut self) {
        if self.quotes.is_empty() {
            return;
        }
        let batch_timestamp = self.mint();
        let current: HashMap<String, Quote> = self
            .quotes
            .iter()
            .map(|quote| (quote.code.clone(), quote.clone()))
            .collect();
        self.dispatch_color(batch_timestamp, Arc::new(current));
    }

    fn refilter(&mut self) {
        let batch_timestamp = self.mint();
        self.filter_batch = batch_timestamp;
        self.dispatch_filter(batch_timestamp);
    }

    fn dispatch_color(
        &mut self,
        batch_timestamp: BatchTimestamp,
        previous_values: Arc<HashMap<String, Quote>>,
    ) {
        self.color_batch = batch_timestamp;
        let request = ColorBatchRequest {
            stocks: Arc::clone(&self.quotes),
            previous_values,
            is_dark_mode: self.is_dark_mode,
            chunk_size: self.config.chunk_size,
            priority: self.priority,
            batch_timestamp,
        };
        self.last_color_request = Some(request.clone());

        if let ColorBackend::Worker(worker) = &self.color {
            match worker.send(ColorCommand::Process(request.clone())) {
                Ok(()) => return,
                Err(e) => {
                    warn!("{}; colorizing inline", e);
                    self.color = ColorBackend::Inline(ColorProcessor::new(&self.config));
                }
            }
        }
        self.color_inline(request);
    }

    fn color_inline(&mut self, request: ColorBatchRequest) {
        let ColorBackend::Inline(processor) = &mut self.color else {
            return;
        };
        let mut events = Vec::new();
        if let Some(mut run) = processor.begin(request) {
            let mut updates = Vec::new();
            while let Some(chunk) = processor.process_next_chunk(&mut run, &mut updates) {
                events.extend(updates.drain(..).map(ColorEvent::CacheUpdate));
                events.push(ColorEvent::ChunkResults(chunk));
            }
            events.push(ColorEvent::BatchResults(processor.finish(run)));
        }
        for event in events {
            self.on_color_event(event);
        }
    }

    fn dispatch_filter(&mut self, batch_timestamp: BatchTimestamp) {
        let request = FilterRequest {
            batch_timestamp,
            data: Arc::clone(&self.quotes),
            search_query: self.search_query.clone(),
            filters: self.filters,
            sort: self.sort,
            show_watchlist: self.flags.show_watchlist,
        };
        self.last_filter_request = Some(request.clone());

        if let FilterBackend::Worker(worker) = &self.filter {
            match worker.send(request.clone()) {
                Ok(()) => return,
                Err(e) => {
                    warn!("{}; filtering inline", e);
                    self.filter = FilterBackend::Inline;
                }
            }
        }
        let response = filter::apply(&request);
        self.on_filter_response(response);
    }

    fn color_worker_lost(&mut self) {
        warn!("Color worker disconnected; colorizing inline");
        self.color = ColorBackend::Inline(ColorProcessor::new(&self.config));
        if self.color_done < self.color_batch {
            if let Some(request) = self.last_color_request.clone() {
                self.color_inline(request);
            }
        }
    }

    fn filter_worker_lost(&mut self) {
        warn!("Filter worker disconnected; filtering inline");
        self.filter = FilterBackend::Inline;
        if self.filter_done < self.filter_batch {
            if let Some(request) = self.last_filter_request.clone() {
                let response = filter::apply(&request);
                self.on_filter_response(response);
            }
        }
    }

    fn on_color_event(&mut self, event: ColorEvent) {
        match event {
            ColorEvent::ChunkResults(chunk) => {
                if chunk.batch_timestamp < self.color_batch {
                    debug!(
                        "Ignoring chunk {} of stale batch {}",
                        chunk.chunk_index, chunk.batch_timestamp
                    );
                    return;
                }
                if chunk.batch_timestamp > self.styles_batch {
                    self.styles.clear();
                    self.styles_batch = chunk.batch_timestamp;
                }
                self.styles.extend(chunk.results);
                self.notify(StoreEvent::StylesChanged {
                    batch_timestamp: chunk.batch_timestamp,
                    chunk_index: chunk.chunk_index,
                    total_chunks: chunk.total_chunks,
                });
            }
            ColorEvent::CacheUpdate(update) => self.mirror(update),
            ColorEvent::BatchResults(summary) => {
                if summary.batch_timestamp < self.color_batch {
                    debug!("Ignoring summary of stale batch {}", summary.batch_timestamp);
                    return;
                }
                // an empty batch produces no chunk, so no styles either
                if summary.batch_timestamp > self.styles_batch {
                    self.styles.clear();
                    self.styles_batch = summary.batch_timestamp;
                }
                self.color_done = summary.batch_timestamp;
                if let Some(request) = &self.last_color_request {
                    if request.batch_timestamp == summary.batch_timestamp {
                        self.previous_values = Arc::new(
                            request
                                .stocks
                                .iter()
                                .map(|quote| (quote.code.clone(), quote.clone()))
                                .collect(),
                        );
                    }
                }
                let event = StoreEvent::BatchCompleted {
                    batch_timestamp: summary.batch_timestamp,
                    stock_count: summary.stock_count,
                };
                self.metrics.color = Some(summary);
                self.notify(event);
            }
            ColorEvent::CacheCleared => debug!("Color worker caches cleared"),
        }
    }

    // Keys carry every classifier input, so entries from superseded batches stay valid.
    fn mirror(&mut self, update: CacheUpdate) {
        match update.kind {
            CacheKind::Color => self.color_cache.set(update.key, update.value),
            CacheKind::Animation => self.animation_cache.set(update.key, update.value),
        }
    }

    fn on_filter_response(&mut self, response: FilterResponse) {
        if response.batch_timestamp < self.filter_batch {
            debug!("Ignoring stale filter pass {}", response.batch_timestamp);
            return;
        }
        self.filter_done = response.batch_timestamp;
        self.filtered = response.filtered_data;
        self.metrics.filter = response.stats;
        self.notify(StoreEvent::FilteredDataChanged {
            batch_timestamp: response.batch_timestamp,
            items_out: self.filtered.len(),
        });
    }

    fn notify(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_common::filters::{PriceChangeFilter, SortDirection};

    fn quote(code: &str, price: &str, change: &str) -> Quote {
        Quote::new(code)
            .with(QuoteField::MatchPrice, price)
            .with(QuoteField::Ref, "10")
            .with(QuoteField::Ceiling, "11")
            .with(QuoteField::Floor, "9")
            .with(QuoteField::MatchChange, change)
    }

    fn inline_store() -> QuoteStore {
        QuoteStore::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn inline_batch_updates_everything_synchronously() {
        let mut store = inline_store();
        assert!(store.is_degraded());
        let events = store.subscribe();

        let ts = store.push_batch(vec![quote("VNM", "10.5", "0.5"), quote("FPT", "9.5", "-0.5")]);
        assert!(store.is_idle());
        assert_eq!(store.filtered().len(), 2);
        assert_eq!(
            store.styles("VNM").unwrap().price_colors[&QuoteField::MatchPrice],
            "text-green-600"
        );
        assert_eq!(store.previous_values().len(), 2);
        assert_eq!(store.metrics().color.as_ref().unwrap().stock_count, 2);
        assert_eq!(store.metrics().filter.items_in, 2);

        let received: Vec<StoreEvent> = events.try_iter().collect();
        assert!(received.contains(&StoreEvent::BatchCompleted {
            batch_timestamp: ts,
            stock_count: 2
        }));
        assert!(received.iter().any(|e| matches!(e, StoreEvent::FilteredDataChanged { items_out: 2, .. })));
    }

    #[test]
    fn cache_mirror_is_filled_from_updates() {
        let mut store = inline_store();
        let vnm = quote("VNM", "10.5", "0.5");
        store.push_batch(vec![vnm.clone()]);
        assert_eq!(
            store.price_color(&vnm, QuoteField::MatchPrice).as_deref(),
            Some("text-green-600")
        );

        let moved = quote("VNM", "10.8", "0.8");
        store.push_batch(vec![moved.clone()]);
        assert_eq!(
            store.animation(&moved, &vnm, QuoteField::MatchPrice).as_deref(),
            Some("price-up")
        );
        assert_eq!(
            store.styles("VNM").unwrap().animations[&QuoteField::MatchPrice],
            "price-up"
        );
    }

    #[test]
    fn timestamps_are_strictly_increasing() {
        let mut store = inline_store();
        let a = store.push_batch(vec![]);
        let b = store.push_batch(vec![]);
        let c = store.push_batch(vec![]);
        assert!(a < b && b < c);
        assert_eq!(store.latest_batch_timestamp(), c);
    }

    #[test]
    fn stale_replies_are_ignored() {
        let mut store = inline_store();
        store.push_batch(vec![quote("NEW", "10.5", "1")]);
        let stale = FilterResponse {
            batch_timestamp: 1,
            filtered_data: vec![Quote::new("OLD")],
            show_watchlist: false,
            stats: FilterStats::default(),
        };
        store.on_filter_response(stale);
        assert_eq!(store.filtered()[0].code, "NEW");

        let mut results = HashMap::new();
        results.insert("OLD".to_string(), QuoteStyles::default());
        store.on_color_event(ColorEvent::ChunkResults(board_common::command::ChunkResults {
            batch_timestamp: 1,
            chunk_index: 3,
            total_chunks: 4,
            results,
        }));
        assert!(store.styles("OLD").is_none());
        assert!(store.styles("NEW").is_some());
    }

    #[test]
    fn batch_update_refilters_once_and_notifies_flags() {
        let mut store = inline_store();
        store.push_batch(vec![
            quote("VNM", "10.5", "0.5"),
            quote("FPT", "9.5", "-0.5"),
            quote("ACB", "10.2", "0.2"),
        ]);
        let events = store.subscribe();
        store.apply(vec![
            StoreUpdate::Filters(FilterConfig {
                price_change: PriceChangeFilter::Up,
                ..Default::default()
            }),
            StoreUpdate::Sort(SortConfig::by(QuoteField::Code, SortDirection::Asc)),
            StoreUpdate::Loading(true),
        ]);
        let codes: Vec<&str> = store.filtered().iter().map(|q| q.code.as_str()).collect();
        assert_eq!(codes, vec!["ACB", "VNM"]);
        assert!(store.flags().loading);

        let received: Vec<StoreEvent> = events.try_iter().collect();
        let refilters = received
            .iter()
            .filter(|e| matches!(e, StoreEvent::FilteredDataChanged { .. }))
            .count();
        assert_eq!(refilters, 1);
        assert!(received.contains(&StoreEvent::FlagsChanged));
    }

    #[test]
    fn theme_change_clears_caches_and_recolors() {
        let mut store = inline_store();
        let vnm = quote("VNM", "10.5", "0.5");
        store.push_batch(vec![vnm.clone()]);
        let events = store.subscribe();

        store.set_dark_mode(true);
        assert!(store.is_dark_mode());
        assert_eq!(
            store.styles("VNM").unwrap().price_colors[&QuoteField::MatchPrice],
            "text-green-400"
        );
        // recoloring compares against the same quotes, so nothing flashes
        assert!(store.styles("VNM").unwrap().animations.is_empty());
        assert_eq!(store.price_color(&vnm, QuoteField::MatchPrice).as_deref(), Some("text-green-400"));
        assert!(events.try_iter().any(|e| e == StoreEvent::CachesCleared));

        // same theme again is a no-op
        let events = store.subscribe();
        store.set_dark_mode(true);
        assert!(events.try_iter().next().is_none());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut store = inline_store();
        let rx = store.subscribe();
        drop(rx);
        let kept = store.subscribe();
        store.set_show_watchlist(true);
        assert_eq!(store.subscribers.len(), 1);
        assert!(kept.try_iter().any(|e| e == StoreEvent::FlagsChanged));
    }

    #[test]
    fn chart_flags_notify_only_on_change() {
        let mut store = inline_store();
        let events = store.subscribe();
        store.set_chart_loading(true);
        store.set_chart_error(Some("feed offline".into()));
        store.set_chart_error(Some("feed offline".into()));
        assert!(store.flags().chart_loading);
        assert_eq!(store.flags().chart_error.as_deref(), Some("feed offline"));
        assert_eq!(events.try_iter().count(), 2);

        store.set_loading(false);
        assert!(events.try_iter().next().is_none());
    }

    #[test]
    fn mirror_fills_when_batches_arrive_back_to_back() {
        let mut store = inline_store();
        store.initialize();
        assert!(!store.is_degraded());
        let vnm = quote("VNM", "10.5", "0.5");

        // the second batch hits the worker cache and emits no update of its own
        store.push_batch(vec![vnm.clone()]);
        store.push_batch(vec![vnm.clone()]);
        assert!(store.wait_idle(Duration::from_secs(5)));

        let deadline = Instant::now() + Duration::from_secs(5);
        while store.price_color(&vnm, QuoteField::MatchPrice).is_none() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
            store.pump();
        }
        assert_eq!(
            store.price_color(&vnm, QuoteField::MatchPrice).as_deref(),
            Some("text-green-600")
        );
        store.terminate();
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            max_updates_per_frame: 0,
            ..Default::default()
        };
        assert!(QuoteStore::new(config).is_err());
    }
}
