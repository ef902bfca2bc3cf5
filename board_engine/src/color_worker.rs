//! Background colorization of quote batches.
//!
//! The worker owns a [`ColorProcessor`] and runs it on a dedicated thread that
//! talks to the store exclusively through `crossbeam_channel`:
//!
//! - `ColorCommand::Process`: split the batch into chunks, emit one
//!   `ColorEvent::ChunkResults` per chunk and a `ColorEvent::BatchResults`
//!   summary when every chunk of a still-current batch is done.
//! - `ColorCommand::ClearCache`: reset caches and the staleness timestamp.
//! - `ColorCommand::Shutdown`: stop the thread.
//!
//! Freshly computed cache entries are queued and released as
//! `ColorEvent::CacheUpdate` at most `max_updates_per_frame` per frame tick.
//!
//! Between chunks the worker polls its mailbox. A batch with a newer timestamp
//! supersedes the running one: the running batch stops without a summary and
//! the newer one is processed next. A batch older than the newest timestamp
//! seen is dropped without any output.
use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use board_common::command::{
    BatchSummary, CacheKind, CacheUpdate, ChunkResults, ColorBatchRequest, ColorCommand,
    ColorEvent, Priority, QuoteStyles,
};
use board_common::number;
use board_common::quote::{PRICE_FIELDS, VOLUME_FIELDS};
use board_common::{BatchTimestamp, BoardError, Quote, QuoteField, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError, after, never, select, tick, unbounded};
use log::{debug, error, info};

use crate::cache::{ClassCache, build_cache};
use crate::classify::{ChangeKind, classify_change, classify_price_color};
use crate::config::EngineConfig;
use crate::frame_queue::FrameQueue;

/// Cache key of a price color: every classifier input plus the theme.
pub fn color_key(quote: &Quote, field: QuoteField, is_dark_mode: bool) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        quote.field(field),
        quote.ref_price,
        quote.ceiling,
        quote.floor,
        if is_dark_mode { "dark" } else { "light" }
    )
}

/// Cache key of a change animation for one field of one quote.
pub fn animation_key(code: &str, field: QuoteField, previous: &str, current: &str) -> String {
    format!("{}:{}:{}>{}", code, field, previous, current)
}

/// Progress through one accepted batch.
pub struct BatchRun {
    request: ColorBatchRequest,
    chunk_size: usize,
    total_chunks: usize,
    next_chunk: usize,
    chunk_delay: Duration,
    started: Instant,
}

impl BatchRun {
    /// Tag of the batch.
    pub fn batch_timestamp(&self) -> BatchTimestamp {
        self.request.batch_timestamp
    }

    /// Number of chunks in the batch.
    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    /// `true` once every chunk has been processed.
    pub fn is_finished(&self) -> bool {
        self.next_chunk >= self.total_chunks
    }

    /// Pause to insert after a chunk that is not the last one.
    pub fn chunk_delay(&self) -> Duration {
        self.chunk_delay
    }
}

/// Chunked color/animation computation with its own caches and staleness
/// timestamp. Used by the worker thread and, in degraded mode, inline by the
/// store.
pub struct ColorProcessor {
    color_cache: Box<dyn ClassCache>,
    animation_cache: Box<dyn ClassCache>,
    latest_batch_timestamp: BatchTimestamp,
    low_priority_delay: Duration,
}

impl ColorProcessor {
    /// Processor with caches built from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            color_cache: build_cache(config.color_cache, "worker color"),
            animation_cache: build_cache(config.animation_cache, "worker animation"),
            latest_batch_timestamp: 0,
            low_priority_delay: config.low_priority_delay(),
        }
    }

    /// Newest batch timestamp seen so far.
    pub fn latest_batch_timestamp(&self) -> BatchTimestamp {
        self.latest_batch_timestamp
    }

    /// Record `batch_timestamp`; returns `false` when it is older than the
    /// newest one already seen.
    pub fn observe(&mut self, batch_timestamp: BatchTimestamp) -> bool {
        if batch_timestamp < self.latest_batch_timestamp {
            return false;
        }
        self.latest_batch_timestamp = batch_timestamp;
        true
    }

    /// Accept a batch, or `None` when it is stale.
    pub fn begin(&mut self, request: ColorBatchRequest) -> Option<BatchRun> {
        if !self.observe(request.batch_timestamp) {
            return None;
        }
        let chunk_size = request.chunk_size.max(1);
        let total_chunks = request.stocks.len().div_ceil(chunk_size);
        let chunk_delay = match request.priority {
            Priority::Normal => Duration::ZERO,
            Priority::Low => self.low_priority_delay,
        };
        Some(BatchRun {
            request,
            chunk_size,
            total_chunks,
            next_chunk: 0,
            chunk_delay,
            started: Instant::now(),
        })
    }

    /// `false` once a newer batch has been observed.
    pub fn is_current(&self, run: &BatchRun) -> bool {
        run.batch_timestamp() >= self.latest_batch_timestamp
    }

    /// Process the next chunk of `run`. Freshly computed cache entries are
    /// appended to `updates`.
    pub fn process_next_chunk(
        &mut self,
        run: &mut BatchRun,
        updates: &mut Vec<CacheUpdate>,
    ) -> Option<ChunkResults> {
        if run.is_finished() {
            return None;
        }
        let chunk_index = run.next_chunk;
        run.next_chunk += 1;

        let stocks = &run.request.stocks;
        let start = chunk_index * run.chunk_size;
        let end = (start + run.chunk_size).min(stocks.len());
        let batch_timestamp = run.request.batch_timestamp;
        let is_dark_mode = run.request.is_dark_mode;

        let mut results = HashMap::with_capacity(end - start);
        for quote in &stocks[start..end] {
            let previous = run.request.previous_values.get(&quote.code);
            let styles = self.style_quote(quote, previous, is_dark_mode, batch_timestamp, updates);
            results.insert(quote.code.clone(), styles);
        }

        Some(ChunkResults {
            batch_timestamp,
            chunk_index,
            total_chunks: run.total_chunks,
            results,
        })
    }

    /// Summary of a fully processed batch.
    pub fn finish(&self, run: BatchRun) -> BatchSummary {
        BatchSummary {
            batch_timestamp: run.request.batch_timestamp,
            stock_count: run.request.stocks.len(),
            processing_time: run.started.elapsed(),
            chunk_count: run.total_chunks,
            chunk_delay: run.chunk_delay,
        }
    }

    /// Drop both caches and forget the newest timestamp.
    pub fn clear(&mut self) {
        self.color_cache.clear();
        self.animation_cache.clear();
        self.latest_batch_timestamp = 0;
    }

    fn style_quote(
        &mut self,
        quote: &Quote,
        previous: Option<&Quote>,
        is_dark_mode: bool,
        batch_timestamp: BatchTimestamp,
        updates: &mut Vec<CacheUpdate>,
    ) -> QuoteStyles {
        let mut styles = QuoteStyles::default();

        for field in PRICE_FIELDS {
            let current = quote.field(field);
            if number::parse(current).is_none() {
                continue;
            }
            let key = color_key(quote, field, is_dark_mode);
            let class = match self.color_cache.get(&key) {
                Some(class) => class,
                None => {
                    let class = classify_price_color(
                        current,
                        &quote.ref_price,
                        &quote.ceiling,
                        &quote.floor,
                    )
                    .css_class(is_dark_mode)
                    .to_string();
                    self.color_cache.set(key.clone(), class.clone());
                    updates.push(CacheUpdate {
                        batch_timestamp,
                        kind: CacheKind::Color,
                        key,
                        value: class.clone(),
                    });
                    class
                }
            };
            styles.price_colors.insert(field, class);

            if let Some(class) =
                self.animate(quote, previous, field, ChangeKind::Price, batch_timestamp, updates)
            {
                styles.animations.insert(field, class);
            }
        }

        for field in VOLUME_FIELDS {
            if let Some(class) =
                self.animate(quote, previous, field, ChangeKind::Volume, batch_timestamp, updates)
            {
                styles.animations.insert(field, class);
            }
        }

        styles
    }

    fn animate(
        &mut self,
        quote: &Quote,
        previous: Option<&Quote>,
        field: QuoteField,
        kind: ChangeKind,
        batch_timestamp: BatchTimestamp,
        updates: &mut Vec<CacheUpdate>,
    ) -> Option<String> {
        let before = previous?.field(field);
        let current = quote.field(field);
        if before.is_empty() || before == current {
            return None;
        }
        let key = animation_key(&quote.code, field, before, current);
        if let Some(class) = self.animation_cache.get(&key) {
            return Some(class);
        }
        let class = classify_change(current, before, kind)?.css_class().to_string();
        self.animation_cache.set(key.clone(), class.clone());
        updates.push(CacheUpdate {
            batch_timestamp,
            kind: CacheKind::Animation,
            key,
            value: class.clone(),
        });
        Some(class)
    }
}

/// What the worker loop does after a batch.
enum Flow {
    Next(Option<ColorBatchRequest>),
    Stop,
}

struct ColorLoop {
    processor: ColorProcessor,
    queue: FrameQueue<CacheUpdate>,
    cmd_rx: Receiver<ColorCommand>,
    event_tx: Sender<ColorEvent>,
    frames: Receiver<Instant>,
}

impl ColorLoop {
    fn run(mut self) {
        info!("Color worker started (Thread ID: {:?})", thread::current().id());
        let mut next: Option<ColorBatchRequest> = None;

        loop {
            let command = match next.take() {
                Some(request) => ColorCommand::Process(request),
                None => match self.wait_command() {
                    Some(command) => command,
                    None => break,
                },
            };
            match command {
                ColorCommand::Process(request) => match self.run_batch(request) {
                    Flow::Next(request) => next = request,
                    Flow::Stop => break,
                },
                ColorCommand::ClearCache => {
                    if !self.clear_cache() {
                        break;
                    }
                }
                ColorCommand::Shutdown => break,
            }
        }
        info!("Color worker stopping...");
    }

    /// Block until a command arrives, flushing queued cache updates on frame
    /// ticks meanwhile. `None` when the store is gone.
    fn wait_command(&mut self) -> Option<ColorCommand> {
        let cmd_rx = self.cmd_rx.clone();
        loop {
            let frames = if self.queue.is_empty() {
                never()
            } else {
                self.frames.clone()
            };
            select! {
                recv(cmd_rx) -> msg => return msg.ok(),
                recv(frames) -> _ => if !self.flush_frame() {
                    return None;
                },
            }
        }
    }

    fn run_batch(&mut self, request: ColorBatchRequest) -> Flow {
        let batch_timestamp = request.batch_timestamp;
        let Some(mut run) = self.processor.begin(request) else {
            debug!("Dropping stale batch {}", batch_timestamp);
            return Flow::Next(None);
        };

        let mut next = None;
        let mut updates = Vec::new();
        while let Some(chunk) = self.processor.process_next_chunk(&mut run, &mut updates) {
            let chunk_index = chunk.chunk_index;
            self.queue.extend(updates.drain(..));
            if self.event_tx.send(ColorEvent::ChunkResults(chunk)).is_err() {
                return Flow::Stop;
            }

            let delay = if run.is_finished() {
                Duration::ZERO
            } else {
                run.chunk_delay()
            };
            if !self.yield_between_chunks(delay, &mut next) {
                return Flow::Stop;
            }
            if !self.processor.is_current(&run) {
                debug!(
                    "Batch {} superseded after chunk {}/{}",
                    batch_timestamp,
                    chunk_index + 1,
                    run.total_chunks()
                );
                return Flow::Next(next);
            }
        }

        let summary = self.processor.finish(run);
        debug!(
            "Batch {} done: {} quotes in {:?}",
            batch_timestamp, summary.stock_count, summary.processing_time
        );
        if self.event_tx.send(ColorEvent::BatchResults(summary)).is_err() {
            return Flow::Stop;
        }
        Flow::Next(next)
    }

    /// Serve the mailbox and frame ticks between two chunks. With a zero
    /// delay this only polls. Returns `false` when the worker must stop.
    fn yield_between_chunks(
        &mut self,
        delay: Duration,
        next: &mut Option<ColorBatchRequest>,
    ) -> bool {
        if delay.is_zero() {
            loop {
                match self.cmd_rx.try_recv() {
                    Ok(command) => {
                        if !self.handle_mid_batch(command, next) {
                            return false;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return false,
                }
            }
            if self.frames.try_recv().is_ok() {
                return self.flush_frame();
            }
            return true;
        }

        let deadline = after(delay);
        let cmd_rx = self.cmd_rx.clone();
        let frames = self.frames.clone();
        loop {
            select! {
                recv(cmd_rx) -> msg => match msg {
                    Ok(command) => {
                        if !self.handle_mid_batch(command, next) {
                            return false;
                        }
                        // a newer batch ends the pause
                        if next.is_some() {
                            return true;
                        }
                    }
                    Err(_) => return false,
                },
                recv(frames) -> _ => if !self.flush_frame() {
                    return false;
                },
                recv(deadline) -> _ => return true,
            }
        }
    }

    fn handle_mid_batch(&mut self, command: ColorCommand, next: &mut Option<ColorBatchRequest>) -> bool {
        match command {
            ColorCommand::Process(request) => {
                if self.processor.observe(request.batch_timestamp) {
                    debug!("Batch {} queued behind the running one", request.batch_timestamp);
                    *next = Some(request);
                } else {
                    debug!("Dropping stale batch {}", request.batch_timestamp);
                }
                true
            }
            ColorCommand::ClearCache => self.clear_cache(),
            ColorCommand::Shutdown => false,
        }
    }

    fn clear_cache(&mut self) -> bool {
        self.processor.clear();
        self.queue.clear();
        self.event_tx.send(ColorEvent::CacheCleared).is_ok()
    }

    fn flush_frame(&mut self) -> bool {
        for update in self.queue.drain_frame() {
            if self.event_tx.send(ColorEvent::CacheUpdate(update)).is_err() {
                return false;
            }
        }
        true
    }
}

/// Handle to the color worker thread.
pub struct ColorWorker {
    cmd_tx: Sender<ColorCommand>,
    event_rx: Receiver<ColorEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ColorWorker {
    /// Thread name of the worker.
    pub const NAME: &'static str = "color-worker";

    /// Start the worker thread.
    pub fn spawn(config: &EngineConfig) -> Result<Self> {
        let (cmd_tx, cmd_rx) = unbounded::<ColorCommand>();
        let (event_tx, event_rx) = unbounded::<ColorEvent>();
        let worker = ColorLoop {
            processor: ColorProcessor::new(config),
            queue: FrameQueue::new(config.max_updates_per_frame),
            cmd_rx,
            event_tx,
            frames: tick(config.frame_interval()),
        };
        let handle = thread::Builder::new()
            .name(Self::NAME.into())
            .spawn(move || worker.run())
            .map_err(|source| BoardError::WorkerSpawn {
                name: Self::NAME,
                source,
            })?;
        Ok(Self {
            cmd_tx,
            event_rx,
            handle: Some(handle),
        })
    }

    /// Post a command; never blocks.
    pub fn send(&self, command: ColorCommand) -> Result<()> {
        self.cmd_tx
            .send(command)
            .map_err(|e| BoardError::ChannelSend(format!("color worker: {}", e)))
    }

    /// Events emitted by the worker.
    pub fn events(&self) -> &Receiver<ColorEvent> {
        &self.event_rx
    }

    /// Ask the thread to stop and wait for it.
    pub fn terminate(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.cmd_tx.send(ColorCommand::Shutdown);
        if handle.join().is_err() {
            error!("Color worker panicked");
        }
    }
}

impl Drop for ColorWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}
