//! Price-board feed: drives a `QuoteStore` with synthetic market data and logs
//! what a quote table would render.
//!
//! Internally it wires together:
//!
//! - `QuoteGenerator`: a background thread producing one full quote batch per
//!   interval, either for a generated universe or for the rows of a JSON
//!   snapshot.
//! - `QuoteStore`: the engine facade; batches are pushed into it and its color
//!   and filter workers run in the background.
//! - The main loop: multiplexes incoming batches and a pump tick with
//!   crossbeam `select!`, and logs filtered rows, styles and metrics whenever
//!   the store reports a change.
//!
//! Usage example (CLI):
//! ```bash
//! board_feed --stocks 300 --interval-ms 500 --price-change up --sort totalVolume --desc
//! ```
//!
//! Ctrl+C stops the generator; the store is drained and the workers joined
//! before exit.
#![warn(missing_docs)]
mod args;
mod generator;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use board_common::{BoardError, QuoteField, Result};
use board_engine::{QuoteStore, StoreEvent, StoreUpdate};
use clap::Parser;
use crossbeam_channel::{select, tick};
use log::{error, info, warn};

use crate::args::Args;
use crate::generator::{QuoteGenerator, load_snapshot};

/// How long to wait for in-flight work at exit.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down feed...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| BoardError::Signal(e.to_string()))?;
    }

    let config = args.engine_config()?;
    let listings = match &args.snapshot {
        Some(path) => load_snapshot(path)?,
        None => QuoteGenerator::universe(args.stocks, &mut rand::rng()),
    };
    info!("Simulating {} listings every {:?}", listings.len(), args.interval());

    let pump = tick(config.frame_interval());
    let mut store = QuoteStore::new(config)?;
    store.initialize();
    if store.is_degraded() {
        warn!("Running without background workers");
    }
    store.apply(vec![
        StoreUpdate::SearchQuery(args.query.clone()),
        StoreUpdate::Filters(args.filters()),
        StoreUpdate::Sort(args.sort_config()),
        StoreUpdate::ShowWatchlist(args.watchlist),
        StoreUpdate::DarkMode(args.dark),
        StoreUpdate::Priority(args.priority),
    ]);
    let events = store.subscribe();

    let (batch_rx, feed) =
        QuoteGenerator::start(listings, args.interval(), args.batches, shutdown.clone())?;

    info!("Feed is running. Press Ctrl+C to exit.");
    while !shutdown.load(Ordering::Relaxed) {
        select! {
            recv(batch_rx) -> msg => match msg {
                Ok(batch) => {
                    store.push_batch(batch);
                },
                Err(_) => {
                    info!("Quote feed finished");
                    break;
                },
            },
            recv(pump) -> _ => {
                store.pump();
            },
        }
        for event in events.try_iter() {
            report(&store, &event, args.top);
        }
    }

    if !store.wait_idle(DRAIN_TIMEOUT) {
        warn!("Store still busy after {:?}", DRAIN_TIMEOUT);
    }
    for event in events.try_iter() {
        report(&store, &event, args.top);
    }
    store.terminate();
    drop(batch_rx);
    if feed.join().is_err() {
        error!("Quote feed panicked");
    }
    Ok(())
}

fn report(store: &QuoteStore, event: &StoreEvent, top: usize) {
    match event {
        StoreEvent::BatchCompleted { batch_timestamp, .. } => {
            if let Some(summary) = &store.metrics().color {
                info!(
                    "Batch {}: {} quotes styled in {:?} ({} chunks, {:?} pause)",
                    batch_timestamp,
                    summary.stock_count,
                    summary.processing_time,
                    summary.chunk_count,
                    summary.chunk_delay
                );
            }
        }
        StoreEvent::FilteredDataChanged { batch_timestamp, .. } => {
            let stats = store.metrics().filter;
            info!(
                "Filter {}: {}/{} quotes in {:?}",
                batch_timestamp, stats.items_out, stats.items_in, stats.processing_time
            );
            for quote in store.filtered().iter().take(top) {
                let styles = store.styles(&quote.code);
                let color = styles
                    .and_then(|s| s.price_colors.get(&QuoteField::MatchPrice))
                    .map_or("-", String::as_str);
                let animation = styles
                    .and_then(|s| s.animations.get(&QuoteField::MatchPrice))
                    .map_or("", String::as_str);
                info!(
                    "  {:<6} {:>9} {:>7} {:>14}  {} {}",
                    quote.code, quote.match_price, quote.match_change, quote.total_volume, color, animation
                );
            }
        }
        StoreEvent::CachesCleared => info!("Caches cleared"),
        StoreEvent::FlagsChanged => info!("Flags: {:?}", store.flags()),
        StoreEvent::StylesChanged { .. } => {}
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
