//! Synthetic market feed.
//!
//! The `QuoteGenerator` runs a background thread that walks the price of every
//! listing around its last value and sends one full `Vec<Quote>` per interval
//! through a `crossbeam_channel`. Prices stay inside the daily band around the
//! reference price; volumes only grow. All numbers are rendered the way an
//! exchange feed renders them (`"1,250,400"`, `"+0.35"`).
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use board_common::number;
use board_common::{BoardError, Quote, Result};
use crossbeam_channel::{Receiver, unbounded};
use log::{debug, info};
use rand::Rng;

/// Daily limit around the reference price.
pub const PRICE_BAND: f64 = 0.07;

/// Smallest price step.
pub const TICK: f64 = 0.05;

const BLUE_CHIPS: [(&str, &str); 10] = [
    ("VNM", "Vinamilk"),
    ("FPT", "FPT Corporation"),
    ("HPG", "Hoa Phat Group"),
    ("VCB", "Vietcombank"),
    ("MWG", "Mobile World"),
    ("ACB", "Asia Commercial Bank"),
    ("VIC", "Vingroup"),
    ("MSN", "Masan Group"),
    ("SSI", "SSI Securities"),
    ("TCB", "Techcombank"),
];

/// One listed stock and its running session state.
#[derive(Debug, Clone)]
pub struct Listing {
    /// Symbol.
    pub code: String,
    /// Company name.
    pub name: String,
    /// Previous close.
    pub ref_price: f64,
    /// Last match.
    pub price: f64,
    /// Session volume so far.
    pub total_volume: u64,
    /// Last match volume.
    pub match_volume: u64,
    foreign_buy: u64,
    foreign_sell: u64,
}

impl Listing {
    /// Listing opening at its reference price.
    pub fn new(code: impl Into<String>, name: impl Into<String>, ref_price: f64) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            ref_price,
            price: ref_price,
            total_volume: 0,
            match_volume: 0,
            foreign_buy: 0,
            foreign_sell: 0,
        }
    }

    /// Listing seeded from a snapshot row. `None` without a usable reference
    /// or match price.
    pub fn from_quote(quote: &Quote) -> Option<Self> {
        let ref_price = number::parse(&quote.ref_price).or_else(|| number::parse(&quote.match_price))?;
        if ref_price <= 0.0 {
            return None;
        }
        let mut listing = Self::new(quote.code.clone(), quote.name.clone(), ref_price);
        if let Some(price) = number::parse(&quote.match_price) {
            listing.price = price.clamp(listing.floor(), listing.ceiling());
        }
        listing.total_volume = number::parse(&quote.total_volume)
            .map(|v| v.max(0.0) as u64)
            .unwrap_or(0);
        Some(listing)
    }

    /// Highest price allowed today.
    pub fn ceiling(&self) -> f64 {
        round_to_tick(self.ref_price * (1.0 + PRICE_BAND))
    }

    /// Lowest price allowed today.
    pub fn floor(&self) -> f64 {
        round_to_tick(self.ref_price * (1.0 - PRICE_BAND))
    }

    /// Advance one tick: move the price and trade some volume.
    pub fn step(&mut self, rng: &mut impl Rng) {
        self.price = next_price(self.price, self.floor(), self.ceiling(), rng);
        self.match_volume = 100 * rng.random_range(1..50);
        self.total_volume += self.match_volume;
        if rng.random_bool(0.3) {
            self.foreign_buy += self.match_volume / 2;
        }
        if rng.random_bool(0.3) {
            self.foreign_sell += self.match_volume / 2;
        }
    }

    /// Render the current state as a feed row with three price levels per side.
    pub fn to_quote(&self, rng: &mut impl Rng) -> Quote {
        let level = |offset: f64| {
            let price = round_to_tick(self.price + offset * TICK);
            if price < self.floor() || price > self.ceiling() {
                number::NO_DATA.to_string()
            } else {
                format_price(price)
            }
        };
        let mut depth = || format_volume(100 * rng.random_range(1..200));

        Quote {
            code: self.code.clone(),
            name: self.name.clone(),
            match_price: format_price(self.price),
            buy_price1: level(-1.0),
            buy_price2: level(-2.0),
            buy_price3: level(-3.0),
            sell_price1: level(1.0),
            sell_price2: level(2.0),
            sell_price3: level(3.0),
            ref_price: format_price(self.ref_price),
            ceiling: format_price(self.ceiling()),
            floor: format_price(self.floor()),
            buy_volume1: depth(),
            buy_volume2: depth(),
            buy_volume3: depth(),
            sell_volume1: depth(),
            sell_volume2: depth(),
            sell_volume3: depth(),
            match_volume: format_volume(self.match_volume),
            total_volume: format_volume(self.total_volume),
            foreign_buy: format_volume(self.foreign_buy),
            foreign_sell: format_volume(self.foreign_sell),
            match_change: format_change(self.price - self.ref_price),
        }
    }
}

/// Random walk of at most 1% per tick, kept inside `[floor, ceiling]`.
pub fn next_price(current: f64, floor: f64, ceiling: f64, rng: &mut impl Rng) -> f64 {
    let change: f64 = rng.random_range(-0.01..0.01);
    round_to_tick(current * (1.0 + change)).clamp(floor, ceiling)
}

fn round_to_tick(price: f64) -> f64 {
    ((price / TICK).round() * TICK * 100.0).round() / 100.0
}

/// Two decimals.
pub fn format_price(price: f64) -> String {
    format!("{:.2}", price)
}

/// Signed, two decimals; zero carries no sign.
pub fn format_change(change: f64) -> String {
    let rounded = (change * 100.0).round() / 100.0;
    if rounded > 0.0 {
        format!("+{:.2}", rounded)
    } else if rounded < 0.0 {
        format!("{:.2}", rounded)
    } else {
        "0.00".to_string()
    }
}

/// Thousands separated with commas.
pub fn format_volume(volume: u64) -> String {
    let digits = volume.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Read a JSON array of quotes and keep every row usable as a listing.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Vec<Listing>> {
    let file = File::open(path.as_ref())?;
    let quotes: Vec<Quote> = serde_json::from_reader(BufReader::new(file))?;
    let listings: Vec<Listing> = quotes.iter().filter_map(Listing::from_quote).collect();
    if listings.is_empty() {
        return Err(BoardError::Config(format!(
            "snapshot {} has no quote with a reference price",
            path.as_ref().display()
        )));
    }
    Ok(listings)
}

/// Background market data generator.
pub struct QuoteGenerator;

impl QuoteGenerator {
    /// Thread name of the generator.
    pub const NAME: &'static str = "quote-feed";

    /// `count` listings: the blue chips first, then synthetic small caps.
    pub fn universe(count: usize, rng: &mut impl Rng) -> Vec<Listing> {
        (0..count)
            .map(|i| match BLUE_CHIPS.get(i) {
                Some((code, name)) => Listing::new(*code, *name, round_to_tick(rng.random_range(20.0..150.0))),
                None => Listing::new(
                    format!("S{:03}", i),
                    format!("Small Cap {}", i),
                    round_to_tick(rng.random_range(2.0..30.0)),
                ),
            })
            .collect()
    }

    /// Start the generator thread. One batch is sent per `interval` until
    /// `batches` have been sent, `shutdown` is raised or the receiver is dropped.
    pub fn start(
        mut listings: Vec<Listing>,
        interval: Duration,
        batches: Option<usize>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<(Receiver<Vec<Quote>>, JoinHandle<()>)> {
        let (batch_tx, batch_rx) = unbounded::<Vec<Quote>>();

        let handle = thread::Builder::new()
            .name(Self::NAME.into())
            .spawn(move || {
                info!(
                    "Market generator started (Thread ID: {:?}), {} listings",
                    thread::current().id(),
                    listings.len()
                );
                let mut rng = rand::rng();
                let mut sent = 0;

                while !shutdown.load(Ordering::Relaxed) && batches.is_none_or(|max| sent < max) {
                    let batch: Vec<Quote> = listings
                        .iter_mut()
                        .map(|listing| {
                            listing.step(&mut rng);
                            listing.to_quote(&mut rng)
                        })
                        .collect();
                    if batch_tx.send(batch).is_err() {
                        break;
                    }
                    sent += 1;
                    debug!("Generator: batch {} sent", sent);
                    thread::sleep(interval);
                }
                info!("Market generator stopping after {} batches", sent);
            })
            .map_err(|source| BoardError::WorkerSpawn {
                name: Self::NAME,
                source,
            })?;

        Ok((batch_rx, handle))
    }
}
