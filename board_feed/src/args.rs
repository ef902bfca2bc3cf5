//! Command-line arguments for the price-board feed.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::path::PathBuf;
use std::time::Duration;

use board_common::command::Priority;
use board_common::filters::{
    FilterConfig, MarketCapFilter, PercentChangeFilter, PriceChangeFilter, SortConfig,
    SortDirection, VolumeFilter,
};
use board_common::{QuoteField, Result};
use board_engine::EngineConfig;
use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Number of listed stocks to simulate; ignored with --snapshot.
    #[clap(long, default_value_t = 200)]
    pub stocks: usize,

    /// Stop after this many batches; runs until Ctrl+C when omitted.
    #[clap(long)]
    pub batches: Option<usize>,

    /// Milliseconds between two quote batches.
    #[clap(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Quotes per color chunk; overrides the config file.
    #[clap(long)]
    pub chunk_size: Option<usize>,

    /// Scheduling hint for the color worker.
    #[clap(long, value_enum, default_value_t = Priority::Normal)]
    pub priority: Priority,

    /// Compute dark-theme colors.
    #[clap(long)]
    pub dark: bool,

    /// Free-text search on code and name.
    #[clap(long, default_value = "")]
    pub query: String,

    /// Keep rising or falling quotes only.
    #[clap(long, value_enum, default_value_t = PriceChangeFilter::All)]
    pub price_change: PriceChangeFilter,

    /// Keep high- or low-volume quotes only.
    #[clap(long, value_enum, default_value_t = VolumeFilter::All)]
    pub volume: VolumeFilter,

    /// Keep positive or negative changes only.
    #[clap(long, value_enum, default_value_t = PercentChangeFilter::All)]
    pub percent_change: PercentChangeFilter,

    /// Keep one traded-value band only.
    #[clap(long, value_enum, default_value_t = MarketCapFilter::All)]
    pub market_cap: MarketCapFilter,

    /// Column to sort by (`matchChange`, `totalVolume`, `code`, ...).
    #[clap(long, value_enum)]
    pub sort: Option<QuoteField>,

    /// Sort descending.
    #[clap(long)]
    pub desc: bool,

    /// Show the watchlist panel.
    #[clap(long)]
    pub watchlist: bool,

    /// JSON file with engine settings.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// JSON array of quotes used as the listed universe and starting prices.
    #[clap(long)]
    pub snapshot: Option<PathBuf>,

    /// Rows of the filtered view logged after each pass.
    #[clap(long, default_value_t = 5)]
    pub top: usize,
}

impl Args {
    /// Delay between batches.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Categorical filters from the flags.
    pub fn filters(&self) -> FilterConfig {
        FilterConfig {
            price_change: self.price_change,
            volume: self.volume,
            percent_change: self.percent_change,
            market_cap: self.market_cap,
        }
    }

    /// Sort from the flags.
    pub fn sort_config(&self) -> SortConfig {
        let direction = if self.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        SortConfig {
            key: self.sort,
            direction,
        }
    }

    /// Engine settings from `--config` (or defaults) with CLI overrides applied.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        config.validate()?;
        Ok(config)
    }
}
