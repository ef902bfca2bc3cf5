//! Filter and sort configuration chosen by the UI.
//!
//! All enums parse case-insensitively from their lowercase names (`"up"`,
//! `"high"`, `"desc"`) so they can come from JSON, the command line or a query
//! string alike. `all` is the default for every categorical filter.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::quote::QuoteField;

/// Direction of the last match relative to the reference price.
#[allow(missing_docs)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PriceChangeFilter {
    #[default]
    All,
    Up,
    Down,
}

/// Total traded volume band.
#[allow(missing_docs)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VolumeFilter {
    #[default]
    All,
    High,
    Low,
}

/// Sign of the match change.
#[allow(missing_docs)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PercentChangeFilter {
    #[default]
    All,
    Positive,
    Negative,
}

/// Band of the approximate market cap (`matchPrice × totalVolume`).
///
/// The product is really the traded value of the session, not a market
/// capitalization; the name is kept because the UI labels it that way.
#[allow(missing_docs)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MarketCapFilter {
    #[default]
    All,
    Large,
    Medium,
    Small,
}

/// The four categorical filters, applied as a conjunction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    /// Up/down against the reference price.
    pub price_change: PriceChangeFilter,
    /// High/low total volume.
    pub volume: VolumeFilter,
    /// Positive/negative match change.
    pub percent_change: PercentChangeFilter,
    /// Large/medium/small approximate market cap.
    pub market_cap: MarketCapFilter,
}

/// Sort order.
#[allow(missing_docs)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort column and direction; no key means feed order is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Column to sort by.
    pub key: Option<QuoteField>,
    /// Ascending or descending.
    pub direction: SortDirection,
}

impl SortConfig {
    /// Sort by `key` in `direction`.
    pub fn by(key: QuoteField, direction: SortDirection) -> Self {
        SortConfig {
            key: Some(key),
            direction,
        }
    }
}
