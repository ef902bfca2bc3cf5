//! Quote rows and the column vocabulary used to address their fields.
//!
//! A `Quote` is one row of the live price board. Numeric columns are kept as the
//! text the feed sent (`"25,350"`, `"--"`, `"+0.45"`) because they may be
//! formatted, missing or malformed; the engine normalizes them with
//! [`crate::number`] only at the point of comparison. Quotes are never mutated by
//! the engine: each batch is a fresh `Vec<Quote>`.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// One row of live market data, keyed by `code`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quote {
    /// Unique symbol, the natural key across batches.
    pub code: String,
    /// Display name used by text search; may be empty.
    pub name: String,
    pub match_price: String,
    pub buy_price1: String,
    pub buy_price2: String,
    pub buy_price3: String,
    pub sell_price1: String,
    pub sell_price2: String,
    pub sell_price3: String,
    /// Reference (previous close) price.
    #[serde(rename = "ref")]
    pub ref_price: String,
    pub ceiling: String,
    pub floor: String,
    pub buy_volume1: String,
    pub buy_volume2: String,
    pub buy_volume3: String,
    pub sell_volume1: String,
    pub sell_volume2: String,
    pub sell_volume3: String,
    pub match_volume: String,
    pub total_volume: String,
    pub foreign_buy: String,
    pub foreign_sell: String,
    /// Signed change of the match price, absolute or percent.
    pub match_change: String,
}

/// Column names of a [`Quote`], spelled the way the feed spells them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ValueEnum,
    Display,
    EnumString,
)]
#[serde(rename_all = "camelCase")]
#[clap(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
#[allow(missing_docs)]
pub enum QuoteField {
    Code,
    Name,
    MatchPrice,
    BuyPrice1,
    BuyPrice2,
    BuyPrice3,
    SellPrice1,
    SellPrice2,
    SellPrice3,
    #[serde(rename = "ref")]
    #[strum(serialize = "ref")]
    #[value(name = "ref")]
    Ref,
    Ceiling,
    Floor,
    BuyVolume1,
    BuyVolume2,
    BuyVolume3,
    SellVolume1,
    SellVolume2,
    SellVolume3,
    MatchVolume,
    TotalVolume,
    ForeignBuy,
    ForeignSell,
    MatchChange,
}

/// Price columns that receive a color and, on change, a price animation.
pub const PRICE_FIELDS: [QuoteField; 7] = [
    QuoteField::MatchPrice,
    QuoteField::BuyPrice1,
    QuoteField::BuyPrice2,
    QuoteField::BuyPrice3,
    QuoteField::SellPrice1,
    QuoteField::SellPrice2,
    QuoteField::SellPrice3,
];

/// Volume columns that only receive a volume animation on change.
pub const VOLUME_FIELDS: [QuoteField; 10] = [
    QuoteField::BuyVolume1,
    QuoteField::BuyVolume2,
    QuoteField::BuyVolume3,
    QuoteField::SellVolume1,
    QuoteField::SellVolume2,
    QuoteField::SellVolume3,
    QuoteField::MatchVolume,
    QuoteField::TotalVolume,
    QuoteField::ForeignBuy,
    QuoteField::ForeignSell,
];

impl QuoteField {
    /// Fields compared numerically when used as a sort key.
    pub fn sorts_numerically(self) -> bool {
        matches!(self, QuoteField::MatchChange | QuoteField::TotalVolume)
    }
}

impl Quote {
    /// Creates an empty quote for `code`; every other column is absent.
    pub fn new(code: impl Into<String>) -> Self {
        Quote {
            code: code.into(),
            ..Default::default()
        }
    }

    /// Builder-style setter, handy for fixtures and feed adapters.
    pub fn with(mut self, field: QuoteField, value: impl Into<String>) -> Self {
        *self.field_mut(field) = value.into();
        self
    }

    /// Raw text of `field`.
    pub fn field(&self, field: QuoteField) -> &str {
        match field {
            QuoteField::Code => &self.code,
            QuoteField::Name => &self.name,
            QuoteField::MatchPrice => &self.match_price,
            QuoteField::BuyPrice1 => &self.buy_price1,
            QuoteField::BuyPrice2 => &self.buy_price2,
            QuoteField::BuyPrice3 => &self.buy_price3,
            QuoteField::SellPrice1 => &self.sell_price1,
            QuoteField::SellPrice2 => &self.sell_price2,
            QuoteField::SellPrice3 => &self.sell_price3,
            QuoteField::Ref => &self.ref_price,
            QuoteField::Ceiling => &self.ceiling,
            QuoteField::Floor => &self.floor,
            QuoteField::BuyVolume1 => &self.buy_volume1,
            QuoteField::BuyVolume2 => &self.buy_volume2,
            QuoteField::BuyVolume3 => &self.buy_volume3,
            QuoteField::SellVolume1 => &self.sell_volume1,
            QuoteField::SellVolume2 => &self.sell_volume2,
            QuoteField::SellVolume3 => &self.sell_volume3,
            QuoteField::MatchVolume => &self.match_volume,
            QuoteField::TotalVolume => &self.total_volume,
            QuoteField::ForeignBuy => &self.foreign_buy,
            QuoteField::ForeignSell => &self.foreign_sell,
            QuoteField::MatchChange => &self.match_change,
        }
    }

    /// Mutable access to the raw text of `field`.
    pub fn field_mut(&mut self, field: QuoteField) -> &mut String {
        match field {
            QuoteField::Code => &mut self.code,
            QuoteField::Name => &mut self.name,
            QuoteField::MatchPrice => &mut self.match_price,
            QuoteField::BuyPrice1 => &mut self.buy_price1,
            QuoteField::BuyPrice2 => &mut self.buy_price2,
            QuoteField::BuyPrice3 => &mut self.buy_price3,
            QuoteField::SellPrice1 => &mut self.sell_price1,
            QuoteField::SellPrice2 => &mut self.sell_price2,
            QuoteField::SellPrice3 => &mut self.sell_price3,
            QuoteField::Ref => &mut self.ref_price,
            QuoteField::Ceiling => &mut self.ceiling,
            QuoteField::Floor => &mut self.floor,
            QuoteField::BuyVolume1 => &mut self.buy_volume1,
            QuoteField::BuyVolume2 => &mut self.buy_volume2,
            QuoteField::BuyVolume3 => &mut self.buy_volume3,
            QuoteField::SellVolume1 => &mut self.sell_volume1,
            QuoteField::SellVolume2 => &mut self.sell_volume2,
            QuoteField::SellVolume3 => &mut self.sell_volume3,
            QuoteField::MatchVolume => &mut self.match_volume,
            QuoteField::TotalVolume => &mut self.total_volume,
            QuoteField::ForeignBuy => &mut self.foreign_buy,
            QuoteField::ForeignSell => &mut self.foreign_sell,
            QuoteField::MatchChange => &mut self.match_change,
        }
    }
}
