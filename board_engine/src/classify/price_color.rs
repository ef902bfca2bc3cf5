//! Price color classification.
//!
//! Bounds are compared with an absolute tolerance before the greater/less
//! checks, so a price sitting exactly on the ceiling, floor or reference is
//! never misreported as a plain move because of floating point noise. The
//! equality checks run in the order ceiling, floor, reference; the first match
//! wins.
use board_common::number;
use strum_macros::Display;

/// Tolerance for "price equals bound".
pub const EPSILON: f64 = 0.0001;

/// Position of a price relative to the session bounds.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PriceColor {
    Ceiling,
    Floor,
    Reference,
    Up,
    Down,
    Neutral,
}

impl PriceColor {
    /// CSS class for this color in the given theme.
    pub fn css_class(self, is_dark_mode: bool) -> &'static str {
        match (self, is_dark_mode) {
            (PriceColor::Ceiling, _) => "text-fuchsia-500",
            (PriceColor::Floor, _) => "text-cyan-500",
            (PriceColor::Reference, _) => "text-yellow-500",
            (PriceColor::Up, true) => "text-green-400",
            (PriceColor::Up, false) => "text-green-600",
            (PriceColor::Down, true) => "text-red-400",
            (PriceColor::Down, false) => "text-red-600",
            (PriceColor::Neutral, true) => "text-white",
            (PriceColor::Neutral, false) => "text-gray-900",
        }
    }
}

/// Classify `price` against `ref_price`, `ceiling` and `floor`.
///
/// Any input that is absent, the no-data sentinel or unparsable yields
/// `Neutral`.
pub fn classify_price_color(price: &str, ref_price: &str, ceiling: &str, floor: &str) -> PriceColor {
    let (Some(price), Some(ref_price), Some(ceiling), Some(floor)) = (
        number::parse(price),
        number::parse(ref_price),
        number::parse(ceiling),
        number::parse(floor),
    ) else {
        return PriceColor::Neutral;
    };

    if (price - ceiling).abs() < EPSILON {
        PriceColor::Ceiling
    } else if (price - floor).abs() < EPSILON {
        PriceColor::Floor
    } else if (price - ref_price).abs() < EPSILON {
        PriceColor::Reference
    } else if price > ref_price {
        PriceColor::Up
    } else if price < ref_price {
        PriceColor::Down
    } else {
        PriceColor::Neutral
    }
}
